use std::sync::Arc;

use anyhow::{Context, Result};
use potato_cli::{resolve_cli_mode, Cli, CliMode, ProjectManagerConfig};
use potato_control::{ActivationController, DesiredServiceState};
use potato_dashboard::{run_dashboard_server, DashboardServerConfig};
use potato_projects::{ActiveConfigStore, FsActiveConfigStore, ProjectRegistry};
use potato_service::{ServiceCommand, ServiceManager, ServiceName, SystemctlServiceManager};
use tracing::debug;

use crate::reports::{
    render_active_summary, render_activation_receipt, render_json, render_scan_report,
    render_service_action, render_service_logs, ServiceActionReport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReportOptions {
    pub json: bool,
    pub request_host: String,
    pub log_lines: usize,
}

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let mode = resolve_cli_mode(&cli)?;
    let config = ProjectManagerConfig::from_cli(&cli)?;
    debug!(?config, ?mode, "resolved project manager settings");
    let controller = Arc::new(build_controller(&config));

    if mode == CliMode::Serve {
        return run_dashboard_server(
            DashboardServerConfig {
                bind: config.bind.clone(),
                log_lines: config.log_lines,
            },
            controller,
        )
        .await;
    }

    let options = ReportOptions {
        json: cli.json,
        request_host: cli.request_host.clone(),
        log_lines: config.log_lines,
    };
    let output =
        tokio::task::spawn_blocking(move || execute_report_mode(&controller, &mode, &options))
            .await
            .context("project manager command task failed")??;
    println!("{output}");
    Ok(())
}

pub(crate) fn build_controller(config: &ProjectManagerConfig) -> ActivationController {
    let services: Arc<dyn ServiceManager> =
        Arc::new(SystemctlServiceManager::new(config.systemctl_config()));
    let store: Arc<dyn ActiveConfigStore> =
        Arc::new(FsActiveConfigStore::new(&config.active_config));
    let registry = Arc::new(ProjectRegistry::new(
        config.registry_config(),
        services.clone(),
        store.clone(),
    ));
    ActivationController::new(registry, store, services)
}

fn parse_service_flag(flag: &str, raw: &str) -> Result<ServiceName> {
    ServiceName::new(raw).with_context(|| format!("invalid {flag} '{raw}'"))
}

pub(crate) fn execute_report_mode(
    controller: &ActivationController,
    mode: &CliMode,
    options: &ReportOptions,
) -> Result<String> {
    match mode {
        CliMode::Serve => anyhow::bail!("serve mode does not produce a report"),
        CliMode::ListProjects => {
            let report = controller.registry().scan_report();
            if options.json {
                render_json(&report)
            } else {
                Ok(render_scan_report(&report))
            }
        }
        CliMode::ShowActive => {
            let summary = controller.registry().current_active(&options.request_host);
            if options.json {
                render_json(&summary)
            } else {
                Ok(render_active_summary(&summary))
            }
        }
        CliMode::Activate(project_id) => {
            let receipt = controller
                .activate(project_id)
                .with_context(|| format!("failed to activate project '{project_id}'"))?;
            if options.json {
                render_json(&receipt)
            } else {
                Ok(render_activation_receipt(&receipt))
            }
        }
        CliMode::StartService(raw) => {
            let service = parse_service_flag("--start-service", raw)?;
            execute_service_change(controller, &service, DesiredServiceState::Running, options)
        }
        CliMode::StopService(raw) => {
            let service = parse_service_flag("--stop-service", raw)?;
            execute_service_change(controller, &service, DesiredServiceState::Stopped, options)
        }
        CliMode::RestartPrimary => {
            controller
                .restart_primary()
                .context("failed to restart primary service")?;
            render_service_report(
                &ServiceActionReport {
                    service: controller.primary_service().to_string(),
                    action: ServiceCommand::Restart,
                    accepted: true,
                },
                options,
            )
        }
        CliMode::Logs(raw) => {
            let service = parse_service_flag("--logs", raw)?;
            let logs = controller.fetch_logs(&service, options.log_lines);
            if options.json {
                render_json(&logs)
            } else {
                Ok(render_service_logs(&logs))
            }
        }
    }
}

fn execute_service_change(
    controller: &ActivationController,
    service: &ServiceName,
    desired: DesiredServiceState,
    options: &ReportOptions,
) -> Result<String> {
    controller
        .set_service_state(service, desired)
        .with_context(|| format!("failed to {} {service}", desired.command()))?;
    render_service_report(
        &ServiceActionReport {
            service: service.to_string(),
            action: desired.command(),
            accepted: true,
        },
        options,
    )
}

fn render_service_report(report: &ServiceActionReport, options: &ReportOptions) -> Result<String> {
    if options.json {
        render_json(report)
    } else {
        Ok(render_service_action(report))
    }
}
