use anyhow::{bail, Result};

use crate::Cli;

/// What one invocation of the binary does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliMode {
    Serve,
    ListProjects,
    ShowActive,
    Activate(String),
    StartService(String),
    StopService(String),
    RestartPrimary,
    Logs(String),
}

impl CliMode {
    pub fn is_report(&self) -> bool {
        !matches!(self, Self::Serve)
    }
}

/// Resolves the single requested mode, rejecting conflicting flags.
pub fn resolve_cli_mode(cli: &Cli) -> Result<CliMode> {
    let mut requested = Vec::new();
    if cli.list_projects {
        requested.push(("--list-projects", CliMode::ListProjects));
    }
    if cli.show_active {
        requested.push(("--show-active", CliMode::ShowActive));
    }
    if let Some(project_id) = &cli.activate {
        requested.push(("--activate", CliMode::Activate(project_id.clone())));
    }
    if let Some(service) = &cli.start_service {
        requested.push(("--start-service", CliMode::StartService(service.clone())));
    }
    if let Some(service) = &cli.stop_service {
        requested.push(("--stop-service", CliMode::StopService(service.clone())));
    }
    if cli.restart_primary {
        requested.push(("--restart-primary", CliMode::RestartPrimary));
    }
    if let Some(service) = &cli.logs {
        requested.push(("--logs", CliMode::Logs(service.clone())));
    }

    if requested.len() > 1 {
        let flags = requested
            .iter()
            .map(|(flag, _)| *flag)
            .collect::<Vec<_>>()
            .join(", ");
        bail!("conflicting modes requested: {flags}; choose at most one");
    }
    let mode = requested
        .pop()
        .map(|(_, mode)| mode)
        .unwrap_or(CliMode::Serve);

    if cli.json && !mode.is_report() {
        bail!("--json requires one of --list-projects, --show-active, --activate, --start-service, --stop-service, --restart-primary or --logs");
    }
    if !cli.request_host.is_empty() && mode != CliMode::ShowActive {
        bail!("--request-host requires --show-active");
    }
    if let CliMode::Activate(project_id) = &mode {
        if project_id.trim().is_empty() {
            bail!("--activate cannot be empty");
        }
    }
    Ok(mode)
}
