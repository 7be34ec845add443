//! Text and JSON renderers for the one-shot CLI modes.

use anyhow::{Context, Result};
use potato_control::{ActivationReceipt, ServiceLogs};
use potato_projects::{ActiveProjectSummary, ProjectDescriptor, ProjectScanReport};
use potato_service::ServiceCommand;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ServiceActionReport {
    pub service: String,
    pub action: ServiceCommand,
    pub accepted: bool,
}

pub(crate) fn render_json<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to render report as JSON")
}

fn service_state_label(project: &ProjectDescriptor) -> &'static str {
    if !project.has_managed_service {
        "unmanaged"
    } else if project.service_running {
        "running"
    } else {
        "stopped"
    }
}

pub(crate) fn render_scan_report(report: &ProjectScanReport) -> String {
    let mut lines = vec![format!(
        "project scan: projects={} issues={}",
        report.projects.len(),
        report.issues.len()
    )];
    for project in &report.projects {
        lines.push(format!(
            "project: id={} name={} type={} service={} service_state={} active={} description={} config={}",
            project.id,
            project.display_name,
            project.annotation_type,
            project
                .service_name
                .as_ref()
                .map(|name| name.as_str())
                .unwrap_or("none"),
            service_state_label(project),
            project.is_active,
            project.task_description,
            project.config_path.display(),
        ));
    }
    for issue in &report.issues {
        lines.push(format!(
            "issue: kind={} path={} message={}",
            issue.kind,
            issue.path.display(),
            issue.message
        ));
    }
    lines.join("\n")
}

pub(crate) fn render_active_summary(summary: &ActiveProjectSummary) -> String {
    let access_url = if summary.access_url.is_empty() {
        "none"
    } else {
        summary.access_url.as_str()
    };
    format!(
        "active project: name={} description={} configured={} running={} access_url={}",
        summary.name, summary.task_description, summary.configured, summary.running, access_url
    )
}

pub(crate) fn render_activation_receipt(receipt: &ActivationReceipt) -> String {
    format!(
        "project activated: id={} name={} source={} active_config={} restarted={}",
        receipt.project_id,
        receipt.display_name,
        receipt.source_path.display(),
        receipt.active_location,
        receipt.restarted_service,
    )
}

pub(crate) fn render_service_action(report: &ServiceActionReport) -> String {
    format!(
        "service {}: service={} accepted={}",
        report.action, report.service, report.accepted
    )
}

pub(crate) fn render_service_logs(logs: &ServiceLogs) -> String {
    let mut rendered = format!(
        "service logs: service={} lines={} collected={}",
        logs.service,
        logs.lines.len(),
        logs.collected
    );
    for line in &logs.lines {
        rendered.push('\n');
        rendered.push_str(line);
    }
    rendered
}
