//! HTML renderer for the control panel page.

use minijinja::{context, Environment};
use potato_control::ServiceLogs;
use potato_projects::{ActiveProjectSummary, ProjectDescriptor, ScanIssue};
use potato_service::ServiceName;
use serde::Serialize;

const PAGE_TEMPLATE_NAME: &str = "control_panel.html";

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Potato Project Manager</title>
  <style>
    body { font-family: "Segoe UI", Arial, sans-serif; margin: 0; background: #f4f4f2; color: #1f2d36; }
    .container { max-width: 1180px; margin: 2rem auto; background: #fff; padding: 1.75rem; border-radius: 10px; }
    h1 { color: #b9520f; border-bottom: 3px solid #b9520f; padding-bottom: 0.5rem; }
    .flash { padding: 0.6rem; border-radius: 4px; margin: 0.3rem 0; border: 1px solid; }
    .flash.success { background: #e0f5ea; color: #1e8449; }
    .flash.error { background: #fbe3e0; color: #c0392b; }
    .flash.info { background: #e5f0fb; color: #2471a3; }
    .current { background: #eaf3fb; border: 2px solid #2e86c1; padding: 1rem; border-radius: 8px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); gap: 1rem; }
    .card { border: 1px solid #d5d8dc; padding: 1rem; border-radius: 8px; background: #fbfbfb; }
    .card.active { border-color: #1e8449; background: #eaf7ee; }
    .card h3 { margin: 0 0 0.5rem 0; }
    .muted { color: #7b8a8b; }
    .btn { padding: 0.4rem 0.9rem; margin: 0.2rem; border-radius: 4px; color: #fff; text-decoration: none; display: inline-block; }
    .btn.primary { background: #2e86c1; }
    .btn.go { background: #1e8449; }
    .btn.warn { background: #d68910; }
    .status { padding: 0.2rem 0.5rem; border-radius: 3px; font-size: 0.8rem; font-weight: bold; }
    .status.running { background: #e0f5ea; color: #1e8449; }
    .status.stopped { background: #fbe3e0; color: #c0392b; }
    .logs { background: #1f2d36; color: #ecf0f1; padding: 1rem; border-radius: 4px; font-family: monospace; font-size: 0.8rem; max-height: 240px; overflow-y: auto; white-space: pre-wrap; }
    .issues li { font-family: monospace; font-size: 0.85rem; }
  </style>
</head>
<body>
  <div class="container">
    <h1>Potato Project Manager</h1>

    {% if flash %}
    <div id="flash-messages">
      {% for message in flash %}
      <div class="flash {{ message.level }}">{{ message.text }}</div>
      {% endfor %}
    </div>
    {% endif %}

    <section class="current" id="active-project">
      <h2>Current Active Project</h2>
      <p><strong>{{ active.name }}</strong> - {{ active.task_description }}</p>
      <p>Status:
        <span class="status {{ "running" if active.running else "stopped" }}">{{ "Running" if active.running else "Stopped" }}</span>
      </p>
      {% if active.access_url %}
      <p><a href="{{ active.access_url }}" target="_blank" rel="noopener">Open Annotation Tool</a></p>
      {% endif %}
    </section>

    <h2>Available Projects</h2>
    {% if projects %}
    <div class="grid" id="projects">
      {% for project in projects %}
      <div class="card{% if project.is_active %} active{% endif %}" data-project-id="{{ project.id }}">
        <h3>{{ project.display_name }}</h3>
        <p class="muted">{{ project.task_description }}</p>
        <p><strong>Type:</strong> {{ project.annotation_type }}</p>
        <p><strong>Config:</strong> {{ project.config_path }}</p>
        <div>
          {% if project.is_active %}
          <span class="btn go">Currently Active</span>
          {% else %}
          <a class="btn primary" href="{{ project.switch_href|safe }}">Switch to This Project</a>
          {% endif %}
          {% if project.has_managed_service %}
            {% if project.service_running %}
            <a class="btn warn" href="{{ project.stop_href|safe }}">Stop Service</a>
            {% else %}
            <a class="btn go" href="{{ project.start_href|safe }}">Start Service</a>
            {% endif %}
          <a class="btn primary" href="{{ project.logs_href|safe }}">View Logs</a>
          {% endif %}
        </div>
      </div>
      {% endfor %}
    </div>
    {% else %}
    <p class="muted">No projects found in {{ hub_dir }}.</p>
    {% endif %}

    {% if issues %}
    <h2>Skipped Configurations</h2>
    <ul class="issues">
      {% for issue in issues %}
      <li>[{{ issue.kind }}] {{ issue.path }}: {{ issue.message }}</li>
      {% endfor %}
    </ul>
    {% endif %}

    <h2>Quick Actions</h2>
    <div>
      <a class="btn warn" href="/restart">Restart Main Service</a>
      <a class="btn primary" href="{{ primary_logs_href|safe }}">View Main Service Logs</a>
      <a class="btn go" href="/setup-multi">Setup Multi-Project Mode</a>
    </div>

    {% if logs %}
    <h2>Service Logs: {{ logs.service }}</h2>
    <div class="logs" id="service-logs">{{ logs.text }}</div>
    {% endif %}
  </div>
</body>
</html>
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

/// One-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

#[derive(Debug, Serialize)]
struct ProjectCard<'a> {
    id: &'a str,
    display_name: &'a str,
    task_description: &'a str,
    annotation_type: &'a str,
    config_path: String,
    is_active: bool,
    has_managed_service: bool,
    service_running: bool,
    switch_href: String,
    start_href: String,
    stop_href: String,
    logs_href: String,
}

impl<'a> ProjectCard<'a> {
    fn from_descriptor(descriptor: &'a ProjectDescriptor) -> Self {
        let service = descriptor
            .service_name
            .as_ref()
            .map(ServiceName::as_str)
            .unwrap_or_default();
        Self {
            id: descriptor.id.as_str(),
            display_name: &descriptor.display_name,
            task_description: &descriptor.task_description,
            annotation_type: &descriptor.annotation_type,
            config_path: descriptor.config_path.display().to_string(),
            is_active: descriptor.is_active,
            has_managed_service: descriptor.has_managed_service && !service.is_empty(),
            service_running: descriptor.service_running,
            switch_href: route_href("switch", descriptor.id.as_str()),
            start_href: route_href("start", service),
            stop_href: route_href("stop", service),
            logs_href: route_href("logs", service),
        }
    }
}

#[derive(Debug, Serialize)]
struct LogPanel<'a> {
    service: &'a str,
    text: String,
    collected: bool,
}

/// Everything one page render needs.
pub(crate) struct PageView<'a> {
    pub flash: &'a [FlashMessage],
    pub active: &'a ActiveProjectSummary,
    pub projects: &'a [ProjectDescriptor],
    pub issues: &'a [ScanIssue],
    pub hub_dir: String,
    pub primary_service: &'a ServiceName,
    pub logs: Option<&'a ServiceLogs>,
}

pub(crate) fn build_page_environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut environment = Environment::new();
    environment.add_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
    Ok(environment)
}

pub(crate) fn render_control_panel_page(
    environment: &Environment<'static>,
    view: &PageView<'_>,
) -> Result<String, minijinja::Error> {
    let projects: Vec<ProjectCard<'_>> = view
        .projects
        .iter()
        .map(ProjectCard::from_descriptor)
        .collect();
    let logs = view.logs.map(|logs| LogPanel {
        service: logs.service.as_str(),
        text: logs.text(),
        collected: logs.collected,
    });
    environment.get_template(PAGE_TEMPLATE_NAME)?.render(context! {
        flash => view.flash,
        active => view.active,
        projects => projects,
        issues => view.issues,
        hub_dir => &view.hub_dir,
        primary_logs_href => route_href("logs", view.primary_service.as_str()),
        logs => logs,
    })
}

/// `/{route}/{segment}` with the segment percent-encoded.
pub(crate) fn route_href(route: &str, segment: &str) -> String {
    let mut href = String::with_capacity(route.len() + segment.len() + 2);
    href.push('/');
    href.push_str(route);
    href.push('/');
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            href.push(char::from(byte));
        } else {
            href.push_str(&format!("%{byte:02X}"));
        }
    }
    href
}
