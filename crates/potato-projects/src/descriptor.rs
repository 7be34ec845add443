use std::path::PathBuf;

use potato_service::ServiceName;
use serde::Serialize;

use crate::ProjectId;

pub const NO_DESCRIPTION: &str = "No description";
pub const UNKNOWN_ANNOTATION_TYPE: &str = "Unknown";
pub const UNKNOWN_SERVER_NAME: &str = "Unknown";
pub const NO_ACTIVE_PROJECT: &str = "No project active";
pub const NO_ACTIVE_CONFIGURATION: &str = "No configuration found";

/// Normalized view of one project configuration, recomputed on every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDescriptor {
    pub id: ProjectId,
    pub display_name: String,
    pub task_description: String,
    pub annotation_type: String,
    pub config_path: PathBuf,
    pub project_dir: String,
    /// `None` when the directory name cannot form a unit name.
    pub service_name: Option<ServiceName>,
    pub has_managed_service: bool,
    pub service_running: bool,
    pub is_active: bool,
}

/// What the annotation service is currently configured to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveProjectSummary {
    pub name: String,
    pub task_description: String,
    pub running: bool,
    pub access_url: String,
    pub configured: bool,
}

impl ActiveProjectSummary {
    pub fn inactive() -> Self {
        Self {
            name: NO_ACTIVE_PROJECT.to_string(),
            task_description: NO_ACTIVE_CONFIGURATION.to_string(),
            running: false,
            access_url: String::new(),
            configured: false,
        }
    }

    pub(crate) fn configured(
        server_name: Option<String>,
        task_name: Option<String>,
        running: bool,
        request_host: &str,
    ) -> Self {
        let host = host_without_port(request_host);
        let access_url = if running && !host.is_empty() {
            format!("http://{host}")
        } else {
            String::new()
        };
        Self {
            name: server_name.unwrap_or_else(|| UNKNOWN_SERVER_NAME.to_string()),
            task_description: task_name.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            running,
            access_url,
            configured: true,
        }
    }
}

/// `"sentiment_v2"` -> `"Sentiment V2"`: underscores become spaces and every
/// run of letters is capitalized.
pub fn display_name_for_project_dir(project_dir: &str) -> String {
    let mut rendered = String::with_capacity(project_dir.len());
    let mut previous_is_letter = false;
    for ch in project_dir.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if previous_is_letter {
                rendered.extend(ch.to_lowercase());
            } else {
                rendered.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            rendered.push(ch);
            previous_is_letter = false;
        }
    }
    rendered
}

/// Strips an optional `:port` suffix from an HTTP `Host` value, keeping
/// bracketed IPv6 literals intact.
pub fn host_without_port(host: &str) -> &str {
    let host = host.trim();
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && port.chars().all(|ch| ch.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}
