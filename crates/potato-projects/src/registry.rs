use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use potato_service::{ServiceManager, ServiceName};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    display_name_for_project_dir, parse_project_config, ActiveConfigStore, ActiveProjectSummary,
    ProjectConfigFields, ProjectDescriptor, ProjectId, NO_DESCRIPTION, UNKNOWN_ANNOTATION_TYPE,
};


pub const CONFIGS_DIR_NAME: &str = "configs";
pub const DEFAULT_SERVICE_PREFIX: &str = "potato-";
const CONFIG_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRegistryConfig {
    pub hub_dir: PathBuf,
    pub primary_service: ServiceName,
    pub service_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanIssueKind {
    Unreadable,
    Parse,
    InvalidName,
    IdCollision,
}

impl ScanIssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::Parse => "parse",
            Self::InvalidName => "invalid_name",
            Self::IdCollision => "id_collision",
        }
    }
}

impl fmt::Display for ScanIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or directory that was skipped while scanning the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub kind: ScanIssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectScanReport {
    pub projects: Vec<ProjectDescriptor>,
    pub issues: Vec<ScanIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveStatus {
    Query,
    Skip,
}

#[derive(Debug)]
struct DiscoveredConfig {
    id: ProjectId,
    path: PathBuf,
    raw: Vec<u8>,
    fields: ProjectConfigFields,
}

/// Read-only view over the project hub. Holds no state between calls; every
/// operation rescans the filesystem and re-queries the service manager.
pub struct ProjectRegistry {
    config: ProjectRegistryConfig,
    services: Arc<dyn ServiceManager>,
    store: Arc<dyn ActiveConfigStore>,
}

impl ProjectRegistry {
    pub fn new(
        config: ProjectRegistryConfig,
        services: Arc<dyn ServiceManager>,
        store: Arc<dyn ActiveConfigStore>,
    ) -> Self {
        Self {
            config,
            services,
            store,
        }
    }

    pub fn config(&self) -> &ProjectRegistryConfig {
        &self.config
    }

    pub fn scan(&self) -> Vec<ProjectDescriptor> {
        self.scan_report().projects
    }

    pub fn scan_report(&self) -> ProjectScanReport {
        self.collect(LiveStatus::Query)
    }

    /// Finds one project by its id key from a fresh scan. Service status is
    /// not queried, so `service_running` is always `false` on the result.
    pub fn locate(&self, project_id: &str) -> Option<ProjectDescriptor> {
        self.collect(LiveStatus::Skip)
            .projects
            .into_iter()
            .find(|descriptor| descriptor.id.matches(project_id))
    }

    pub fn current_active(&self, request_host: &str) -> ActiveProjectSummary {
        let Some(raw) = self.read_active_config() else {
            return ActiveProjectSummary::inactive();
        };
        let fields = match parse_project_config(&raw) {
            Ok(fields) => fields,
            Err(error) => {
                warn!(
                    location = %self.store.location(),
                    error = %error,
                    "active configuration is not a valid project config"
                );
                return ActiveProjectSummary::inactive();
            }
        };
        let running = self
            .services
            .query_status(&self.config.primary_service)
            .is_running();
        ActiveProjectSummary::configured(
            fields.server_name,
            fields.task_name,
            running,
            request_host,
        )
    }

    fn read_active_config(&self) -> Option<Vec<u8>> {
        match self.store.read_active() {
            Ok(content) => content,
            Err(error) => {
                warn!(error = %error, "failed to read active configuration");
                None
            }
        }
    }

    fn collect(&self, live_status: LiveStatus) -> ProjectScanReport {
        let mut issues = Vec::new();
        let discovered = discover_configs(&self.config.hub_dir, &mut issues);

        let mut by_key: BTreeMap<String, Vec<DiscoveredConfig>> = BTreeMap::new();
        for config in discovered {
            by_key
                .entry(config.id.as_str().to_string())
                .or_default()
                .push(config);
        }

        let active = self.read_active_config();
        let mut projects = Vec::with_capacity(by_key.len());
        for (key, mut group) in by_key {
            if group.len() > 1 {
                report_collision(&key, &group, &mut issues);
                continue;
            }
            if let Some(config) = group.pop() {
                projects.push(self.describe(config, active.as_deref(), live_status));
            }
        }

        ProjectScanReport { projects, issues }
    }

    fn describe(
        &self,
        config: DiscoveredConfig,
        active: Option<&[u8]>,
        live_status: LiveStatus,
    ) -> ProjectDescriptor {
        let project_dir = config.id.project_dir().to_string();
        let service_name =
            match ServiceName::new(format!("{}{project_dir}", self.config.service_prefix)) {
                Ok(name) => Some(name),
                Err(error) => {
                    debug!(
                        project_dir = %project_dir,
                        error = %error,
                        "project directory does not form a service name"
                    );
                    None
                }
            };
        let has_managed_service = service_name
            .as_ref()
            .is_some_and(|name| self.services.is_registered(name));
        let service_running = match (&service_name, live_status) {
            (Some(name), LiveStatus::Query) if has_managed_service => {
                self.services.query_status(name).is_running()
            }
            _ => false,
        };
        let is_active = active.is_some_and(|active| active == config.raw.as_slice());

        ProjectDescriptor {
            display_name: display_name_for_project_dir(&project_dir),
            task_description: config
                .fields
                .task_name
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            annotation_type: config
                .fields
                .annotation_type
                .unwrap_or_else(|| UNKNOWN_ANNOTATION_TYPE.to_string()),
            config_path: config.path,
            id: config.id,
            project_dir,
            service_name,
            has_managed_service,
            service_running,
            is_active,
        }
    }
}

fn discover_configs(hub_dir: &Path, issues: &mut Vec<ScanIssue>) -> Vec<DiscoveredConfig> {
    let Some(project_dirs) = sorted_entries(hub_dir, issues) else {
        return Vec::new();
    };

    let mut discovered = Vec::new();
    for project_path in project_dirs {
        let Some(project_dir) = visible_file_name(&project_path, issues) else {
            continue;
        };
        if !project_path.is_dir() {
            continue;
        }
        let configs_dir = project_path.join(CONFIGS_DIR_NAME);
        if !configs_dir.is_dir() {
            continue;
        }
        let Some(config_files) = sorted_entries(&configs_dir, issues) else {
            continue;
        };
        for config_path in config_files {
            if !has_config_extension(&config_path) || !config_path.is_file() {
                continue;
            }
            if visible_file_name(&config_path, issues).is_none() {
                continue;
            }
            if let Some(config) = load_config(&project_dir, config_path, issues) {
                discovered.push(config);
            }
        }
    }
    discovered
}

fn load_config(
    project_dir: &str,
    path: PathBuf,
    issues: &mut Vec<ScanIssue>,
) -> Option<DiscoveredConfig> {
    let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
        push_issue(issues, &path, ScanIssueKind::InvalidName, "file stem is not valid UTF-8");
        return None;
    };
    let id = match ProjectId::new(project_dir, stem) {
        Ok(id) => id,
        Err(error) => {
            push_issue(issues, &path, ScanIssueKind::InvalidName, error.to_string());
            return None;
        }
    };
    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(error) => {
            push_issue(issues, &path, ScanIssueKind::Unreadable, error.to_string());
            return None;
        }
    };
    let fields = match parse_project_config(&raw) {
        Ok(fields) => fields,
        Err(error) => {
            push_issue(issues, &path, ScanIssueKind::Parse, error.to_string());
            return None;
        }
    };
    let path = std::fs::canonicalize(&path).unwrap_or(path);
    Some(DiscoveredConfig {
        id,
        path,
        raw,
        fields,
    })
}

fn report_collision(key: &str, group: &[DiscoveredConfig], issues: &mut Vec<ScanIssue>) {
    for (index, config) in group.iter().enumerate() {
        let others = group
            .iter()
            .enumerate()
            .filter(|(other_index, _)| *other_index != index)
            .map(|(_, other)| other.path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        push_issue(
            issues,
            &config.path,
            ScanIssueKind::IdCollision,
            format!("project id '{key}' is also produced by {others}"),
        );
    }
}

fn sorted_entries(dir: &Path, issues: &mut Vec<ScanIssue>) -> Option<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            push_issue(issues, dir, ScanIssueKind::Unreadable, error.to_string());
            return None;
        }
    };
    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => paths.push(entry.path()),
            Err(error) => push_issue(issues, dir, ScanIssueKind::Unreadable, error.to_string()),
        }
    }
    paths.sort();
    Some(paths)
}

/// `None` for hidden entries (silently) and for names that are not UTF-8
/// (recorded as an issue).
fn visible_file_name(path: &Path, issues: &mut Vec<ScanIssue>) -> Option<String> {
    let name = path.file_name()?;
    let Some(name) = name.to_str() else {
        push_issue(issues, path, ScanIssueKind::InvalidName, "name is not valid UTF-8");
        return None;
    };
    if name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

fn has_config_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| CONFIG_EXTENSIONS.contains(&extension))
}

fn push_issue(
    issues: &mut Vec<ScanIssue>,
    path: &Path,
    kind: ScanIssueKind,
    message: impl Into<String>,
) {
    let message = message.into();
    warn!(
        path = %path.display(),
        kind = %kind,
        message = %message,
        "skipping project configuration"
    );
    issues.push(ScanIssue {
        path: path.to_path_buf(),
        kind,
        message,
    });
}
