use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use potato_core::current_unix_timestamp_ms;
use potato_projects::{ActiveConfigStore, ProjectId, ProjectRegistry};
use potato_service::{ServiceCommand, ServiceManager, ServiceName};
use serde::Serialize;
use tracing::{info, warn};

use crate::ControlError;

pub const LOG_PLACEHOLDER_PREFIX: &str = "Could not retrieve logs for";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredServiceState {
    Running,
    Stopped,
}

impl DesiredServiceState {
    pub fn command(self) -> ServiceCommand {
        match self {
            Self::Running => ServiceCommand::Start,
            Self::Stopped => ServiceCommand::Stop,
        }
    }
}

/// Returned by a successful activation. The restart was accepted by the
/// service manager; the service may still be starting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReceipt {
    pub project_id: ProjectId,
    pub display_name: String,
    pub source_path: PathBuf,
    pub active_location: String,
    pub restarted_service: ServiceName,
    pub activated_unix_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceLogs {
    pub service: ServiceName,
    pub lines: Vec<String>,
    /// `false` when `lines` holds the placeholder instead of journal output.
    pub collected: bool,
}

impl ServiceLogs {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct ActivationController {
    registry: Arc<ProjectRegistry>,
    store: Arc<dyn ActiveConfigStore>,
    services: Arc<dyn ServiceManager>,
    activation_lock: Mutex<()>,
}

impl ActivationController {
    pub fn new(
        registry: Arc<ProjectRegistry>,
        store: Arc<dyn ActiveConfigStore>,
        services: Arc<dyn ServiceManager>,
    ) -> Self {
        Self {
            registry,
            store,
            services,
            activation_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn primary_service(&self) -> &ServiceName {
        &self.registry.config().primary_service
    }

    /// Copies the project's configuration into the active slot and restarts
    /// the primary service.
    ///
    /// The write and the restart are two separate steps: when the restart
    /// fails the error reports `config_replaced() == true`.
    pub fn activate(&self, project_id: &str) -> Result<ActivationReceipt, ControlError> {
        let _guard = self
            .activation_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let descriptor =
            self.registry
                .locate(project_id)
                .ok_or_else(|| ControlError::ProjectNotFound {
                    project_id: project_id.to_string(),
                })?;

        let content = std::fs::read(&descriptor.config_path).map_err(|source| {
            ControlError::SourceUnreadable {
                path: descriptor.config_path.clone(),
                source,
            }
        })?;
        self.store.write_active(&content)?;
        info!(
            project_id = %descriptor.id,
            source = %descriptor.config_path.display(),
            target = %self.store.location(),
            bytes = content.len(),
            "active configuration replaced"
        );

        let primary = self.primary_service().clone();
        self.services
            .run(ServiceCommand::Restart, &primary)
            .into_result(ServiceCommand::Restart, &primary)
            .map_err(|source| {
                warn!(
                    project_id = %descriptor.id,
                    error = %source,
                    "restart after activation failed"
                );
                ControlError::Service {
                    config_replaced: true,
                    source,
                }
            })?;
        info!(project_id = %descriptor.id, service = %primary, "project activated");

        Ok(ActivationReceipt {
            project_id: descriptor.id,
            display_name: descriptor.display_name,
            source_path: descriptor.config_path,
            active_location: self.store.location(),
            restarted_service: primary,
            activated_unix_ms: current_unix_timestamp_ms(),
        })
    }

    /// Starts or stops any unit; membership in the project hub is not
    /// checked.
    pub fn set_service_state(
        &self,
        service: &ServiceName,
        desired: DesiredServiceState,
    ) -> Result<(), ControlError> {
        let command = desired.command();
        self.services
            .run(command, service)
            .into_result(command, service)?;
        Ok(())
    }

    pub fn restart_primary(&self) -> Result<(), ControlError> {
        let primary = self.primary_service();
        self.services
            .run(ServiceCommand::Restart, primary)
            .into_result(ServiceCommand::Restart, primary)?;
        Ok(())
    }

    /// Never fails: collection errors become a single placeholder line.
    pub fn fetch_logs(&self, service: &ServiceName, line_count: usize) -> ServiceLogs {
        match self.services.fetch_log(service, line_count) {
            Ok(text) => ServiceLogs {
                service: service.clone(),
                lines: text.lines().map(str::to_string).collect(),
                collected: true,
            },
            Err(error) => {
                warn!(service = %service, error = %error, "failed to collect service logs");
                ServiceLogs {
                    service: service.clone(),
                    lines: vec![format!("{LOG_PLACEHOLDER_PREFIX} {service}: {error}")],
                    collected: false,
                }
            }
        }
    }
}
