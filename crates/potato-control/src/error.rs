use std::path::PathBuf;

use potato_projects::ConfigStoreError;
use potato_service::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("project '{project_id}' not found")]
    ProjectNotFound { project_id: String },
    #[error("failed to read project configuration {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    ActiveConfigWrite(#[from] ConfigStoreError),
    #[error("{source}{}", replaced_suffix(.config_replaced))]
    Service {
        /// Set when the active configuration was overwritten before the
        /// service command failed.
        config_replaced: bool,
        #[source]
        source: ServiceError,
    },
}

impl ControlError {
    /// Whether the active configuration changed even though the operation
    /// failed.
    pub fn config_replaced(&self) -> bool {
        matches!(
            self,
            Self::Service {
                config_replaced: true,
                ..
            }
        )
    }
}

impl From<ServiceError> for ControlError {
    fn from(source: ServiceError) -> Self {
        Self::Service {
            config_replaced: false,
            source,
        }
    }
}

fn replaced_suffix(config_replaced: &bool) -> &'static str {
    if *config_replaced {
        " (the active configuration was already replaced)"
    } else {
        ""
    }
}
