use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ServiceName;

/// Live activity reported by the service manager. Anything other than
/// `active` (including `activating` and `failed`) counts as not running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceActivity {
    Active,
    Inactive,
}

impl ServiceActivity {
    pub fn from_is_active_output(output: &str) -> Self {
        if output.trim() == "active" {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCommand {
    Start,
    Stop,
    Restart,
}

impl ServiceCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed result of asking the service manager to change a unit's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCommandOutcome {
    /// The manager accepted the command. It says nothing about whether the
    /// unit finished starting.
    Accepted,
    /// The manager ran and refused (non-zero exit status).
    Rejected {
        exit_code: Option<i32>,
        detail: String,
    },
    /// The manager could not be invoked at all, or did not finish in time.
    Failed { reason: String },
}

impl ServiceCommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn into_result(
        self,
        command: ServiceCommand,
        service: &ServiceName,
    ) -> Result<(), ServiceError> {
        match self {
            Self::Accepted => Ok(()),
            Self::Rejected { exit_code, detail } => Err(ServiceError::Rejected {
                operation: command.as_str().to_string(),
                service: service.to_string(),
                exit_code,
                detail,
            }),
            Self::Failed { reason } => Err(ServiceError::Failed {
                operation: command.as_str().to_string(),
                service: service.to_string(),
                reason,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("service manager rejected `{operation} {service}` ({}): {detail}", exit_code_label(.exit_code))]
    Rejected {
        operation: String,
        service: String,
        exit_code: Option<i32>,
        detail: String,
    },
    #[error("failed to run `{operation} {service}`: {reason}")]
    Failed {
        operation: String,
        service: String,
        reason: String,
    },
}

fn exit_code_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Narrow contract over the OS service manager.
///
/// Implementations block the calling thread; async callers should hop onto
/// a blocking pool.
pub trait ServiceManager: Send + Sync {
    fn query_status(&self, service: &ServiceName) -> ServiceActivity;

    fn run(&self, command: ServiceCommand, service: &ServiceName) -> ServiceCommandOutcome;

    /// Returns the most recent `line_count` journal lines for `service`.
    fn fetch_log(&self, service: &ServiceName, line_count: usize) -> Result<String, ServiceError>;

    /// Whether a unit file for `service` is installed.
    fn is_registered(&self, service: &ServiceName) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_service_activity_only_treats_exact_active_as_running() {
        assert_eq!(
            ServiceActivity::from_is_active_output("active\n"),
            ServiceActivity::Active
        );
        for output in ["inactive", "failed", "activating", "unknown", ""] {
            assert_eq!(
                ServiceActivity::from_is_active_output(output),
                ServiceActivity::Inactive,
                "{output}"
            );
        }
        assert!(ServiceActivity::Active.is_running());
        assert!(!ServiceActivity::Inactive.is_running());
    }

    #[test]
    fn unit_outcome_into_result_maps_each_variant() {
        let service = ServiceName::new("potato").expect("name");
        assert_eq!(
            ServiceCommandOutcome::Accepted.into_result(ServiceCommand::Restart, &service),
            Ok(())
        );

        let rejected = ServiceCommandOutcome::Rejected {
            exit_code: Some(5),
            detail: "Unit potato.service not found.".to_string(),
        }
        .into_result(ServiceCommand::Start, &service)
        .expect_err("rejected");
        assert_eq!(
            rejected.to_string(),
            "service manager rejected `start potato` (exit code 5): Unit potato.service not found."
        );

        let failed = ServiceCommandOutcome::Failed {
            reason: "No such file or directory".to_string(),
        }
        .into_result(ServiceCommand::Stop, &service)
        .expect_err("failed");
        assert_eq!(
            failed.to_string(),
            "failed to run `stop potato`: No such file or directory"
        );
    }

    #[test]
    fn unit_rejected_without_exit_code_reports_signal() {
        let service = ServiceName::new("potato").expect("name");
        let error = ServiceCommandOutcome::Rejected {
            exit_code: None,
            detail: String::new(),
        }
        .into_result(ServiceCommand::Restart, &service)
        .expect_err("rejected");
        assert!(error.to_string().contains("terminated by signal"));
    }
}
