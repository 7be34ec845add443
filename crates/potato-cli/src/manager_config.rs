use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use potato_projects::ProjectRegistryConfig;
use potato_service::{ServiceName, SystemctlServiceManagerConfig};

use crate::Cli;

pub const PROJECT_HUB_DIR_NAME: &str = "project-hub";
pub const ACTIVE_CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolved runtime settings, passed explicitly to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManagerConfig {
    pub app_dir: PathBuf,
    pub project_hub_dir: PathBuf,
    pub active_config: PathBuf,
    pub systemd_unit_dir: PathBuf,
    pub primary_service: ServiceName,
    pub service_prefix: String,
    pub bind: String,
    pub log_lines: usize,
    pub service_command_timeout: Option<Duration>,
    pub systemctl_bin: String,
    pub journalctl_bin: String,
}

impl ProjectManagerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let primary_service = ServiceName::new(cli.primary_service.trim())
            .with_context(|| format!("invalid --primary-service '{}'", cli.primary_service))?;
        if cli.systemctl_bin.trim().is_empty() {
            bail!("--systemctl-bin cannot be empty");
        }
        if cli.journalctl_bin.trim().is_empty() {
            bail!("--journalctl-bin cannot be empty");
        }
        if cli.bind.trim().is_empty() {
            bail!("--bind cannot be empty");
        }

        let project_hub_dir = cli
            .project_hub_dir
            .clone()
            .unwrap_or_else(|| cli.app_dir.join(PROJECT_HUB_DIR_NAME));
        let active_config = cli
            .active_config
            .clone()
            .unwrap_or_else(|| cli.app_dir.join(ACTIVE_CONFIG_FILE_NAME));
        let service_command_timeout = (cli.service_command_timeout_ms > 0)
            .then(|| Duration::from_millis(cli.service_command_timeout_ms));

        Ok(Self {
            app_dir: cli.app_dir.clone(),
            project_hub_dir,
            active_config,
            systemd_unit_dir: cli.systemd_unit_dir.clone(),
            primary_service,
            service_prefix: cli.service_prefix.clone(),
            bind: cli.bind.trim().to_string(),
            log_lines: cli.log_lines,
            service_command_timeout,
            systemctl_bin: cli.systemctl_bin.trim().to_string(),
            journalctl_bin: cli.journalctl_bin.trim().to_string(),
        })
    }

    pub fn registry_config(&self) -> ProjectRegistryConfig {
        ProjectRegistryConfig {
            hub_dir: self.project_hub_dir.clone(),
            primary_service: self.primary_service.clone(),
            service_prefix: self.service_prefix.clone(),
        }
    }

    pub fn systemctl_config(&self) -> SystemctlServiceManagerConfig {
        SystemctlServiceManagerConfig {
            systemctl_bin: self.systemctl_bin.clone(),
            journalctl_bin: self.journalctl_bin.clone(),
            unit_dir: self.systemd_unit_dir.clone(),
            command_timeout: self.service_command_timeout,
        }
    }
}
