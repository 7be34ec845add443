use std::path::PathBuf;

use clap::Parser;

pub(crate) fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "potato-manager",
    about = "Switch, start, stop and inspect Potato annotation projects",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "POTATO_APP_DIR",
        default_value = "/opt/potato",
        help = "Potato installation directory holding the project hub and the active config"
    )]
    pub app_dir: PathBuf,

    #[arg(
        long,
        env = "POTATO_PROJECT_HUB_DIR",
        help = "Project hub directory scanned for {project}/configs/*.yaml (defaults to <app-dir>/project-hub)"
    )]
    pub project_hub_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "POTATO_ACTIVE_CONFIG",
        help = "Active configuration file read by the primary service (defaults to <app-dir>/config.yaml)"
    )]
    pub active_config: Option<PathBuf>,

    #[arg(
        long,
        env = "POTATO_SYSTEMD_UNIT_DIR",
        default_value = "/etc/systemd/system",
        help = "Directory checked for per-project unit files"
    )]
    pub systemd_unit_dir: PathBuf,

    #[arg(
        long,
        env = "POTATO_PRIMARY_SERVICE",
        default_value = "potato",
        help = "Unit restarted after every project switch"
    )]
    pub primary_service: String,

    #[arg(
        long,
        env = "POTATO_SERVICE_PREFIX",
        default_value = "potato-",
        help = "Prefix joined with a project directory name to form its unit name"
    )]
    pub service_prefix: String,

    #[arg(
        long,
        env = "POTATO_BIND",
        default_value = "0.0.0.0:8080",
        help = "Socket address for the control panel"
    )]
    pub bind: String,

    #[arg(
        long,
        env = "POTATO_LOG_LINES",
        default_value_t = 50,
        value_parser = parse_positive_usize,
        help = "Journal lines shown by the log views"
    )]
    pub log_lines: usize,

    #[arg(
        long,
        env = "POTATO_SERVICE_COMMAND_TIMEOUT_MS",
        default_value_t = 0,
        help = "Kill systemctl/journalctl invocations after this many milliseconds (0 waits indefinitely)"
    )]
    pub service_command_timeout_ms: u64,

    #[arg(
        long,
        env = "POTATO_SYSTEMCTL_BIN",
        default_value = "systemctl",
        help = "systemctl executable"
    )]
    pub systemctl_bin: String,

    #[arg(
        long,
        env = "POTATO_JOURNALCTL_BIN",
        default_value = "journalctl",
        help = "journalctl executable"
    )]
    pub journalctl_bin: String,

    #[arg(long, help = "List discovered projects and skipped configurations, then exit")]
    pub list_projects: bool,

    #[arg(long, help = "Show the active project summary, then exit")]
    pub show_active: bool,

    #[arg(
        long,
        value_name = "project_id",
        help = "Activate a project by id ({directory}_{config stem}) and restart the primary service"
    )]
    pub activate: Option<String>,

    #[arg(long, value_name = "service", help = "Start a unit by name")]
    pub start_service: Option<String>,

    #[arg(long, value_name = "service", help = "Stop a unit by name")]
    pub stop_service: Option<String>,

    #[arg(long, help = "Restart the primary service")]
    pub restart_primary: bool,

    #[arg(long, value_name = "service", help = "Print recent journal lines for a unit")]
    pub logs: Option<String>,

    #[arg(long, help = "Render reports as pretty JSON")]
    pub json: bool,

    #[arg(
        long,
        default_value = "",
        help = "Host used to build the access URL for --show-active"
    )]
    pub request_host: String,
}
