use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::{
    ServiceActivity, ServiceCommand, ServiceCommandOutcome, ServiceError, ServiceManager,
    ServiceName,
};

const DEFAULT_SYSTEMCTL_BIN: &str = "systemctl";
const DEFAULT_JOURNALCTL_BIN: &str = "journalctl";
const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
const JOURNAL_OPERATION: &str = "journalctl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemctlServiceManagerConfig {
    pub systemctl_bin: String,
    pub journalctl_bin: String,
    pub unit_dir: PathBuf,
    /// `None` waits for the command indefinitely.
    pub command_timeout: Option<Duration>,
}

impl Default for SystemctlServiceManagerConfig {
    fn default() -> Self {
        Self {
            systemctl_bin: DEFAULT_SYSTEMCTL_BIN.to_string(),
            journalctl_bin: DEFAULT_JOURNALCTL_BIN.to_string(),
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
            command_timeout: None,
        }
    }
}

/// [`ServiceManager`] backed by the `systemctl` and `journalctl` executables.
#[derive(Debug, Clone, Default)]
pub struct SystemctlServiceManager {
    config: SystemctlServiceManagerConfig,
}

impl SystemctlServiceManager {
    pub fn new(config: SystemctlServiceManagerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SystemctlServiceManagerConfig {
        &self.config
    }

    fn run_systemctl(&self, args: &[&str]) -> Result<CapturedOutput, String> {
        run_captured(&self.config.systemctl_bin, args, self.config.command_timeout)
    }
}

impl ServiceManager for SystemctlServiceManager {
    fn query_status(&self, service: &ServiceName) -> ServiceActivity {
        match self.run_systemctl(&["is-active", service.as_str()]) {
            Ok(output) => ServiceActivity::from_is_active_output(&output.stdout),
            Err(reason) => {
                debug!(service = %service, %reason, "service status query failed");
                ServiceActivity::Inactive
            }
        }
    }

    fn run(&self, command: ServiceCommand, service: &ServiceName) -> ServiceCommandOutcome {
        match self.run_systemctl(&[command.as_str(), service.as_str()]) {
            Ok(output) if output.success => {
                info!(service = %service, command = command.as_str(), "service command accepted");
                ServiceCommandOutcome::Accepted
            }
            Ok(output) => {
                warn!(
                    service = %service,
                    command = command.as_str(),
                    exit_code = ?output.exit_code,
                    "service command rejected"
                );
                ServiceCommandOutcome::Rejected {
                    exit_code: output.exit_code,
                    detail: output.diagnostic(),
                }
            }
            Err(reason) => {
                warn!(service = %service, command = command.as_str(), %reason, "service command failed");
                ServiceCommandOutcome::Failed { reason }
            }
        }
    }

    fn fetch_log(&self, service: &ServiceName, line_count: usize) -> Result<String, ServiceError> {
        let line_count = line_count.to_string();
        let output = run_captured(
            &self.config.journalctl_bin,
            &["-u", service.as_str(), "-n", line_count.as_str(), "--no-pager"],
            self.config.command_timeout,
        )
        .map_err(|reason| ServiceError::Failed {
            operation: JOURNAL_OPERATION.to_string(),
            service: service.to_string(),
            reason,
        })?;
        if !output.success {
            return Err(ServiceError::Rejected {
                operation: JOURNAL_OPERATION.to_string(),
                service: service.to_string(),
                exit_code: output.exit_code,
                detail: output.diagnostic(),
            });
        }
        Ok(output.stdout)
    }

    fn is_registered(&self, service: &ServiceName) -> bool {
        self.config.unit_dir.join(service.unit_file_name()).is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CapturedOutput {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CapturedOutput {
    fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

fn run_captured(
    program: &str,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<CapturedOutput, String> {
    debug!(program, ?args, "invoking service manager");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| format!("failed to spawn {program}: {error}"))?;

    // Both pipes are drained on reader threads while the child runs.
    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let status = match wait_for_child(&mut child, timeout) {
        Ok(status) => status,
        Err(reason) => {
            // A grandchild may still hold the pipes open, so the readers are
            // detached instead of joined.
            drop(stdout_reader);
            drop(stderr_reader);
            return Err(reason);
        }
    };
    let stdout = join_pipe_reader(stdout_reader);
    let stderr = join_pipe_reader(stderr_reader);
    debug!(program, status = ?status, "service manager exited");

    Ok(CapturedOutput {
        success: status.success(),
        exit_code: status.code(),
        stdout,
        stderr,
    })
}

fn wait_for_child(
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<std::process::ExitStatus, String> {
    let Some(timeout) = timeout else {
        return child
            .wait()
            .map_err(|error| format!("failed while waiting for process: {error}"));
    };
    match child
        .wait_timeout(timeout)
        .map_err(|error| format!("failed while waiting for process: {error}"))?
    {
        Some(status) => Ok(status),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(format!("timed out after {} ms", timeout.as_millis()))
        }
    }
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join_pipe_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
