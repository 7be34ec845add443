use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    ServiceActivity, ServiceCommand, ServiceCommandOutcome, ServiceError, ServiceManager,
    ServiceName,
};

/// One command observed by [`InMemoryServiceManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedServiceCommand {
    pub command: ServiceCommand,
    pub service: ServiceName,
}

/// In-memory implementation for tests and local dry runs.
///
/// Accepted commands mutate the simulated activity: `start`/`restart` mark a
/// unit active, `stop` marks it inactive.
#[derive(Debug, Default)]
pub struct InMemoryServiceManager {
    inner: Mutex<InMemoryServiceState>,
}

#[derive(Debug, Default)]
struct InMemoryServiceState {
    registered: BTreeSet<ServiceName>,
    active: BTreeSet<ServiceName>,
    journal: BTreeMap<ServiceName, Vec<String>>,
    scripted_outcomes: BTreeMap<(ServiceCommand, ServiceName), ServiceCommandOutcome>,
    journal_failure: Option<String>,
    commands: Vec<RecordedServiceCommand>,
    status_queries: usize,
}

impl InMemoryServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryServiceState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, service: &ServiceName) {
        self.state().registered.insert(service.clone());
    }

    pub fn set_activity(&self, service: &ServiceName, activity: ServiceActivity) {
        let mut state = self.state();
        match activity {
            ServiceActivity::Active => state.active.insert(service.clone()),
            ServiceActivity::Inactive => state.active.remove(service),
        };
    }

    pub fn append_journal_lines<I, S>(&self, service: &ServiceName, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state()
            .journal
            .entry(service.clone())
            .or_default()
            .extend(lines.into_iter().map(Into::into));
    }

    /// Makes every subsequent journal read fail with `reason`.
    pub fn fail_journal_reads(&self, reason: impl Into<String>) {
        self.state().journal_failure = Some(reason.into());
    }

    /// Returns `outcome` (without changing activity) for every later
    /// `command` on `service`.
    pub fn script_outcome(
        &self,
        command: ServiceCommand,
        service: &ServiceName,
        outcome: ServiceCommandOutcome,
    ) {
        self.state()
            .scripted_outcomes
            .insert((command, service.clone()), outcome);
    }

    pub fn recorded_commands(&self) -> Vec<RecordedServiceCommand> {
        self.state().commands.clone()
    }

    pub fn commands_for(&self, service: &ServiceName) -> Vec<ServiceCommand> {
        self.state()
            .commands
            .iter()
            .filter(|recorded| &recorded.service == service)
            .map(|recorded| recorded.command)
            .collect()
    }

    pub fn status_query_count(&self) -> usize {
        self.state().status_queries
    }
}

impl ServiceManager for InMemoryServiceManager {
    fn query_status(&self, service: &ServiceName) -> ServiceActivity {
        let mut state = self.state();
        state.status_queries = state.status_queries.saturating_add(1);
        if state.active.contains(service) {
            ServiceActivity::Active
        } else {
            ServiceActivity::Inactive
        }
    }

    fn run(&self, command: ServiceCommand, service: &ServiceName) -> ServiceCommandOutcome {
        let mut state = self.state();
        state.commands.push(RecordedServiceCommand {
            command,
            service: service.clone(),
        });
        if let Some(outcome) = state.scripted_outcomes.get(&(command, service.clone())) {
            return outcome.clone();
        }
        match command {
            ServiceCommand::Start | ServiceCommand::Restart => {
                state.active.insert(service.clone());
            }
            ServiceCommand::Stop => {
                state.active.remove(service);
            }
        }
        ServiceCommandOutcome::Accepted
    }

    fn fetch_log(&self, service: &ServiceName, line_count: usize) -> Result<String, ServiceError> {
        let state = self.state();
        if let Some(reason) = &state.journal_failure {
            return Err(ServiceError::Failed {
                operation: "journalctl".to_string(),
                service: service.to_string(),
                reason: reason.clone(),
            });
        }
        let lines = state
            .journal
            .get(service)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = lines.len().saturating_sub(line_count);
        Ok(lines[start..].join("\n"))
    }

    fn is_registered(&self, service: &ServiceName) -> bool {
        self.state().registered.contains(service)
    }
}
