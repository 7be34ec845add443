use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use potato_control::{ActivationController, ControlError, DesiredServiceState};
use potato_core::current_unix_timestamp_nanos;
use potato_projects::{
    ActiveConfigStore, FsActiveConfigStore, ProjectRegistry, ProjectRegistryConfig, ScanIssueKind,
    NO_ACTIVE_CONFIGURATION, NO_ACTIVE_PROJECT,
};
use potato_service::{
    ServiceActivity, ServiceCommand, ServiceCommandOutcome, ServiceError, ServiceManager,
    ServiceName,
};

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(1);

const SENTIMENT_CONFIG: &str = "server_name: potato-sentiment\nannotation_task_name: \"Sentiment\"\nannotation_schemes:\n  - annotation_type: likert\n    labels: [negative, neutral, positive]\n";

/// Service manager double that snapshots the active configuration each time
/// the primary service is restarted.
struct ObservingServiceManager {
    active_config: PathBuf,
    primary: ServiceName,
    commands: Mutex<Vec<(ServiceCommand, String)>>,
    restart_snapshots: Mutex<Vec<Option<String>>>,
    running: Mutex<BTreeSet<String>>,
    registered: BTreeSet<String>,
}

impl ObservingServiceManager {
    fn new(active_config: PathBuf, primary: ServiceName, registered: &[&str]) -> Self {
        Self {
            active_config,
            primary,
            commands: Mutex::new(Vec::new()),
            restart_snapshots: Mutex::new(Vec::new()),
            running: Mutex::new(BTreeSet::new()),
            registered: registered.iter().map(|name| name.to_string()).collect(),
        }
    }

    fn commands(&self) -> Vec<(ServiceCommand, String)> {
        self.commands.lock().expect("commands lock").clone()
    }

    fn restart_snapshots(&self) -> Vec<Option<String>> {
        self.restart_snapshots.lock().expect("snapshot lock").clone()
    }
}

impl ServiceManager for ObservingServiceManager {
    fn query_status(&self, service: &ServiceName) -> ServiceActivity {
        if self.running.lock().expect("running lock").contains(service.as_str()) {
            ServiceActivity::Active
        } else {
            ServiceActivity::Inactive
        }
    }

    fn run(&self, command: ServiceCommand, service: &ServiceName) -> ServiceCommandOutcome {
        self.commands
            .lock()
            .expect("commands lock")
            .push((command, service.to_string()));
        if command == ServiceCommand::Restart && service == &self.primary {
            self.restart_snapshots
                .lock()
                .expect("snapshot lock")
                .push(fs::read_to_string(&self.active_config).ok());
        }
        let mut running = self.running.lock().expect("running lock");
        match command {
            ServiceCommand::Start | ServiceCommand::Restart => {
                running.insert(service.to_string());
            }
            ServiceCommand::Stop => {
                running.remove(service.as_str());
            }
        }
        ServiceCommandOutcome::Accepted
    }

    fn fetch_log(&self, service: &ServiceName, _line_count: usize) -> Result<String, ServiceError> {
        Err(ServiceError::Failed {
            operation: "journalctl".to_string(),
            service: service.to_string(),
            reason: "journal is not available in this environment".to_string(),
        })
    }

    fn is_registered(&self, service: &ServiceName) -> bool {
        self.registered.contains(service.as_str())
    }
}

struct IsolatedWorkspace {
    root: PathBuf,
}

impl IsolatedWorkspace {
    fn new(label: &str) -> Self {
        let counter = WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "potato-integration-{label}-{}-{}-{counter}",
            std::process::id(),
            current_unix_timestamp_nanos()
        ));
        fs::create_dir_all(&root).expect("create isolated workspace");
        Self { root }
    }

    fn hub(&self) -> PathBuf {
        self.root.join("project-hub")
    }

    fn active_config(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    fn write_project_config(&self, project: &str, file: &str, content: &str) -> PathBuf {
        let configs = self.hub().join(project).join("configs");
        fs::create_dir_all(&configs).expect("create configs dir");
        let path = configs.join(file);
        fs::write(&path, content).expect("write project config");
        path
    }
}

impl Drop for IsolatedWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

struct Stack {
    services: Arc<ObservingServiceManager>,
    controller: ActivationController,
}

fn build_stack(workspace: &IsolatedWorkspace, registered: &[&str]) -> Stack {
    let primary = ServiceName::new("potato").expect("primary service");
    let services = Arc::new(ObservingServiceManager::new(
        workspace.active_config(),
        primary.clone(),
        registered,
    ));
    let store: Arc<dyn ActiveConfigStore> =
        Arc::new(FsActiveConfigStore::new(workspace.active_config()));
    let registry = Arc::new(ProjectRegistry::new(
        ProjectRegistryConfig {
            hub_dir: workspace.hub(),
            primary_service: primary,
            service_prefix: "potato-".to_string(),
        },
        services.clone(),
        store.clone(),
    ));
    let controller = ActivationController::new(registry, store, services.clone());
    Stack {
        services,
        controller,
    }
}

fn assert_path_ends_with(path: &Path, suffix: &str) {
    assert!(path.ends_with(suffix), "{} should end with {suffix}", path.display());
}

#[test]
fn integration_sentiment_project_scan_activate_and_summarize() {
    let workspace = IsolatedWorkspace::new("sentiment");
    workspace.write_project_config("sentiment", "a.yaml", SENTIMENT_CONFIG);
    let stack = build_stack(&workspace, &[]);
    let registry = stack.controller.registry();

    let before = registry.current_active("annotate.example.org:8080");
    assert_eq!(before.name, NO_ACTIVE_PROJECT);
    assert_eq!(before.task_description, NO_ACTIVE_CONFIGURATION);
    assert!(!before.running);
    assert!(before.access_url.is_empty());

    let projects = registry.scan();
    assert_eq!(projects.len(), 1);
    let sentiment = &projects[0];
    assert_eq!(sentiment.id.as_str(), "sentiment_a");
    assert_eq!(sentiment.display_name, "Sentiment");
    assert_eq!(sentiment.task_description, "Sentiment");
    assert_eq!(sentiment.annotation_type, "likert");
    assert_eq!(
        sentiment.service_name.as_ref().map(|name| name.as_str()),
        Some("potato-sentiment")
    );
    assert!(!sentiment.has_managed_service);
    assert_path_ends_with(&sentiment.config_path, "sentiment/configs/a.yaml");

    let receipt = stack.controller.activate("sentiment_a").expect("activate");
    assert_eq!(receipt.project_id.as_str(), "sentiment_a");
    assert_eq!(
        fs::read(workspace.active_config()).expect("active config"),
        SENTIMENT_CONFIG.as_bytes()
    );
    assert_eq!(
        stack.services.commands(),
        vec![(ServiceCommand::Restart, "potato".to_string())]
    );
    assert_eq!(
        stack.services.restart_snapshots(),
        vec![Some(SENTIMENT_CONFIG.to_string())]
    );

    let after = registry.current_active("annotate.example.org:8080");
    assert_eq!(after.name, "potato-sentiment");
    assert_eq!(after.task_description, "Sentiment");
    assert!(after.running);
    assert_eq!(after.access_url, "http://annotate.example.org");
    assert!(registry.scan()[0].is_active);
}

#[test]
fn integration_malformed_configs_do_not_hide_valid_projects() {
    let workspace = IsolatedWorkspace::new("malformed");
    workspace.write_project_config("sentiment", "a.yaml", SENTIMENT_CONFIG);
    workspace.write_project_config("sentiment", "broken.yaml", "annotation_schemes: [\n");
    workspace.write_project_config("ner", "config.yml", "annotation_task_name: NER\n");
    workspace.write_project_config("ner", "scalar.yaml", "just a string\n");
    let stack = build_stack(&workspace, &["potato-ner"]);
    let registry = stack.controller.registry();

    let first = registry.scan_report();
    let ids: BTreeSet<String> = first
        .projects
        .iter()
        .map(|project| project.id.to_string())
        .collect();
    assert_eq!(
        ids,
        BTreeSet::from(["ner_config".to_string(), "sentiment_a".to_string()])
    );
    assert_eq!(first.issues.len(), 2);
    assert!(first
        .issues
        .iter()
        .all(|issue| issue.kind == ScanIssueKind::Parse));

    let second: BTreeSet<String> = registry
        .scan()
        .iter()
        .map(|project| project.id.to_string())
        .collect();
    assert_eq!(ids, second);

    let ner = first
        .projects
        .iter()
        .find(|project| project.project_dir == "ner")
        .expect("ner project");
    assert!(ner.has_managed_service);
    assert!(!ner.service_running);
}

#[test]
fn integration_unknown_project_leaves_active_config_and_services_untouched() {
    let workspace = IsolatedWorkspace::new("unknown");
    workspace.write_project_config("sentiment", "a.yaml", SENTIMENT_CONFIG);
    fs::write(workspace.active_config(), "server_name: previous\n").expect("seed active");
    let stack = build_stack(&workspace, &[]);

    let error = stack
        .controller
        .activate("sentiment_b")
        .expect_err("unknown project");
    assert!(matches!(error, ControlError::ProjectNotFound { .. }));
    assert_eq!(
        fs::read_to_string(workspace.active_config()).expect("active config"),
        "server_name: previous\n"
    );
    assert!(stack.services.commands().is_empty());
}

#[test]
fn integration_switching_projects_replaces_active_config_in_full() {
    let workspace = IsolatedWorkspace::new("switch");
    workspace.write_project_config("sentiment", "a.yaml", SENTIMENT_CONFIG);
    workspace.write_project_config("ner", "config.yaml", "annotation_task_name: NER\n");
    let stack = build_stack(&workspace, &["potato-ner", "potato-sentiment"]);

    stack.controller.activate("sentiment_a").expect("first activation");
    stack.controller.activate("ner_config").expect("second activation");
    assert_eq!(
        fs::read_to_string(workspace.active_config()).expect("active config"),
        "annotation_task_name: NER\n"
    );
    assert_eq!(
        stack.services.restart_snapshots(),
        vec![
            Some(SENTIMENT_CONFIG.to_string()),
            Some("annotation_task_name: NER\n".to_string()),
        ]
    );

    let active: Vec<String> = stack
        .controller
        .registry()
        .scan()
        .into_iter()
        .filter(|project| project.is_active)
        .map(|project| project.id.to_string())
        .collect();
    assert_eq!(active, vec!["ner_config".to_string()]);
}

#[test]
fn integration_service_passthroughs_and_log_placeholder() {
    let workspace = IsolatedWorkspace::new("services");
    workspace.write_project_config("ner", "config.yaml", "annotation_task_name: NER\n");
    let stack = build_stack(&workspace, &["potato-ner"]);
    let ner = ServiceName::new("potato-ner").expect("service name");

    stack
        .controller
        .set_service_state(&ner, DesiredServiceState::Running)
        .expect("start");
    assert!(stack.controller.registry().scan()[0].service_running);
    stack
        .controller
        .set_service_state(&ner, DesiredServiceState::Stopped)
        .expect("stop");
    stack.controller.restart_primary().expect("restart primary");
    assert_eq!(
        stack.services.commands(),
        vec![
            (ServiceCommand::Start, "potato-ner".to_string()),
            (ServiceCommand::Stop, "potato-ner".to_string()),
            (ServiceCommand::Restart, "potato".to_string()),
        ]
    );
    assert_eq!(stack.services.restart_snapshots(), vec![None]);

    let logs = stack.controller.fetch_logs(&ner, 50);
    assert!(!logs.collected);
    assert_eq!(logs.lines.len(), 1);
    assert!(logs.lines[0].starts_with("Could not retrieve logs for potato-ner: "));
}
