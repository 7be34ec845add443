use std::path::Path;
use std::sync::Arc;

use potato_projects::{
    ActiveConfigStore, FsActiveConfigStore, InMemoryActiveConfigStore, ProjectRegistry,
    ProjectRegistryConfig, CONFIGS_DIR_NAME, DEFAULT_SERVICE_PREFIX,
};
use potato_service::{
    InMemoryServiceManager, RecordedServiceCommand, ServiceActivity, ServiceCommand,
    ServiceCommandOutcome, ServiceManager, ServiceName,
};
use tempfile::TempDir;

use super::*;

const SENTIMENT_CONFIG: &str =
    "annotation_task_name: Sentiment\nannotation_schemes:\n  - annotation_type: likert\n";

struct Harness {
    hub: TempDir,
    services: Arc<InMemoryServiceManager>,
    store: Arc<InMemoryActiveConfigStore>,
    controller: ActivationController,
}

fn service(raw: &str) -> ServiceName {
    ServiceName::new(raw).expect("service name")
}

fn registry_config(hub: &Path) -> ProjectRegistryConfig {
    ProjectRegistryConfig {
        hub_dir: hub.to_path_buf(),
        primary_service: service("potato"),
        service_prefix: DEFAULT_SERVICE_PREFIX.to_string(),
    }
}

fn harness() -> Harness {
    let hub = tempfile::tempdir().expect("tempdir");
    let services = Arc::new(InMemoryServiceManager::new());
    let store = Arc::new(InMemoryActiveConfigStore::new());
    let registry = Arc::new(ProjectRegistry::new(
        registry_config(hub.path()),
        services.clone(),
        store.clone(),
    ));
    let controller = ActivationController::new(registry, store.clone(), services.clone());
    Harness {
        hub,
        services,
        store,
        controller,
    }
}

fn write_config(hub: &Path, project: &str, file: &str, content: &str) {
    let configs = hub.join(project).join(CONFIGS_DIR_NAME);
    std::fs::create_dir_all(&configs).expect("create configs dir");
    std::fs::write(configs.join(file), content).expect("write config");
}

#[test]
fn functional_activate_copies_config_and_restarts_primary_once() {
    let harness = harness();
    write_config(harness.hub.path(), "sentiment", "a.yaml", SENTIMENT_CONFIG);

    let receipt = harness.controller.activate("sentiment_a").expect("activate");
    assert_eq!(receipt.project_id.as_str(), "sentiment_a");
    assert_eq!(receipt.display_name, "Sentiment");
    assert_eq!(receipt.restarted_service, service("potato"));
    let json = serde_json::to_value(&receipt).expect("receipt json");
    assert_eq!(json["project_id"], "sentiment_a");
    assert!(json.get("config_replaced").is_none());
    assert_eq!(
        harness.store.content().as_deref(),
        Some(SENTIMENT_CONFIG.as_bytes())
    );
    assert_eq!(
        harness.services.recorded_commands(),
        vec![RecordedServiceCommand {
            command: ServiceCommand::Restart,
            service: service("potato"),
        }]
    );

    let projects = harness.controller.registry().scan();
    assert!(projects[0].is_active);
}

#[test]
fn regression_activate_unknown_project_writes_nothing_and_runs_nothing() {
    let harness = harness();
    write_config(harness.hub.path(), "sentiment", "a.yaml", SENTIMENT_CONFIG);

    let error = harness.controller.activate("ghost").expect_err("not found");
    assert!(matches!(
        &error,
        ControlError::ProjectNotFound { project_id } if project_id == "ghost"
    ));
    assert_eq!(error.to_string(), "project 'ghost' not found");
    assert!(!error.config_replaced());
    assert_eq!(harness.store.write_count(), 0);
    assert!(harness.services.recorded_commands().is_empty());
    assert_eq!(harness.services.status_query_count(), 0);
}

#[test]
fn regression_activate_reports_replaced_config_when_restart_is_rejected() {
    let harness = harness();
    write_config(harness.hub.path(), "sentiment", "a.yaml", SENTIMENT_CONFIG);
    harness.services.script_outcome(
        ServiceCommand::Restart,
        &service("potato"),
        ServiceCommandOutcome::Rejected {
            exit_code: Some(1),
            detail: "Job for potato.service failed.".to_string(),
        },
    );

    let error = harness.controller.activate("sentiment_a").expect_err("restart");
    assert!(error.config_replaced());
    assert!(error
        .to_string()
        .contains("the active configuration was already replaced"));
    assert_eq!(
        harness.store.content().as_deref(),
        Some(SENTIMENT_CONFIG.as_bytes())
    );
    assert_eq!(
        harness.services.commands_for(&service("potato")),
        vec![ServiceCommand::Restart]
    );
}

#[test]
fn regression_activate_skips_restart_when_write_fails() {
    let harness = harness();
    write_config(harness.hub.path(), "sentiment", "a.yaml", SENTIMENT_CONFIG);
    harness.store.fail_writes("read-only file system");

    let error = harness.controller.activate("sentiment_a").expect_err("write");
    assert!(matches!(error, ControlError::ActiveConfigWrite(_)));
    assert!(!error.config_replaced());
    assert!(harness.services.recorded_commands().is_empty());
}

#[test]
fn functional_activate_replaces_previous_active_config_on_disk() {
    let hub = tempfile::tempdir().expect("hub");
    let app = tempfile::tempdir().expect("app");
    write_config(hub.path(), "sentiment", "a.yaml", SENTIMENT_CONFIG);
    write_config(hub.path(), "ner", "config.yaml", "annotation_task_name: NER\n");
    let active_path = app.path().join("config.yaml");
    std::fs::write(&active_path, "server_name: previous\nstale: true\n").expect("seed");

    let services = Arc::new(InMemoryServiceManager::new());
    let store: Arc<dyn ActiveConfigStore> = Arc::new(FsActiveConfigStore::new(&active_path));
    let registry = Arc::new(ProjectRegistry::new(
        registry_config(hub.path()),
        services.clone(),
        store.clone(),
    ));
    let controller = ActivationController::new(registry, store, services.clone());

    controller.activate("ner_config").expect("activate ner");
    assert_eq!(
        std::fs::read_to_string(&active_path).expect("read"),
        "annotation_task_name: NER\n"
    );
    controller.activate("sentiment_a").expect("activate sentiment");
    assert_eq!(
        std::fs::read_to_string(&active_path).expect("read"),
        SENTIMENT_CONFIG
    );
    assert_eq!(
        services.commands_for(&service("potato")),
        vec![ServiceCommand::Restart, ServiceCommand::Restart]
    );
}

#[test]
fn functional_concurrent_activations_leave_one_complete_config() {
    let harness = harness();
    let hub = harness.hub.path();
    write_config(hub, "sentiment", "a.yaml", SENTIMENT_CONFIG);
    write_config(hub, "ner", "config.yaml", "annotation_task_name: NER\n");
    let controller = Arc::new(harness.controller);

    let handles: Vec<_> = ["sentiment_a", "ner_config", "sentiment_a", "ner_config"]
        .into_iter()
        .map(|id| {
            let controller = controller.clone();
            std::thread::spawn(move || controller.activate(id).map(|_| ()))
        })
        .collect();
    for handle in handles {
        handle.join().expect("join").expect("activate");
    }

    let content = harness.store.content().expect("active config");
    assert!(content == SENTIMENT_CONFIG.as_bytes() || content == b"annotation_task_name: NER\n");
    assert_eq!(harness.store.write_count(), 4);
    assert_eq!(harness.services.recorded_commands().len(), 4);
}

#[test]
fn unit_set_service_state_maps_to_start_and_stop() {
    let harness = harness();
    let unit = service("potato-unlisted");

    harness
        .controller
        .set_service_state(&unit, DesiredServiceState::Running)
        .expect("start");
    assert_eq!(
        harness.services.query_status(&unit),
        ServiceActivity::Active
    );
    harness
        .controller
        .set_service_state(&unit, DesiredServiceState::Stopped)
        .expect("stop");
    assert_eq!(
        harness.services.commands_for(&unit),
        vec![ServiceCommand::Start, ServiceCommand::Stop]
    );
}

#[test]
fn regression_set_service_state_surfaces_failure() {
    let harness = harness();
    let unit = service("potato-ner");
    harness.services.script_outcome(
        ServiceCommand::Start,
        &unit,
        ServiceCommandOutcome::Failed {
            reason: "systemctl: not found".to_string(),
        },
    );

    let error = harness
        .controller
        .set_service_state(&unit, DesiredServiceState::Running)
        .expect_err("failure");
    assert!(matches!(
        error,
        ControlError::Service {
            config_replaced: false,
            ..
        }
    ));
    assert!(error.to_string().contains("systemctl: not found"));
}

#[test]
fn unit_restart_primary_is_unconditional() {
    let harness = harness();
    harness.controller.restart_primary().expect("restart");
    harness.controller.restart_primary().expect("restart again");
    assert_eq!(
        harness.services.commands_for(&service("potato")),
        vec![ServiceCommand::Restart, ServiceCommand::Restart]
    );
    assert_eq!(harness.store.write_count(), 0);
}

#[test]
fn functional_fetch_logs_returns_tail_lines() {
    let harness = harness();
    let unit = service("potato");
    harness
        .services
        .append_journal_lines(&unit, ["booting", "listening on :8000", "ready"]);

    let logs = harness.controller.fetch_logs(&unit, 2);
    assert!(logs.collected);
    assert_eq!(logs.lines, vec!["listening on :8000", "ready"]);
    assert_eq!(logs.text(), "listening on :8000\nready");
}

#[test]
fn regression_fetch_logs_failure_becomes_placeholder() {
    let harness = harness();
    let unit = service("potato-ner");
    harness.services.fail_journal_reads("journal unavailable");

    let logs = harness.controller.fetch_logs(&unit, 50);
    assert!(!logs.collected);
    assert_eq!(logs.lines.len(), 1);
    assert!(logs.lines[0].starts_with("Could not retrieve logs for potato-ner: "));
    assert!(logs.lines[0].contains("journal unavailable"));
}

#[test]
fn unit_receipt_serializes_project_id_as_key() {
    let harness = harness();
    write_config(harness.hub.path(), "sentiment", "a.yaml", SENTIMENT_CONFIG);
    let receipt = harness.controller.activate("sentiment_a").expect("activate");
    let value = serde_json::to_value(&receipt).expect("serialize");
    assert_eq!(value["project_id"], "sentiment_a");
    assert_eq!(value["restarted_service"], "potato");
}
