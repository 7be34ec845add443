//! Project discovery for the Potato project manager.
//!
//! Scans a project hub of `{project}/configs/*.yaml` documents into
//! [`ProjectDescriptor`]s, summarizes the active configuration, and defines
//! the [`ActiveConfigStore`] seam through which the single active
//! configuration is read and replaced.

mod config_document;
mod config_store;
mod descriptor;
mod project_id;
mod registry;

pub use config_document::{parse_project_config, ConfigDocumentError, ProjectConfigFields};
pub use config_store::{
    ActiveConfigStore, ConfigStoreError, FsActiveConfigStore, InMemoryActiveConfigStore,
};
pub use descriptor::{
    display_name_for_project_dir, host_without_port, ActiveProjectSummary, ProjectDescriptor,
    NO_ACTIVE_CONFIGURATION, NO_ACTIVE_PROJECT, NO_DESCRIPTION, UNKNOWN_ANNOTATION_TYPE,
    UNKNOWN_SERVER_NAME,
};
pub use project_id::{ProjectId, ProjectIdError};
pub use registry::{
    ProjectRegistry, ProjectRegistryConfig, ProjectScanReport, ScanIssue, ScanIssueKind,
    CONFIGS_DIR_NAME, DEFAULT_SERVICE_PREFIX,
};
