//! Service-manager integration for the Potato project manager.
//!
//! Wraps `systemctl`/`journalctl` behind the narrow [`ServiceManager`] trait
//! with typed command outcomes, and ships an in-memory implementation used by
//! tests and local dry runs.

mod in_memory;
mod service_manager;
mod service_name;
mod systemctl;

pub use in_memory::{InMemoryServiceManager, RecordedServiceCommand};
pub use service_manager::{
    ServiceActivity, ServiceCommand, ServiceCommandOutcome, ServiceError, ServiceManager,
};
pub use service_name::{ServiceName, ServiceNameError};
pub use systemctl::{SystemctlServiceManager, SystemctlServiceManagerConfig};
