//! Activation workflow for the Potato project manager.
//!
//! [`ActivationController`] copies a project's configuration into the single
//! active slot and restarts the primary annotation service. It also exposes
//! start/stop/restart and journal passthroughs keyed by unit name.

mod controller;
mod error;

pub use controller::{
    ActivationController, ActivationReceipt, DesiredServiceState, ServiceLogs,
    LOG_PLACEHOLDER_PREFIX,
};
pub use error::ControlError;

#[cfg(test)]
mod tests;
