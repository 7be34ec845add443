//! Server-rendered control panel for the Potato project manager.
//!
//! Maps HTTP routes onto registry and activation operations, runs the
//! blocking work on the tokio blocking pool and renders a single HTML page
//! with one-shot flash messages.

mod page;
mod server;

pub use page::{FlashLevel, FlashMessage};
pub use server::{build_dashboard_router, run_dashboard_server, DashboardServerConfig, DashboardState};
