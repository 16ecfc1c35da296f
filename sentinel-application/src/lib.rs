// Sentinel Application Layer

pub mod commands;
pub mod dtos;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod orchestrator;
pub mod queries;
pub mod state;

pub use error::AppError;
pub use metrics::Metrics;
pub use monitor::ChangeMonitor;
pub use orchestrator::PassOrchestrator;
pub use state::AppState;
