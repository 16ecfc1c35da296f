pub mod context;
pub mod lifecycle;
pub mod logging;

pub use lifecycle::{print_status, run_once, run_standalone};
