pub mod alert_ids;
pub mod velocity_detector;

pub use alert_ids::*;
pub use velocity_detector::*;
