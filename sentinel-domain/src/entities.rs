// Domain entities
pub mod alert;
pub mod checkpoint;
pub mod config;
pub mod pass;
pub mod transaction;

pub use alert::*;
pub use checkpoint::*;
pub use config::*;
pub use pass::*;
pub use transaction::*;
