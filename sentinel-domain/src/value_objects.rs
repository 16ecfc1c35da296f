// Domain value objects
pub mod checkpoint_status;
pub mod pass_reason;
pub mod priority;
pub mod replace_policy;

pub use checkpoint_status::*;
pub use pass_reason::*;
pub use priority::*;
pub use replace_policy::*;
