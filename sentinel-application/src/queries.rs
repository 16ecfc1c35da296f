pub mod alert_queries;
pub mod checkpoint_queries;
