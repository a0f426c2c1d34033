pub mod snapshot_index;
pub mod membership;
pub mod email_set;
