pub mod store;
pub mod patch;
