pub mod bundle;
pub mod loader;
