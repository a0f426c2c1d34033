pub mod filter;
pub mod engine;
