pub mod params;
pub mod payload;
pub mod handlers;
pub mod router;
