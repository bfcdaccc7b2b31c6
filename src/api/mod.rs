//! API routes module.

pub mod activity;
pub mod extract;
pub mod feedback;
pub mod handlers;
pub mod keys;
pub mod middleware;
pub mod routes;
pub mod shaping;


pub use routes::create_router;
