pub mod data;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod trigger;

pub use routes::create_router;
