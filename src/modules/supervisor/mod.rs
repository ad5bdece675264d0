pub mod handlers;
pub mod routes;

pub use routes::supervisor_routes;
