pub mod handlers;
pub mod routes;

pub use routes::job_routes;
