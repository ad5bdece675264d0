pub mod certificates;
pub mod evaluations;
pub mod handlers;
pub mod reports;
pub mod routes;

pub use routes::admin_routes;
