pub mod handlers;
pub mod reports;
pub mod routes;

pub use routes::student_routes;
