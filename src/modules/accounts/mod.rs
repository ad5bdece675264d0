pub mod handlers;
pub mod provisioning;
pub mod routes;

pub use routes::accounts_routes;
