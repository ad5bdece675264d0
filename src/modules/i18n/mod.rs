pub mod handlers;
pub mod routes;

pub use routes::create_i18n_routes;
