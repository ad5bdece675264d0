pub mod handlers;
pub mod routes;

pub use routes::kaprodi_routes;
