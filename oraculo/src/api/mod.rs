pub mod dto;
mod extractors;
mod handlers;
mod middleware;
mod openapi;
mod routes;
mod state;

pub use extractors::AuthenticatedUser;
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
