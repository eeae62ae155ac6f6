//! HTTP server assembly - router construction, shared state, middleware.

mod app;
mod middleware;
mod state;

pub use app::create_app;
pub use state::AppState;
