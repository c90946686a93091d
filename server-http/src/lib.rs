pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;
pub mod upstream;

// Re-export key types
pub use routes::build_router;
pub use service::MarketDataService;
pub use state::AppState;
