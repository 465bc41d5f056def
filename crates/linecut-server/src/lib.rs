pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod registry;
pub mod scheduler;
pub mod services;
pub mod state;
