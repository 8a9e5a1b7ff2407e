pub mod app;
pub mod models;
pub mod services;
pub mod utils;
