pub mod filter;
pub mod generation;
pub mod models;
pub mod repositories;
pub mod services;
pub mod settings;
pub mod utils;
