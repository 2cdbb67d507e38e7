/// Application configuration from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Reference and demo data seeding
pub mod seed;
