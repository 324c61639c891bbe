pub mod collector;
pub mod configuration;
pub mod credentials;
pub mod errors;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod providers;
pub mod publisher;
pub mod scheduler;
