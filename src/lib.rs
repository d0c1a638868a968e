pub mod config;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod repo;
pub mod runner;
pub mod server;
pub mod shutdown;
pub mod store;
