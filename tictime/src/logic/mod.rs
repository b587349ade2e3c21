pub mod client;
pub mod config;
pub mod serve;
pub mod types;
