pub mod api;
pub mod cache;
pub mod config;
pub mod console;
pub mod describe;
pub mod github;
pub mod metrics;
pub mod tree;
