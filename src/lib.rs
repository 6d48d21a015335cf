pub mod channels;
pub mod config;
pub mod error;
pub mod hls;
pub mod metrics;
pub mod route;
pub mod server;
pub mod upstream;
