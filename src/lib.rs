pub mod cli;
pub mod config;
pub mod error;
pub mod transport;
pub mod uploader;
