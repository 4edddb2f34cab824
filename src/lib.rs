pub mod cas;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod errorlog;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod store;
