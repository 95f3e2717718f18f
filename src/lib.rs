pub mod app;
pub mod authorization;
pub mod backend;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod devices;
pub mod global;
pub mod session;
