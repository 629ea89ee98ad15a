pub mod backend;
pub mod command;
pub mod config;
pub mod controller;
pub mod frontend;
pub mod logging;
