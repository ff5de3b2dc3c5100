pub mod app;
pub mod cli;
pub mod config;
pub mod input;
pub mod render;
pub mod usage;
pub mod util;
