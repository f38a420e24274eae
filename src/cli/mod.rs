pub mod charts;
pub mod commands;
pub mod console;
pub mod display;
pub mod links;

pub use commands::{CliArgs, Commands, GlobalArgs};
