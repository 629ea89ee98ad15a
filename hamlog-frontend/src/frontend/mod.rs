pub mod console;

pub use console::{run, ConsoleView};
