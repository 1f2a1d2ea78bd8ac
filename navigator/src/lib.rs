pub mod console_map;
pub mod repl;
pub mod shell;
