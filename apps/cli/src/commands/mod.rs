//! 命令定义和实现

pub mod config;
pub mod ears;
pub mod play;
pub mod record;
pub mod selftest;

pub use config::ConfigCommand;
pub use ears::{GotoCommand, MoveCommand, ResetCommand};
pub use play::PlayCommand;
pub use record::RecordCommand;
