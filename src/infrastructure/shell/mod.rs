//! Process execution for the external generator

pub mod command_executor;

pub use command_executor::*;
