//! HBNB command interpreter.
//!
//! Accepts both `<operation> <Kind> <args>` and `<Kind>.<operation>(<args>)`
//! lines and runs them against whichever storage engine was configured.

#![warn(missing_docs)]

pub mod command;
mod help;
mod interpreter;

pub use command::{parse_line, Command, Line, Operation};
pub use interpreter::{Console, ConsoleError, Flow};
