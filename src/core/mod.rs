//! Core types: the log record, its severity and the control envelope
//!
//! Everything here is pure data with no I/O.

pub mod level_filter;
pub mod message;

pub use level_filter::LevelFilter;
pub use message::{Envelope, Level, LogRecord, ParseError, CLEAR_ON_FINISH, CLEAR_ON_START};
