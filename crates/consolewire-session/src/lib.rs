//! Scripted request/reply sessions against line-oriented consoles.
//!
//! This is the "just works" layer. Connect to a console, send commands one
//! at a time, and get back each reply together with any JSON it embeds.
//! [`StubConsole`] plays the console side for tests and local smoke runs.

pub mod config;
pub mod connector;
pub mod console;
pub mod error;
pub mod script;
pub mod session;

pub use config::{SessionConfig, SHUTDOWN_COMMAND};
pub use connector::{connect, ConsoleSession};
pub use console::{serve_connection, ConsoleSummary, StubConsole};
pub use error::{Result, SessionError};
pub use script::{Script, TEN_KEY_OBJECT};
pub use session::{Exchange, Session};
