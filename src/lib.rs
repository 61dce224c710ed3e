// Library exports for warnview
// This allows the test suite to import modules

pub mod config;
pub mod editor;
pub mod error;
pub mod filter;
pub mod render;
pub mod warning;
pub mod watch;
pub mod workspace;

pub use error::{Result, WarnError};
