//! Application command handlers for vectorglow.
//!
//! # Commands
//! - `scope`: the live X-Y trace (default)
//! - `list_devices`: list input and output devices usable as capture sources
//! - `config`: open the configuration file in the user's preferred editor
//! - `logs`: display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod scope;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use scope::{handle_scope, ScopeOverrides};
