//! Configuration management for vectorglow.
//!
//! This module handles loading and validating application configuration from a TOML
//! file in the user's config directory.

pub mod file;

pub use file::{
    config_path, CaptureConfig, DisplayConfig, RenderMode, SourceKind, VectorglowConfig,
};
