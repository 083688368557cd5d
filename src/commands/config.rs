//! Configuration file editor command.
//!
//! Opens the vectorglow configuration file in the user's preferred editor and checks
//! it afterwards.

use std::process::Command;

use crate::config::{self, file::write_default, VectorglowConfig};

/// Opens the configuration file in the user's preferred editor.
///
/// Writes the default template first if the file does not exist. After the editor
/// exits the file is validated so mistakes show up immediately rather than on the
/// next run.
///
/// # Errors
/// - If no editor can be found or executed
/// - If the edited file fails to parse or validate
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = config::config_path()?;
    if !config_path.exists() {
        write_default(&config_path)?;
    }

    tracing::info!("Opening config file: {}", config_path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    VectorglowConfig::load_from(&config_path)?;
    tracing::info!("Config file edited successfully");
    println!("Configuration OK: {}", config_path.display());
    Ok(())
}

/// Finds the best available editor: $VISUAL, $EDITOR, then nano and vi.
fn find_editor() -> anyhow::Result<String> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(editor) = std::env::var(var) {
            if !editor.is_empty() {
                return Ok(editor);
            }
        }
    }

    for editor in ["nano", "vi"] {
        if is_editor_available(editor) {
            return Ok(editor.to_string());
        }
    }

    Err(anyhow::anyhow!(
        "No editor found. Please set the $EDITOR environment variable."
    ))
}

/// Checks if an editor is available in the system PATH.
fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
