//! Display recent log entries from the application.

use anyhow::anyhow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{self, LOG_FILE_PREFIX};

const DEFAULT_LINES: usize = 50;

/// Shows the last lines of the most recent log file.
///
/// # Errors
/// - If the log directory cannot be determined
/// - If log files cannot be read
pub fn handle_logs() -> Result<(), anyhow::Error> {
    let log_dir = logging::log_dir()?;

    if !log_dir.exists() {
        println!("Log directory does not exist yet: {}", log_dir.display());
        println!("Logs will be created when the application runs.");
        return Ok(());
    }

    let Some(log_file) = find_latest_log(&log_dir)? else {
        println!("No log files found in: {}", log_dir.display());
        println!("Run 'vectorglow' to generate logs.");
        return Ok(());
    };

    let content =
        fs::read_to_string(&log_file).map_err(|e| anyhow!("Failed to read log file: {e}"))?;

    if content.is_empty() {
        println!("Log file is empty: {}", log_file.display());
        return Ok(());
    }

    let (tail, total) = last_lines(&content, DEFAULT_LINES);

    println!();
    if tail.len() < total {
        println!("Showing last {} of {} lines:", tail.len(), total);
    } else {
        println!("Showing all {total} lines:");
    }
    println!("Full log file at: {}", log_file.display());
    println!();

    for line in tail {
        println!("{line}");
    }

    Ok(())
}

/// The last `count` lines of `content` and the total line count.
fn last_lines(content: &str, count: usize) -> (Vec<&str>, usize) {
    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();
    let start = total.saturating_sub(count);
    (lines[start..].to_vec(), total)
}

/// Finds the most recently modified log file in the directory.
fn find_latest_log(log_dir: &Path) -> Result<Option<PathBuf>, anyhow::Error> {
    let entries =
        fs::read_dir(log_dir).map_err(|e| anyhow!("Failed to read log directory: {e}"))?;

    let mut latest: Option<(PathBuf, std::time::SystemTime)> = None;

    for entry in entries {
        let entry = entry.map_err(|e| anyhow!("Failed to read directory entry: {e}"))?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        {
            continue;
        }

        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        if latest.as_ref().is_none_or(|(_, newest)| modified > *newest) {
            latest = Some((path, modified));
        }
    }

    Ok(latest.map(|(path, _)| path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_lines() {
        let content = (1..=60).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let (tail, total) = last_lines(&content, 50);
        assert_eq!(total, 60);
        assert_eq!(tail.len(), 50);
        assert_eq!(tail[0], "line 11");
        assert_eq!(tail[49], "line 60");

        let (tail, total) = last_lines("a\nb", 50);
        assert_eq!((tail, total), (vec!["a", "b"], 2));
    }

    #[test]
    fn test_find_latest_ignores_other_files() {
        let dir = std::env::temp_dir().join(format!("vectorglow_logcmd_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        assert_eq!(find_latest_log(&dir).unwrap(), None);

        fs::write(dir.join("unrelated.txt"), "x").unwrap();
        fs::write(dir.join("vectorglow.log.2026-10-19"), "x").unwrap();
        let found = find_latest_log(&dir).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(
            found.and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string())),
            Some("vectorglow.log.2026-10-19".to_string())
        );
    }
}
