//! Keeps ALSA's stderr chatter out of the terminal while devices are probed.

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Runs `f` with stderr temporarily redirected to /dev/null.
///
/// ALSA prints "Unknown PCM" style warnings while cpal enumerates devices. They would
/// corrupt the TUI and do not indicate real errors. If the redirect cannot be set up,
/// `f` runs with stderr untouched.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<F, T, E>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let dev_null = match OpenOptions::new().write(true).open("/dev/null") {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("Failed to open /dev/null: {}", e);
            return f();
        }
    };

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        tracing::debug!("Failed to duplicate stderr");
        return f();
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        tracing::debug!("Failed to redirect stderr");
        return f();
    }

    let result = f();

    // Restore stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// ALSA only exists on Linux; elsewhere this just runs `f`.
#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<F, T, E>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    f()
}
