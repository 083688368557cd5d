//! The live scope: capture thread plus the terminal render loop.

use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::capture::{CaptureSettings, CaptureWorker, SourceSpec};
use crate::config::{self, RenderMode, SourceKind, VectorglowConfig};
use crate::scope::{InputOutcome, PointHistory, ScopeSession, ViewState};
use crate::ui::{ErrorScreen, TerminalSurface};

/// Command-line overrides for the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ScopeOverrides {
    pub source: Option<SourceKind>,
    pub device: Option<String>,
    pub file: Option<PathBuf>,
    pub looping: Option<bool>,
    pub capacity: Option<usize>,
    pub refresh_hz: Option<u32>,
    pub mode: Option<RenderMode>,
    pub align: bool,
}

impl ScopeOverrides {
    /// Applies the overrides on top of `config`. A `--file` without `--source`
    /// selects the file source.
    pub fn apply(self, config: &mut VectorglowConfig) {
        if let Some(file) = self.file {
            config.capture.file = Some(file);
            if self.source.is_none() {
                config.capture.source = SourceKind::File;
            }
        }
        if let Some(source) = self.source {
            config.capture.source = source;
        }
        if let Some(device) = self.device {
            config.capture.device = device;
        }
        if let Some(looping) = self.looping {
            config.capture.loop_file = looping;
        }
        if let Some(capacity) = self.capacity {
            config.display.history_capacity = capacity;
        }
        if let Some(refresh_hz) = self.refresh_hz {
            config.display.refresh_hz = refresh_hz;
        }
        if let Some(mode) = self.mode {
            config.display.render_mode = mode;
        }
        if self.align {
            config.display.align_vertical = true;
        }
    }
}

/// Runs the scope until the user quits or SIGINT/SIGTERM arrives.
///
/// Capture failures do not end the session: the trace freezes and the status line
/// turns red with the fault.
///
/// # Errors
/// - If the configuration is invalid
/// - If the terminal cannot be initialized or drawn
pub async fn handle_scope(overrides: ScopeOverrides) -> anyhow::Result<()> {
    tracing::info!("=== vectorglow {} started ===", env!("CARGO_PKG_VERSION"));

    let config_data = match load_config(overrides) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err:#}");
            let path = config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the configuration file".to_string());
            let message = format!("{err:#}\n\nPlease check {path} and try again.");
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show("Configuration Error", &message)?;
            error_screen.cleanup()?;
            return Err(anyhow!("Configuration error: {err}"));
        }
    };

    let capture = &config_data.capture;
    let display = &config_data.display;
    tracing::info!(
        "Configuration loaded: source={}, device={}, capacity={}, refresh={}Hz, mode={}",
        capture.source,
        capture.device,
        config_data.display.history_capacity,
        config_data.display.refresh_hz,
        config_data.display.render_mode
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .map_err(|e| anyhow!("Failed to register signal handler: {e}"))?;
    }

    let mut surface =
        TerminalSurface::new().map_err(|e| anyhow!("Failed to initialize UI: {e}"))?;
    let (width, height) = surface.pixel_size()?;

    let history = Arc::new(PointHistory::new(display.history_capacity));
    let view = Arc::new(ViewState::new(
        width,
        height,
        display.scale_constant,
        display.brightness_exponent,
        display.align_vertical,
    ));

    let spec = SourceSpec::from_config(capture).map_err(|e| anyhow!("{e}"))?;
    let mut worker = CaptureWorker::spawn(
        move || spec.open(),
        Arc::clone(&history),
        Arc::clone(&view),
        CaptureSettings::from_config(capture),
    )?;

    let mut session = ScopeSession::new(history, view, display);
    let result = render_loop(&mut session, &mut surface, &worker, display.refresh_hz, &shutdown).await;

    worker.shutdown();
    surface
        .cleanup()
        .map_err(|e| anyhow!("Cleanup failed: {e}"))?;

    let report = worker.report();
    tracing::info!(
        "Session ended after {} frames: {} packets ({} silent), {} points",
        session.frames(),
        report.packets,
        report.silent_packets,
        report.points
    );
    if let Some(fault) = &report.fault {
        eprintln!("Capture stopped: {fault}");
    }

    result?;
    tracing::info!("=== vectorglow exited successfully ===");
    Ok(())
}

fn load_config(overrides: ScopeOverrides) -> anyhow::Result<VectorglowConfig> {
    let mut config_data = VectorglowConfig::load()?;
    overrides.apply(&mut config_data);
    config_data.validate()?;
    Ok(config_data)
}

async fn render_loop(
    session: &mut ScopeSession,
    surface: &mut TerminalSurface,
    worker: &CaptureWorker,
    refresh_hz: u32,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(refresh_hz.max(1))));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut events = Vec::new();
    let mut last_state = worker.state();

    loop {
        ticker.tick().await;

        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("Received termination signal");
            return Ok(());
        }

        events.clear();
        surface.poll_events(&mut events)?;
        for event in events.drain(..) {
            if session.handle(event) == InputOutcome::Quit {
                tracing::debug!("Quit requested");
                return Ok(());
            }
        }

        let report = worker.report();
        if report.state != last_state {
            tracing::debug!("Capture state: {} -> {}", last_state, report.state);
            last_state = report.state;
        }

        session
            .tick(surface, &report)
            .map_err(|e| anyhow!("Render failed: {e}"))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_override_selects_file_source() {
        let mut config = VectorglowConfig::default();
        ScopeOverrides {
            file: Some(PathBuf::from("demo.wav")),
            ..ScopeOverrides::default()
        }
        .apply(&mut config);
        assert_eq!(config.capture.source, SourceKind::File);
        assert_eq!(config.capture.file, Some(PathBuf::from("demo.wav")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_source_wins_over_file() {
        let mut config = VectorglowConfig::default();
        ScopeOverrides {
            source: Some(SourceKind::Loopback),
            file: Some(PathBuf::from("demo.wav")),
            ..ScopeOverrides::default()
        }
        .apply(&mut config);
        assert_eq!(config.capture.source, SourceKind::Loopback);
    }

    #[test]
    fn test_loop_override_can_disable_looping() {
        let mut config = VectorglowConfig::default();
        assert!(config.capture.loop_file);

        ScopeOverrides {
            looping: Some(false),
            ..ScopeOverrides::default()
        }
        .apply(&mut config);
        assert!(!config.capture.loop_file);

        ScopeOverrides::default().apply(&mut config);
        assert!(!config.capture.loop_file);

        ScopeOverrides {
            looping: Some(true),
            ..ScopeOverrides::default()
        }
        .apply(&mut config);
        assert!(config.capture.loop_file);
    }

    #[test]
    fn test_display_overrides() {
        let mut config = VectorglowConfig::default();
        ScopeOverrides {
            device: Some("USB Audio".to_string()),
            capacity: Some(1000),
            refresh_hz: Some(30),
            mode: Some(RenderMode::Segments),
            align: true,
            ..ScopeOverrides::default()
        }
        .apply(&mut config);
        assert_eq!(config.capture.device, "USB Audio");
        assert_eq!(config.display.history_capacity, 1000);
        assert_eq!(config.display.refresh_hz, 30);
        assert_eq!(config.display.render_mode, RenderMode::Segments);
        assert!(config.display.align_vertical);
    }

    #[test]
    fn test_out_of_range_override_fails_validation() {
        let mut config = VectorglowConfig::default();
        ScopeOverrides {
            capacity: Some(1),
            ..ScopeOverrides::default()
        }
        .apply(&mut config);
        assert!(config.validate().is_err());
    }
}
