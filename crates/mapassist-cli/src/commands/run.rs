//! Main overlay mode command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use mapassist_core::config::attach::{MAX_EMPTY_FRAMES, PROCESS_POLL_INTERVAL};
use mapassist_core::{
    FrameOutcome, GameContext, GeometryClient, MemoryReader, Overlay, ProcessHandle,
    RecordingBackend, Settings, ShutdownSignal, SnapshotBuilder, Surface,
};
use tracing::{debug, error, info};

use crate::cli_utils::{attach, load_settings, resolve_offsets, snapshot_builder};

/// Run the attach loop until Ctrl+C.
pub fn run(config: &Path, pid: Option<u32>, width: u32, height: u32) -> Result<()> {
    let settings = load_settings(config)?;
    let shutdown = setup_shutdown_handler()?;

    let client = Arc::new(GeometryClient::start(
        settings.collaborator.server_config(),
        Arc::clone(&shutdown),
    )?);
    info!("Geometry server started");

    let surface = Surface::new(width as f32, height as f32);
    let mut overlay = Overlay::new(settings.clone(), client.clone());
    let mut builder = snapshot_builder(&settings);

    info!("Waiting for {}...", settings.game.process_name);
    while !shutdown.is_shutdown() {
        match attach(pid, &settings) {
            Ok((process, reader)) => {
                info!("Attached to {} (PID: {})", settings.game.process_name, process.pid);
                match resolve_offsets(&reader, &process, &settings.game) {
                    Ok(offsets) => {
                        let ctx = GameContext::new(reader, offsets, process.pid);
                        let session = Session {
                            ctx: &ctx,
                            process: &process,
                            settings: &settings,
                            surface,
                            shutdown: &shutdown,
                        };
                        session.run(&mut overlay, &mut builder);
                    }
                    Err(e) => error!("Failed to resolve offsets: {}", e),
                }
                overlay.reset();
                builder.forget_process(process.pid);
                info!("Detached, waiting for {}...", settings.game.process_name);
            }
            Err(e) => debug!("Process not found: {}", e),
        }

        if shutdown.wait(PROCESS_POLL_INTERVAL) {
            break;
        }
    }

    client.close();
    info!("Shutdown complete.");
    Ok(())
}

fn setup_shutdown_handler() -> Result<Arc<ShutdownSignal>> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Shutting down...");
        shutdown_ctrlc.trigger();
    })?;
    Ok(shutdown)
}

/// One attached process.
struct Session<'a> {
    ctx: &'a GameContext<MemoryReader>,
    process: &'a ProcessHandle,
    settings: &'a Settings,
    surface: Surface,
    shutdown: &'a ShutdownSignal,
}

impl Session<'_> {
    /// Frame loop. Returns when the process exits or shutdown is requested.
    fn run(&self, overlay: &mut Overlay, builder: &mut SnapshotBuilder) {
        let mut backend = RecordingBackend::new();
        let mut empty_frames = 0u32;
        let mut last_outcome = None;

        loop {
            if !self.process.is_alive() {
                info!("Game process exited");
                return;
            }

            backend.clear();
            let foreground = self.process.is_foreground();
            let outcome = overlay.tick(builder, self.ctx, &mut backend, self.surface, foreground);
            if outcome == FrameOutcome::NoSnapshot {
                empty_frames += 1;
                if empty_frames == MAX_EMPTY_FRAMES {
                    debug!("No game data for {} frames", MAX_EMPTY_FRAMES);
                    empty_frames = 0;
                }
            } else {
                empty_frames = 0;
            }

            if last_outcome != Some(outcome) {
                debug!("Frame: {:?}, {} draw calls", outcome, backend.commands.len());
                last_outcome = Some(outcome);
            }

            if self.shutdown.wait(self.settings.game.frame_interval()) {
                return;
            }
        }
    }
}
