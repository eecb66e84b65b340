//! Frame driver: snapshot in, draw calls out.
//!
//! An [`Overlay`] owns the per-game [`AreaDataService`] and the per-area
//! [`Compositor`]. The service is replaced whenever the seed or difficulty
//! changes, the compositor whenever the area does.

use std::sync::Arc;

use strum::Display;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::config::attach::GEOMETRY_RETRY_FRAMES;
use crate::game::{Area, GameContext, GameSnapshot, SnapshotBuilder};
use crate::map::{AreaDataService, GeometrySource, points_of_interest};
use crate::process::ReadMemory;
use crate::render::{
    Color, Compositor, FrameInfo, MapPosition, Point, RenderBackend, Surface, draw_game_info,
    item_log_lines, ultra_wide_margin,
};

/// Why the map was not drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HideReason {
    NotForeground,
    Toggled,
    PanelOpen,
    HiddenArea,
    MapNotShown,
    NoArea,
    NoGeometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The game could not be read this frame.
    NoSnapshot,
    /// The map was skipped; game info may still have been drawn.
    Hidden(HideReason),
    Drawn,
}

pub struct Overlay {
    settings: Settings,
    source: Arc<dyn GeometrySource>,
    service: Option<AreaDataService>,
    compositor: Option<Compositor>,
    failed: Option<FailedArea>,
    show: bool,
}

/// Area whose geometry failed to load, so it is not re-requested every frame.
struct FailedArea {
    seed: u32,
    area: Area,
    frames_left: u32,
}

impl Overlay {
    pub fn new(settings: Settings, source: Arc<dyn GeometrySource>) -> Self {
        Self {
            settings,
            source,
            service: None,
            compositor: None,
            failed: None,
            show: true,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn service(&self) -> Option<&AreaDataService> {
        self.service.as_ref()
    }

    pub fn compositor(&self) -> Option<&Compositor> {
        self.compositor.as_ref()
    }

    pub fn is_shown(&self) -> bool {
        self.show
    }

    pub fn toggle(&mut self) -> bool {
        self.show = !self.show;
        self.show
    }

    pub fn zoom_in(&mut self) -> bool {
        let mut view = self.settings.rendering.view();
        let changed = view.zoom_in();
        self.settings.rendering.set_view(view);
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let mut view = self.settings.rendering.view();
        let changed = view.zoom_out();
        self.settings.rendering.set_view(view);
        changed
    }

    /// Drop all per-game state, e.g. after the process exits.
    pub fn reset(&mut self) {
        self.service = None;
        self.compositor = None;
        self.failed = None;
    }

    /// Build a snapshot and draw it.
    pub fn tick<R: ReadMemory, B: RenderBackend + ?Sized>(
        &mut self,
        builder: &mut SnapshotBuilder,
        ctx: &GameContext<R>,
        backend: &mut B,
        surface: Surface,
        foreground: bool,
    ) -> FrameOutcome {
        let Some(snapshot) = builder.build(ctx) else {
            return FrameOutcome::NoSnapshot;
        };
        let item_log = builder
            .item_state(snapshot.process_id)
            .map(|state| item_log_lines(state.log()))
            .unwrap_or_default();
        self.render(&snapshot, &item_log, backend, surface, foreground)
    }

    /// Draw one snapshot.
    pub fn render<B: RenderBackend + ?Sized>(
        &mut self,
        snapshot: &GameSnapshot,
        item_log: &[(String, Color)],
        backend: &mut B,
        surface: Surface,
        foreground: bool,
    ) -> FrameOutcome {
        if !foreground && self.settings.game.require_foreground {
            return FrameOutcome::Hidden(HideReason::NotForeground);
        }

        self.prepare(snapshot);

        let outcome = match self.hide_reason(snapshot) {
            Some(reason) => FrameOutcome::Hidden(reason),
            None => self.draw_map(backend, snapshot, surface),
        };

        let map_error = self.compositor.is_none() && snapshot.area.is_valid();
        let anchor = self.game_info_anchor(surface);
        draw_game_info(
            backend,
            anchor,
            snapshot,
            item_log,
            &self.settings.item_log,
            map_error,
        );
        outcome
    }

    /// Replace the service and compositor if the game or area changed.
    fn prepare(&mut self, snapshot: &GameSnapshot) {
        let same_game = self
            .service
            .as_ref()
            .is_some_and(|s| s.serves(snapshot.map_seed, snapshot.difficulty));
        if !same_game {
            info!(
                "New game: seed {} on {}",
                snapshot.map_seed, snapshot.difficulty
            );
            self.compositor = None;
            self.failed = None;
            self.service = Some(AreaDataService::with_prefetch(
                Arc::clone(&self.source),
                snapshot.map_seed,
                snapshot.difficulty,
                &self.settings.prefetch_areas,
            ));
        }

        if self
            .compositor
            .as_ref()
            .is_some_and(|c| c.area() == snapshot.area)
        {
            return;
        }
        self.compositor = None;
        if !snapshot.area.is_valid() {
            return;
        }
        if let Some(failed) = self
            .failed
            .as_mut()
            .filter(|f| f.seed == snapshot.map_seed && f.area == snapshot.area)
        {
            if failed.frames_left > 0 {
                failed.frames_left -= 1;
                return;
            }
        }
        let Some(service) = self.service.as_ref() else {
            return;
        };

        debug!("Area changed to {}", snapshot.area);
        match service.get_area(snapshot.area) {
            Some(geometry) => {
                let pois = points_of_interest(&geometry, |area| service.get_area(area));
                self.compositor = Some(Compositor::new(geometry, pois, &self.settings.map_colors));
                self.failed = None;
            }
            None => {
                warn!("No geometry for {}", snapshot.area);
                self.failed = Some(FailedArea {
                    seed: snapshot.map_seed,
                    area: snapshot.area,
                    frames_left: GEOMETRY_RETRY_FRAMES,
                });
            }
        }
    }

    fn hide_reason(&self, snapshot: &GameSnapshot) -> Option<HideReason> {
        let rendering = &self.settings.rendering;
        if !self.show {
            Some(HideReason::Toggled)
        } else if snapshot.menu.any_panel_open() {
            Some(HideReason::PanelOpen)
        } else if !snapshot.area.is_valid() {
            Some(HideReason::NoArea)
        } else if self.settings.is_hidden(snapshot.area) {
            Some(HideReason::HiddenArea)
        } else if rendering.toggle_via_in_game_map && !snapshot.map_shown {
            Some(HideReason::MapNotShown)
        } else if self.compositor.is_none() {
            Some(HideReason::NoGeometry)
        } else {
            None
        }
    }

    fn draw_map<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        snapshot: &GameSnapshot,
        surface: Surface,
    ) -> FrameOutcome {
        let Some(compositor) = self.compositor.as_ref() else {
            return FrameOutcome::Hidden(HideReason::NoGeometry);
        };
        let frame = FrameInfo {
            snapshot,
            settings: &self.settings,
            surface,
        };
        match compositor.draw(backend, &frame) {
            Ok(_) => FrameOutcome::Drawn,
            Err(e) => {
                warn!("Draw failed: {}", e);
                FrameOutcome::Hidden(HideReason::NoGeometry)
            }
        }
    }

    /// Top-left corner of the game info block, clear of the map.
    fn game_info_anchor(&self, surface: Surface) -> Point {
        let margin = ultra_wide_margin(surface.width as u32, surface.height as u32) as f32;
        match self.settings.rendering.position {
            MapPosition::TopLeft => Point::new(surface.width - margin - 300.0, 10.0),
            _ => Point::new(margin + 10.0, 10.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Difficulty;
    use crate::game::snapshot_tests::snapshot;
    use crate::map::{geometry_tests, service_tests::FakeSource};
    use crate::render::{DrawCommand, RecordingBackend};

    fn overlay(source: Arc<FakeSource>) -> Overlay {
        let mut settings = Settings::default();
        settings.game.require_foreground = true;
        Overlay::new(settings, source)
    }

    fn shown(seed: u32, area: u32) -> GameSnapshot {
        let mut snap = snapshot(seed, area, "me");
        snap.map_shown = true;
        snap
    }

    fn surface() -> Surface {
        Surface::new(1920.0, 1080.0)
    }

    #[test]
    fn test_draws_and_caches_compositor() {
        let source = Arc::new(FakeSource::default().with(2, geometry_tests::SAMPLE));
        let mut overlay = overlay(source.clone());
        let mut backend = RecordingBackend::new();

        let outcome = overlay.render(&shown(1234, 2), &[], &mut backend, surface(), true);
        assert_eq!(outcome, FrameOutcome::Drawn);
        assert!(matches!(backend.commands[0], DrawCommand::Bitmap { .. }));
        assert!(backend.texts().any(|t| t == "Area: Blood Moor"));

        backend.clear();
        overlay.render(&shown(1234, 2), &[], &mut backend, surface(), true);
        assert_eq!(source.count(2), 1);
        assert_eq!(overlay.compositor().map(|c| c.area()), Some(Area(2)));
    }

    #[test]
    fn test_hide_rules() {
        let source = Arc::new(FakeSource::default().with(2, geometry_tests::SAMPLE));
        let mut overlay = overlay(source);
        let mut backend = RecordingBackend::new();

        let outcome = overlay.render(&shown(1234, 2), &[], &mut backend, surface(), false);
        assert_eq!(outcome, FrameOutcome::Hidden(HideReason::NotForeground));
        assert!(backend.commands.is_empty());

        let hidden_map = snapshot(1234, 2, "me");
        let outcome = overlay.render(&hidden_map, &[], &mut backend, surface(), true);
        assert_eq!(outcome, FrameOutcome::Hidden(HideReason::MapNotShown));
        // game info is still drawn
        assert!(backend.texts().any(|t| t.starts_with("Area:")));

        let mut stash = shown(1234, 2);
        stash.menu.stash = true;
        let outcome = overlay.render(&stash, &[], &mut backend, surface(), true);
        assert_eq!(outcome, FrameOutcome::Hidden(HideReason::PanelOpen));

        overlay.settings_mut().hidden_areas.push(Area(2));
        let outcome = overlay.render(&shown(1234, 2), &[], &mut backend, surface(), true);
        assert_eq!(outcome, FrameOutcome::Hidden(HideReason::HiddenArea));
        overlay.settings_mut().hidden_areas.clear();

        assert!(!overlay.toggle());
        let outcome = overlay.render(&shown(1234, 2), &[], &mut backend, surface(), true);
        assert_eq!(outcome, FrameOutcome::Hidden(HideReason::Toggled));
    }

    #[test]
    fn test_new_game_replaces_service() {
        let source = Arc::new(FakeSource::default().with(2, geometry_tests::SAMPLE));
        let mut overlay = overlay(source.clone());
        let mut backend = RecordingBackend::new();

        overlay.render(&shown(1234, 2), &[], &mut backend, surface(), true);
        overlay.render(&shown(999, 2), &[], &mut backend, surface(), true);
        assert!(overlay.service().is_some_and(|s| s.serves(999, Difficulty::Normal)));
        assert_eq!(source.count(2), 2);
    }

    #[test]
    fn test_missing_geometry_is_retried_after_backoff() {
        let source = Arc::new(FakeSource::default());
        source.replies.lock().unwrap().insert(5, None);
        let mut overlay = overlay(source.clone());
        let mut backend = RecordingBackend::new();

        let outcome = overlay.render(&shown(1234, 5), &[], &mut backend, surface(), true);
        assert_eq!(outcome, FrameOutcome::Hidden(HideReason::NoGeometry));
        assert!(backend.texts().any(|t| t == "ERROR LOADING GAME MAP!"));

        for _ in 0..GEOMETRY_RETRY_FRAMES {
            overlay.render(&shown(1234, 5), &[], &mut backend, surface(), true);
        }
        assert_eq!(source.count(5), 1);

        // the server came back while the player stayed in the area
        source
            .replies
            .lock()
            .unwrap()
            .insert(5, Some(geometry_tests::SAMPLE.to_string()));
        overlay.render(&shown(1234, 5), &[], &mut backend, surface(), true);
        assert_eq!(source.count(5), 2);
        assert_eq!(overlay.compositor().map(|c| c.area()), Some(Area(5)));
    }

    #[test]
    fn test_zoom() {
        let mut overlay = overlay(Arc::new(FakeSource::default()));
        let size = overlay.settings().rendering.size;
        assert!(overlay.zoom_out());
        assert_eq!(overlay.settings().rendering.zoom_level, 1.25);
        assert!(overlay.settings().rendering.size < size);
    }
}
