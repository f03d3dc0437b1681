//! Display-mode state machine.
//!
//! The presenter consumes detection batches from the worker and decides
//! which of two displays is active: the looping placeholder, or the
//! annotated frame. Reversion to the placeholder is governed by a single
//! debounce deadline, re-armed by any qualifying detection, so a target
//! briefly dropped for one cycle never causes flicker.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::category::{Category, CategoryTable};
use crate::detect::BoundingBox;
use crate::detector::DetectionEvent;
use crate::frame::Frame;

/// Poll granularity for the run loop when no deadline is pending.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Which display is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Placeholder,
    Detection,
}

/// Outbound render request for a qualifying detection. Painting, fonts and
/// window chrome are the surface's concern, not the core's.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    pub frame: Frame,
    pub bbox: BoundingBox,
    /// User-facing category text (e.g. "Recyclable waste").
    pub category_text: String,
    /// Observed acquisition rate, when FPS display is enabled.
    pub fps_text: Option<String>,
}

/// Rendering seam. `show_placeholder` resumes the looping placeholder;
/// `show_detection` pauses it and paints the annotated frame.
pub trait RenderSurface {
    fn show_placeholder(&mut self);
    fn show_detection(&mut self, request: RenderRequest);
}

/// Presenter settings.
#[derive(Clone, Copy, Debug)]
pub struct PresenterConfig {
    /// How long the annotated frame stays up after the last qualifying
    /// detection.
    pub no_detection_timeout: Duration,
    /// Whether render requests carry an FPS overlay text.
    pub show_fps: bool,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            no_detection_timeout: Duration::from_millis(2000),
            show_fps: true,
        }
    }
}

/// Rolling one-second acquisition-rate counter.
///
/// Informational only: the reported rate never affects state transitions.
#[derive(Debug)]
struct FpsCounter {
    frame_count: u32,
    window_start: Instant,
    current: f32,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self {
            frame_count: 0,
            window_start: now,
            current: 0.0,
        }
    }

    fn record(&mut self, now: Instant) {
        self.frame_count += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.current = self.frame_count as f32 * 1000.0 / elapsed.as_millis() as f32;
            self.window_start = now;
            self.frame_count = 0;
        }
    }

    fn current(&self) -> f32 {
        self.current
    }
}

/// Two-mode display controller driven by detection presence over time.
pub struct PresentationController<S: RenderSurface> {
    surface: S,
    table: CategoryTable,
    config: PresenterConfig,
    mode: DisplayMode,
    /// Single-shot reversion deadline; consumed when it fires.
    deadline: Option<Instant>,
    fps: FpsCounter,
}

impl<S: RenderSurface> PresentationController<S> {
    /// Build the controller and show the placeholder.
    pub fn new(surface: S, table: CategoryTable, config: PresenterConfig) -> Self {
        let mut controller = Self {
            surface,
            table,
            config,
            mode: DisplayMode::Placeholder,
            deadline: None,
            fps: FpsCounter::new(Instant::now()),
        };
        controller.surface.show_placeholder();
        controller
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Toggle the FPS overlay text on future render requests.
    pub fn set_show_fps(&mut self, show: bool) {
        self.config.show_fps = show;
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Handle one published detection batch.
    ///
    /// The first detection whose label maps to a non-`Continue` category is
    /// the qualifying detection. Without one, the placeholder keeps playing
    /// and (in placeholder mode) the departure timer restarts; in detection
    /// mode the deadline armed at the last qualifying render governs, so a
    /// momentary dropout does not revert the display.
    pub fn handle_event(&mut self, event: DetectionEvent, now: Instant) {
        self.fps.record(now);

        let qualifying = event.detections.iter().find_map(|det| {
            match self.table.classify(&det.label) {
                Category::Continue => None,
                category => Some((det, category)),
            }
        });

        let Some((detection, category)) = qualifying else {
            if self.mode == DisplayMode::Placeholder {
                self.deadline = Some(now + self.config.no_detection_timeout);
            }
            return;
        };

        log::debug!(
            "qualifying detection: label={} category={} conf={:.2}",
            detection.label,
            category,
            detection.confidence
        );

        let fps_text = self
            .config
            .show_fps
            .then(|| format!("Camera FPS: {:.1}", self.fps.current()));
        self.surface.show_detection(RenderRequest {
            frame: event.frame.clone(),
            bbox: detection.bbox,
            category_text: category.to_string(),
            fps_text,
        });

        if self.mode != DisplayMode::Detection {
            log::info!("showing detection: {}", category);
        }
        self.mode = DisplayMode::Detection;
        self.deadline = Some(now + self.config.no_detection_timeout);
    }

    /// Fire the reversion deadline when it has elapsed. Single-shot: once
    /// consumed, only a new event arms it again.
    pub fn tick(&mut self, now: Instant) {
        let Some(deadline) = self.deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        self.deadline = None;
        if self.mode == DisplayMode::Detection {
            log::info!("no qualifying detection within timeout, resuming placeholder");
            self.mode = DisplayMode::Placeholder;
            self.surface.show_placeholder();
        }
    }

    /// Drive the controller from the worker channel until it disconnects.
    pub fn run(&mut self, events: &Receiver<DetectionEvent>) {
        loop {
            let now = Instant::now();
            self.tick(now);

            let wait = self
                .deadline
                .map(|deadline| deadline.saturating_duration_since(now))
                .unwrap_or(IDLE_POLL)
                .min(IDLE_POLL)
                .max(Duration::from_millis(1));
            match events.recv_timeout(wait) {
                Ok(event) => self.handle_event(event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.tick(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Detection;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Shown {
        Placeholder,
        Detection(String),
    }

    #[derive(Default)]
    struct RecordingSurface {
        shown: Vec<Shown>,
        last_request: Option<RenderRequest>,
    }

    impl RenderSurface for RecordingSurface {
        fn show_placeholder(&mut self) {
            self.shown.push(Shown::Placeholder);
        }

        fn show_detection(&mut self, request: RenderRequest) {
            self.shown.push(Shown::Detection(request.category_text.clone()));
            self.last_request = Some(request);
        }
    }

    fn event(labels: &[&str]) -> DetectionEvent {
        let detections = labels
            .iter()
            .map(|label| Detection {
                bbox: BoundingBox { x: 1, y: 2, w: 3, h: 4 },
                confidence: 0.9,
                label: label.to_string(),
            })
            .collect();
        DetectionEvent {
            frame: Frame::new(vec![0u8; 12], 2, 2).unwrap(),
            detections,
        }
    }

    fn controller() -> PresentationController<RecordingSurface> {
        PresentationController::new(
            RecordingSurface::default(),
            CategoryTable::default(),
            PresenterConfig::default(),
        )
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn starts_on_placeholder() {
        let ctrl = controller();
        assert_eq!(ctrl.mode(), DisplayMode::Placeholder);
        assert_eq!(ctrl.surface().shown, vec![Shown::Placeholder]);
    }

    #[test]
    fn qualifying_event_shows_detection_and_arms_timeout() {
        let mut ctrl = controller();
        let t0 = Instant::now();

        ctrl.handle_event(event(&["person", "bottle"]), t0);

        assert_eq!(ctrl.mode(), DisplayMode::Detection);
        assert_eq!(
            ctrl.surface().shown.last(),
            Some(&Shown::Detection("Recyclable waste".to_string()))
        );

        // Deadline not yet elapsed: no reversion.
        ctrl.tick(t0 + ms(1999));
        assert_eq!(ctrl.mode(), DisplayMode::Detection);

        ctrl.tick(t0 + ms(2001));
        assert_eq!(ctrl.mode(), DisplayMode::Placeholder);
        assert_eq!(ctrl.surface().shown.last(), Some(&Shown::Placeholder));
    }

    #[test]
    fn first_qualifying_detection_wins() {
        let mut ctrl = controller();
        ctrl.handle_event(event(&["person", "banana", "laptop"]), Instant::now());

        assert_eq!(
            ctrl.surface().shown.last(),
            Some(&Shown::Detection("Food waste".to_string()))
        );
    }

    #[test]
    fn non_qualifying_events_keep_placeholder() {
        let mut ctrl = controller();
        let t0 = Instant::now();

        ctrl.handle_event(event(&["person", "dog"]), t0);
        assert_eq!(ctrl.mode(), DisplayMode::Placeholder);

        // The armed timer firing in placeholder mode is a no-op.
        ctrl.tick(t0 + ms(3000));
        assert_eq!(ctrl.mode(), DisplayMode::Placeholder);
        assert_eq!(ctrl.surface().shown, vec![Shown::Placeholder]);
    }

    #[test]
    fn dropout_within_window_does_not_revert() {
        let mut ctrl = controller();
        let t0 = Instant::now();

        ctrl.handle_event(event(&["bottle"]), t0);
        // Detection drops out for a cycle; the armed deadline governs.
        ctrl.handle_event(event(&["person"]), t0 + ms(500));
        ctrl.tick(t0 + ms(1900));
        assert_eq!(ctrl.mode(), DisplayMode::Detection);

        // A new qualifying event renews the window.
        ctrl.handle_event(event(&["bottle"]), t0 + ms(1950));
        ctrl.tick(t0 + ms(2100));
        assert_eq!(ctrl.mode(), DisplayMode::Detection);

        // Unrenewed deadline finally reverts.
        ctrl.tick(t0 + ms(3951));
        assert_eq!(ctrl.mode(), DisplayMode::Placeholder);
    }

    #[test]
    fn non_qualifying_event_does_not_extend_detection_window() {
        let mut ctrl = controller();
        let t0 = Instant::now();

        ctrl.handle_event(event(&["bottle"]), t0);
        ctrl.handle_event(event(&["person"]), t0 + ms(1500));

        // Deadline stayed at t0 + 2000 despite the later event.
        ctrl.tick(t0 + ms(2001));
        assert_eq!(ctrl.mode(), DisplayMode::Placeholder);
    }

    #[test]
    fn rendered_box_and_fps_text_come_through() {
        let mut ctrl = PresentationController::new(
            RecordingSurface::default(),
            CategoryTable::default(),
            PresenterConfig {
                show_fps: false,
                ..PresenterConfig::default()
            },
        );
        ctrl.handle_event(event(&["laptop"]), Instant::now());

        let request = ctrl.surface().last_request.as_ref().expect("render request");
        assert_eq!(request.bbox, BoundingBox { x: 1, y: 2, w: 3, h: 4 });
        assert_eq!(request.category_text, "Hazardous waste");
        assert!(request.fps_text.is_none(), "fps text disabled by config");
    }
}
