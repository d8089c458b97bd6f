//! The recolor session: one photo, its edit history and the active tool.
//!
//! ## Threading
//!
//! All state lives on the thread that owns the [`RecolorSession`]. Oracle
//! calls, codec work and other pixel-heavy jobs run on the background
//! executor and come back as [`SessionMessage`]s, which the owner applies
//! by calling [`RecolorSession::process_results`] (or blocks on with
//! [`RecolorSession::wait_idle`]). Results that no longer match the session
//! are dropped: every job carries the image `generation` and the layer
//! `epoch` it was started against.
//!
//! ## Modules
//!
//! - `history` - Layer history, commit and undo
//! - `mask_update` - Single-flight mask recomputation
//! - `tools` - Tool switching, taps, touches and gestures
//! - `colors` - Color, threshold and coverage controls
//! - `storage` - Image loading, thumbnails, sharing and projects

mod colors;
mod history;
mod mask_update;
mod storage;
mod tools;

pub use colors::hue_matches;
pub use history::{CompositedLayer, LayerHistory};
pub use storage::{fit_to_view, render_thumbnail};

use crate::background::{BackgroundExecutor, Completion, TaskResult};
use crate::compositing::{composite_over, try_clone};
use crate::error::RecolorResult;
use crate::freehand::FreehandTracker;
use crate::host::{HostChannel, HostListener, PendingEvents};
use crate::input::{
    Clock, InteractionState, SystemClock, TransformEngine, Transformable,
};
use crate::oracle::MaskOracle;
use crate::perf::WorkTimings;
use crate::persistence::LoadedProject;
use crate::polygon::PolygonSelector;
use crate::settings::Settings;
use crate::single_flight::SingleFlight;
use crate::types::{PaintColor, Point, Rect, SeedPoint, SharedImage, SharedMask, Tool};
use history::{DetachedEdit, TopLayer};
use image::RgbaImage;
use mask_update::{MaskJob, MaskJobOutput};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Where the next mask update gets its exclusion mask from.
///
/// Anything but `Empty`/`Ready` is resolved on the worker by the oracle. The
/// resolved mask is cached next to the state until the state is replaced.
#[derive(Clone, Debug, Default)]
pub enum ExclusionState {
    #[default]
    Empty,
    Ready(SharedMask),
    /// Everything already painted in this composite is protected
    FromComposite(SharedImage),
    /// Everything outside this polygon is protected
    FromPolygon(Vec<Point>),
}

impl ExclusionState {
    pub fn is_empty(&self) -> bool {
        matches!(self, ExclusionState::Empty)
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, ExclusionState::FromPolygon(_))
    }
}

/// Results of background jobs, applied on the owning thread
pub(crate) enum SessionMessage {
    MaskComputed {
        job: MaskJob,
        result: TaskResult<MaskJobOutput>,
    },
    ContourFound {
        generation: u64,
        result: TaskResult<Rect>,
    },
    ImageDecoded {
        request: u64,
        completion: Completion<()>,
        result: TaskResult<RgbaImage>,
    },
    ProjectLoaded {
        request: u64,
        id: String,
        completion: Completion<()>,
        result: TaskResult<LoadedProject>,
    },
    ProjectSaved {
        generation: u64,
        epoch: u64,
        completion: Completion<String>,
        result: TaskResult<String>,
    },
    /// The job resolved its own handle; nothing to apply
    Resolved,
}

pub(crate) fn to_task<T>(result: RecolorResult<T>) -> TaskResult<T> {
    result.map_err(|e| e.to_string())
}

pub struct RecolorSession {
    settings: Settings,
    oracle: Arc<dyn MaskOracle>,
    executor: BackgroundExecutor<SessionMessage>,
    timings: WorkTimings,
    host: HostChannel,

    /// Project id the session saves under
    id: String,
    image: Option<SharedImage>,
    /// Bumped whenever the image is replaced
    generation: u64,
    /// Latest image/project load; older loads are dropped
    load_request: u64,

    tool: Tool,
    /// Color picked by the user
    active_color: Option<PaintColor>,
    /// Color the pending edit is painted with
    current_color: Option<PaintColor>,
    coverage: f32,
    seeds: Vec<SeedPoint>,
    /// Rasterized brush stroke for the pending edit
    freehand_hint: Option<SharedMask>,
    has_repaint: bool,
    top_layer: Option<TopLayer>,
    history: LayerHistory,
    /// Bumped whenever the top layer or history changes shape
    layer_epoch: u64,
    saved: bool,
    /// Edits closed by a tool switch before their layer arrived, oldest first
    pending_commits: VecDeque<DetachedEdit>,

    exclusion: ExclusionState,
    exclusion_revision: u64,
    /// Mask the oracle resolved for `exclusion`, tagged with its revision
    exclusion_cache: Option<(u64, SharedMask)>,
    polygon_enabled: bool,

    flight: SingleFlight<()>,
    current_job: u64,
    next_job_id: u64,

    transform: TransformEngine,
    freehand: FreehandTracker,
    polygon: PolygonSelector,
    interaction: InteractionState,
}

impl RecolorSession {
    pub fn new(settings: Settings, oracle: Arc<dyn MaskOracle>) -> Self {
        Self::with_clock(settings, oracle, Box::new(SystemClock::default()))
    }

    /// Session whose animations read time from `clock`
    pub fn with_clock(settings: Settings, oracle: Arc<dyn MaskOracle>, clock: Box<dyn Clock>) -> Self {
        let settings = settings.sanitized();
        let mut freehand = FreehandTracker::new(&settings);
        freehand.set_visible(Tool::default().uses_freehand());

        Self {
            executor: BackgroundExecutor::new(settings.worker_threads),
            timings: WorkTimings::new(),
            host: HostChannel::new(),
            id: Uuid::new_v4().to_string(),
            image: None,
            generation: 0,
            load_request: 0,
            tool: Tool::default(),
            active_color: None,
            current_color: None,
            coverage: 0.0,
            seeds: Vec::new(),
            freehand_hint: None,
            has_repaint: false,
            top_layer: None,
            history: LayerHistory::default(),
            layer_epoch: 0,
            saved: false,
            pending_commits: VecDeque::new(),
            exclusion: ExclusionState::Empty,
            exclusion_revision: 0,
            exclusion_cache: None,
            polygon_enabled: false,
            flight: SingleFlight::new(),
            current_job: 0,
            next_job_id: 1,
            transform: TransformEngine::with_clock(&settings, clock),
            freehand,
            polygon: PolygonSelector::new(&settings),
            interaction: InteractionState::Idle,
            oracle,
            settings,
        }
    }

    // ==================== Accessors ====================

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image(&self) -> Option<&SharedImage> {
        self.image.as_ref()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn active_color(&self) -> Option<&PaintColor> {
        self.active_color.as_ref()
    }

    /// Color of the edit in progress
    pub fn current_color(&self) -> Option<&PaintColor> {
        self.current_color.as_ref()
    }

    pub fn seeds(&self) -> &[SeedPoint] {
        &self.seeds
    }

    pub fn history(&self) -> &LayerHistory {
        &self.history
    }

    pub fn has_top_layer(&self) -> bool {
        self.top_layer.is_some()
    }

    /// Uncommitted overlay of the latest mask update
    pub fn top_layer_image(&self) -> Option<&SharedImage> {
        self.top_layer.as_ref().map(|t| &t.image)
    }

    pub fn exclusion(&self) -> &ExclusionState {
        &self.exclusion
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Whether anything was committed since the image was loaded
    pub fn is_image_changed(&self) -> bool {
        !self.history.is_empty()
    }

    /// Whether a mask update is running
    pub fn is_updating(&self) -> bool {
        self.flight.is_in_flight()
    }

    /// Edits that will commit once their layer is computed
    pub fn pending_commit_count(&self) -> usize {
        self.pending_commits.len()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn transform(&self) -> &TransformEngine {
        &self.transform
    }

    pub fn freehand(&self) -> &FreehandTracker {
        &self.freehand
    }

    pub fn polygon(&self) -> &PolygonSelector {
        &self.polygon
    }

    pub fn polygon_mut(&mut self) -> &mut PolygonSelector {
        &mut self.polygon
    }

    pub fn timings(&self) -> &WorkTimings {
        &self.timings
    }

    pub fn set_listener(&mut self, listener: Option<Arc<dyn HostListener>>) {
        self.host.set_listener(listener);
    }

    pub(crate) fn host(&self) -> &HostChannel {
        &self.host
    }

    /// Events emitted since the last delivery, for the caller to hand to
    /// the listener once it no longer holds the session
    pub fn take_host_events(&self) -> Option<PendingEvents> {
        self.host.take_pending()
    }

    /// Deliver queued host events now; returns how many were delivered.
    ///
    /// For a session behind a [`SharedSession`](crate::host::SharedSession)
    /// use [`dispatch`](crate::host::dispatch) instead, which delivers after
    /// unlocking.
    pub fn flush_events(&self) -> usize {
        match self.take_host_events() {
            Some(pending) => {
                let count = pending.len();
                pending.deliver();
                count
            }
            None => 0,
        }
    }

    // ==================== Layout & Frames ====================

    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.transform.set_view_size(width, height);
        self.sync_view();
    }

    /// Advance transform animations; returns whether another frame is needed
    pub fn step(&mut self) -> bool {
        let more = self.transform.step();
        self.sync_view();
        more
    }

    pub(crate) fn sync_view(&mut self) {
        let matrix = *self.transform.matrix();
        self.freehand.set_view_matrix(&matrix);
        self.polygon.set_view_matrix(&matrix);
    }

    // ==================== Composite ====================

    /// Committed history with the pending layer drawn over it
    pub fn composite_image(&self) -> RecolorResult<Option<RgbaImage>> {
        let base = self.history.top().map(|l| l.image.as_ref());
        let top = self.top_layer.as_ref().map(|t| t.image.as_ref());
        match (base, top) {
            (None, None) => Ok(None),
            (Some(base), None) => Ok(Some(try_clone(base)?)),
            (base, Some(top)) => {
                let (width, height) = top.dimensions();
                Ok(Some(composite_over(base, Some(top), width, height)?))
            }
        }
    }

    pub(crate) fn set_exclusion(&mut self, state: ExclusionState) {
        self.exclusion = state;
        self.exclusion_revision += 1;
        self.exclusion_cache = None;
    }

    // ==================== Result Pump ====================

    /// Apply every finished background result; returns how many were applied
    pub fn process_results(&mut self) -> usize {
        let messages = self.executor.drain();
        let count = messages.len();
        for message in messages {
            self.apply(message);
        }
        count
    }

    /// Apply results until no background work is left or `timeout` passes.
    /// Returns whether the session went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.executor.has_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(pending = self.executor.pending_count(), "wait_idle timed out");
                return false;
            }
            match self.executor.wait_next(remaining) {
                Some(message) => self.apply(message),
                None => return false,
            }
        }
        true
    }

    fn apply(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::MaskComputed { job, result } => self.apply_mask_result(job, result),
            SessionMessage::ContourFound { generation, result } => {
                self.apply_contour(generation, result)
            }
            SessionMessage::ImageDecoded {
                request,
                completion,
                result,
            } => self.apply_image_decoded(request, completion, result),
            SessionMessage::ProjectLoaded {
                request,
                id,
                completion,
                result,
            } => self.apply_project_loaded(request, id, completion, result),
            SessionMessage::ProjectSaved {
                generation,
                epoch,
                completion,
                result,
            } => self.apply_project_saved(generation, epoch, completion, result),
            SessionMessage::Resolved => {}
        }
    }
}

impl Drop for RecolorSession {
    fn drop(&mut self) {
        if let Some(completion) = self.flight.abandon() {
            completion.resolve(Err("session dropped".into()));
        }
        info!(id = %self.id, "Session closed");
        self.timings.log_summary();
    }
}
