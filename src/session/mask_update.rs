//! Mask recomputation.
//!
//! Requests collapse through a [`SingleFlight`](crate::single_flight::SingleFlight):
//! one job runs at a time, and everything asked for meanwhile is served by
//! exactly one trailing job built from the state at that moment.
//!
//! Edits detached by a tool switch are painted before the live edit, in the
//! order they were detached, and go straight into history.

use super::history::{DetachedEdit, TopLayer};
use super::{ExclusionState, RecolorSession, SessionMessage, to_task};
use crate::background::{Completion, TaskResult};
use crate::compositing::composite_over;
use crate::constants::{COMPOSITE_WARN_MS, ORACLE_WARN_MS};
use crate::error::RecolorResult;
use crate::geometry::rasterize_polygon;
use crate::oracle::{MaskOracle, MaskOutcome, MaskRequest, mask_to_image};
use crate::single_flight::{FlightEnd, FlightStart};
use crate::types::{PaintColor, SharedMask, Tool};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity of one oracle run, checked when its result comes back
#[derive(Clone, Debug)]
pub(crate) struct MaskJob {
    pub id: u64,
    pub generation: u64,
    pub epoch: u64,
    pub exclusion_revision: u64,
    pub color: PaintColor,
    pub with_polygon: bool,
}

pub(crate) struct MaskJobOutput {
    pub outcome: MaskOutcome,
    /// Exclusion mask the oracle resolved for this run
    pub exclusion: Option<SharedMask>,
}

/// Turn a pending exclusion into a mask
pub(crate) fn resolve_exclusion(
    oracle: &dyn MaskOracle,
    state: &ExclusionState,
    width: u32,
    height: u32,
) -> RecolorResult<Option<SharedMask>> {
    match state {
        ExclusionState::Empty => Ok(None),
        ExclusionState::Ready(mask) => Ok(Some(Arc::clone(mask))),
        ExclusionState::FromComposite(image) => {
            Ok(Some(Arc::new(oracle.exclusion_mask_from_image(image)?)))
        }
        ExclusionState::FromPolygon(points) => {
            let inside = mask_to_image(&rasterize_polygon(points, width, height)?)?;
            let outside = oracle.invert_alpha(&inside)?;
            Ok(Some(Arc::new(oracle.exclusion_mask_from_image(&outside)?)))
        }
    }
}

impl RecolorSession {
    /// Whether the live edit has anything for the oracle to paint
    pub(crate) fn can_compute(&self) -> bool {
        self.image.is_some()
            && self.current_color.is_some()
            && (!self.seeds.is_empty() || self.freehand_hint.is_some())
    }

    /// Whether a run should start: a detached edit still needs one, or the
    /// live edit can be painted
    fn has_mask_work(&self) -> bool {
        self.image.is_some()
            && (self.pending_commits.iter().any(|e| e.job.is_none()) || self.can_compute())
    }

    /// Exclusion to hand the worker, reusing the resolved mask when current
    fn exclusion_for_job(&self) -> ExclusionState {
        match &self.exclusion_cache {
            Some((revision, mask)) if *revision == self.exclusion_revision => {
                ExclusionState::Ready(Arc::clone(mask))
            }
            _ => self.exclusion.clone(),
        }
    }

    /// Set the live edit aside so the next tool starts clean.
    ///
    /// If the running job was started from exactly this edit it keeps
    /// painting it; otherwise the edit waits for a run of its own.
    pub(crate) fn detach_pending_edit(&mut self) {
        let Some(color) = self.current_color.clone() else {
            return;
        };
        let running_is_exact = !self.flight.is_dirty()
            && self.current_job != 0
            && !self.pending_commits.iter().any(|e| e.job == Some(self.current_job));
        if !running_is_exact {
            self.commit_repaint();
        }

        let edit = DetachedEdit {
            seeds: std::mem::take(&mut self.seeds),
            freehand: self.freehand_hint.take(),
            color,
            coverage: self.coverage,
            with_polygon: self.polygon_enabled,
            disable_exclusion: self.tool == Tool::Brush && !self.polygon_enabled,
            exclusion: self.exclusion_for_job(),
            exclusion_revision: self.exclusion_revision,
            job: running_is_exact.then_some(self.current_job),
        };
        if edit.job.is_none() {
            // The running job is stale for this edit: drop its layer and
            // queue a run for the detached copy
            self.layer_epoch += 1;
            self.flight.mark_dirty();
        }
        debug!(
            job = ?edit.job,
            seeds = edit.seeds.len(),
            freehand = edit.freehand.is_some(),
            queued = self.pending_commits.len() + 1,
            "Detached pending edit"
        );
        self.pending_commits.push_back(edit);
        self.current_color = None;
        self.top_layer = None;
        self.has_repaint = false;
    }

    /// Recompute the pending layer from the current seeds and stroke.
    ///
    /// Never blocks. While a run is in flight this only marks it dirty and
    /// returns the in-flight handle.
    pub fn update_mask(&mut self) -> Completion<()> {
        if !self.flight.is_in_flight() && !self.can_compute() {
            return Completion::resolved(Ok(()));
        }
        match self.flight.begin() {
            FlightStart::Attached(completion) => {
                debug!("Mask update attached to running job");
                completion
            }
            FlightStart::Started(completion) => {
                self.start_mask_job();
                completion
            }
        }
    }

    /// A repainting fill with several seeds restarts from its newest seed
    fn commit_repaint(&mut self) {
        if self.seeds.len() <= 1 || !self.has_repaint {
            return;
        }
        let Some(last) = self.seeds.last().copied() else {
            return;
        };
        match self.maybe_commit_history(true) {
            Ok(true) => {
                self.seeds.push(last);
                debug!("Committed repainted layer before next update");
            }
            Ok(false) => {}
            Err(e) => warn!("Could not commit repainted layer: {e}"),
        }
    }

    fn start_mask_job(&mut self) {
        if let Some(index) = self.pending_commits.iter().position(|e| e.job.is_none()) {
            self.start_detached_job(index);
            return;
        }
        self.commit_repaint();

        let (Some(image), Some(color)) = (self.image.clone(), self.current_color.clone()) else {
            self.finish_flight(Ok(()));
            return;
        };
        if !self.can_compute() {
            self.finish_flight(Ok(()));
            return;
        }

        let job = self.next_job(color.clone(), self.exclusion_revision, self.polygon_enabled);
        let request = MaskRequest {
            image,
            color,
            seeds: self.seeds.clone(),
            coverage: self.coverage,
            exclusion: None,
            freehand: self.freehand_hint.clone(),
            disable_exclusion: self.tool == Tool::Brush && !self.polygon_enabled,
        };
        let exclusion = self.exclusion_for_job();
        self.spawn_mask_job(job, request, exclusion);
    }

    /// Paint a detached edit from its own snapshot
    fn start_detached_job(&mut self, index: usize) {
        let Some(image) = self.image.clone() else {
            self.finish_flight(Ok(()));
            return;
        };
        let Some(edit) = self.pending_commits.get(index) else {
            self.finish_flight(Ok(()));
            return;
        };
        let request = MaskRequest {
            image,
            color: edit.color.clone(),
            seeds: edit.seeds.clone(),
            coverage: edit.coverage,
            exclusion: None,
            freehand: edit.freehand.clone(),
            disable_exclusion: edit.disable_exclusion,
        };
        let exclusion = edit.exclusion.clone();
        let (color, revision, with_polygon) =
            (edit.color.clone(), edit.exclusion_revision, edit.with_polygon);
        let job = self.next_job(color, revision, with_polygon);
        if let Some(edit) = self.pending_commits.get_mut(index) {
            edit.job = Some(job.id);
        }
        self.spawn_mask_job(job, request, exclusion);
    }

    fn next_job(&mut self, color: PaintColor, exclusion_revision: u64, with_polygon: bool) -> MaskJob {
        let job = MaskJob {
            id: self.next_job_id,
            generation: self.generation,
            epoch: self.layer_epoch,
            exclusion_revision,
            color,
            with_polygon,
        };
        self.next_job_id += 1;
        self.current_job = job.id;
        job
    }

    fn spawn_mask_job(&mut self, job: MaskJob, mut request: MaskRequest, exclusion: ExclusionState) {
        let oracle = Arc::clone(&self.oracle);
        let timings = self.timings.clone();
        debug!(
            job = job.id,
            seeds = request.seeds.len(),
            freehand = request.freehand.is_some(),
            "Starting mask job"
        );

        self.executor.spawn(
            "compute_mask",
            move || {
                let (width, height) = request.dimensions();
                request.exclusion =
                    to_task(resolve_exclusion(oracle.as_ref(), &exclusion, width, height))?;
                let outcome = timings.time("compute_mask", ORACLE_WARN_MS, || {
                    oracle.compute_mask(&request)
                });
                Ok(MaskJobOutput {
                    outcome: to_task(outcome)?,
                    exclusion: request.exclusion,
                })
            },
            move |result| SessionMessage::MaskComputed { job, result },
        );
    }

    pub(crate) fn apply_mask_result(&mut self, job: MaskJob, result: TaskResult<MaskJobOutput>) {
        if job.id != self.current_job {
            debug!(job = job.id, "Dropping result of superseded mask job");
            return;
        }

        let detached = self
            .pending_commits
            .front()
            .is_some_and(|e| e.job == Some(job.id));

        let outcome = match result {
            Ok(output) => {
                if job.exclusion_revision == self.exclusion_revision
                    && let Some(mask) = output.exclusion
                {
                    self.exclusion_cache = Some((job.exclusion_revision, mask));
                }
                if detached {
                    self.commit_detached(&job, output.outcome).map_err(|e| {
                        warn!(job = job.id, "Commit of detached edit failed: {e}");
                        e.to_string()
                    })
                } else {
                    self.publish(&job, output.outcome);
                    Ok(())
                }
            }
            Err(e) => {
                warn!(job = job.id, "Mask computation failed, keeping last layer: {e}");
                Err(e)
            }
        };

        if detached {
            self.pending_commits.pop_front();
            if self.has_mask_work() {
                // Whatever was requested meanwhile still needs a run
                self.flight.mark_dirty();
            }
        }
        self.finish_flight(outcome);
    }

    /// Flatten a detached edit's layer straight into history
    fn commit_detached(&mut self, job: &MaskJob, outcome: MaskOutcome) -> RecolorResult<()> {
        if job.generation != self.generation {
            debug!(job = job.id, "Dropping detached edit for a replaced image");
            return Ok(());
        }
        let (width, height) = outcome.image.dimensions();
        if self.image.as_ref().map(|i| i.dimensions()) != Some((width, height)) {
            warn!(job = job.id, "Oracle returned a layer of the wrong size");
            return Ok(());
        }

        let base = self.history.top().map(|l| l.image.as_ref());
        let flattened = self
            .timings
            .time("commit_composite", COMPOSITE_WARN_MS, || {
                composite_over(base, Some(&outcome.image), width, height)
            })?;
        let mut used_colors = self.history.last_colors();
        used_colors.insert(job.color.clone());

        // A polygon set up for the live edit outlives this commit
        let polygon = self.exclusion.is_polygon().then(|| self.exclusion.clone());
        self.push_history(Arc::new(flattened), used_colors);
        if let Some(state) = polygon {
            self.set_exclusion(state);
        }
        info!(
            job = job.id,
            depth = self.history.len(),
            "Committed edit finished after a tool switch"
        );
        Ok(())
    }

    fn publish(&mut self, job: &MaskJob, outcome: MaskOutcome) {
        if job.generation != self.generation || job.epoch != self.layer_epoch {
            debug!(job = job.id, "Dropping stale mask result");
            return;
        }
        let expected = self.image.as_ref().map(|i| i.dimensions());
        if expected != Some(outcome.image.dimensions()) {
            warn!(
                job = job.id,
                got = ?outcome.image.dimensions(),
                ?expected,
                "Oracle returned a layer of the wrong size"
            );
            return;
        }
        self.has_repaint = outcome.repainted;
        self.top_layer = Some(TopLayer {
            image: Arc::new(outcome.image),
            color: Some(job.color.clone()),
            with_polygon: job.with_polygon,
        });
    }

    /// Close the current run, starting the trailing run if one was requested
    fn finish_flight(&mut self, outcome: TaskResult<()>) {
        loop {
            match self.flight.finish() {
                FlightEnd::Rerun(_) if self.has_mask_work() => {
                    self.start_mask_job();
                    return;
                }
                // Nothing left to paint: the next finish resolves the handle
                FlightEnd::Rerun(_) => continue,
                FlightEnd::Done(completion) => {
                    self.current_job = 0;
                    completion.resolve(outcome);
                    return;
                }
                FlightEnd::Idle => return,
            }
        }
    }
}
