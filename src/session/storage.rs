//! Loading images and projects, and everything that exports the result.

use super::colors::visible_colors;
use super::{RecolorSession, SessionMessage, to_task};
use crate::background::{Completion, TaskResult};
use crate::compositing::{alloc_rgba, source_over, try_clone};
use crate::constants::{DEFAULT_THUMBNAIL_SIZE, PLACEHOLDER_GRAY};
use crate::error::{RecolorError, RecolorResult};
use crate::host::HostEvent;
use crate::persistence::{LoadedProject, ProjectSnapshot, ProjectStore};
use crate::types::{Point, Rect, SharedImage, Tool, to_hex};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shrink `image` to fit a `view` of (width, height); never enlarges
pub fn fit_to_view(image: RgbaImage, view: (f32, f32)) -> RgbaImage {
    let (vw, vh) = view;
    let (w, h) = image.dimensions();
    if vw <= 0.0 || vh <= 0.0 || w == 0 || h == 0 {
        return image;
    }
    let scale = (vw / w as f32).min(vh / h as f32).min(1.0);
    if scale >= 1.0 {
        return image;
    }
    let nw = ((w as f32 * scale).round() as u32).max(1);
    let nh = ((h as f32 * scale).round() as u32).max(1);
    debug!(from = ?(w, h), to = ?(nw, nh), "Fitting image to view");
    imageops::resize(&image, nw, nh, FilterType::Triangle)
}

/// Center-cropped `width` x `height` preview of `base` with `overlay` on top
pub fn render_thumbnail(
    base: &RgbaImage,
    overlay: Option<&RgbaImage>,
    width: u32,
    height: u32,
) -> RecolorResult<RgbaImage> {
    crate::profile_scope!("render_thumbnail");
    let mut flat = try_clone(base)?;
    if let Some(overlay) = overlay.filter(|o| o.dimensions() == base.dimensions()) {
        source_over(&mut flat, overlay);
    }
    let (iw, ih) = flat.dimensions();
    if iw == 0 || ih == 0 {
        return alloc_rgba(width, height);
    }
    let scale = (width as f32 / iw as f32).max(height as f32 / ih as f32);
    let sw = ((iw as f32 * scale).round() as u32).max(width);
    let sh = ((ih as f32 * scale).round() as u32).max(height);
    let scaled = imageops::resize(&flat, sw, sh, FilterType::Triangle);
    Ok(imageops::crop_imm(&scaled, (sw - width) / 2, (sh - height) / 2, width, height).to_image())
}

impl RecolorSession {
    // ==================== Image Loading ====================

    /// Start a new session on `image`, dropping all edits
    pub fn load_image(&mut self, image: RgbaImage) -> RecolorResult<()> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RecolorError::Decode("image has no pixels".into()));
        }
        self.load_request += 1;
        let image = if self.settings.fit_loaded_images {
            fit_to_view(image, self.transform.view_size())
        } else {
            image
        };
        self.install_image(image);
        Ok(())
    }

    /// Decode `path` on a worker, then load it. A newer load wins.
    pub fn load_image_path(&mut self, path: PathBuf) -> Completion<()> {
        self.load_request += 1;
        let request = self.load_request;
        let view = self
            .settings
            .fit_loaded_images
            .then(|| self.transform.view_size());
        let completion = Completion::new();
        let done = completion.clone();
        self.executor.spawn(
            "decode_image",
            move || {
                let image = image::open(&path)
                    .map_err(|e| format!("{}: {e}", path.display()))?
                    .to_rgba8();
                Ok(match view {
                    Some(view) => fit_to_view(image, view),
                    None => image,
                })
            },
            move |result| SessionMessage::ImageDecoded {
                request,
                completion: done,
                result,
            },
        );
        completion
    }

    pub(crate) fn apply_image_decoded(
        &mut self,
        request: u64,
        completion: Completion<()>,
        result: TaskResult<RgbaImage>,
    ) {
        if request != self.load_request {
            debug!(request, "Dropping superseded image load");
            completion.resolve(Err("superseded by a newer load".into()));
            return;
        }
        match result {
            Ok(image) if image.width() > 0 && image.height() > 0 => {
                self.install_image(image);
                completion.resolve(Ok(()));
            }
            Ok(_) => completion.resolve(Err("image has no pixels".into())),
            Err(e) => {
                warn!("Image decode failed: {e}");
                completion.resolve(Err(e));
            }
        }
    }

    fn install_image(&mut self, image: RgbaImage) {
        if let Some(completion) = self.flight.abandon() {
            completion.resolve(Ok(()));
        }
        self.current_job = 0;
        self.undo_all();
        self.generation += 1;

        let (width, height) = image.dimensions();
        self.image = Some(Arc::new(image));
        self.id = Uuid::new_v4().to_string();
        self.saved = false;
        self.polygon.clear();
        self.polygon_enabled = false;
        self.polygon.set_visible(self.tool == Tool::Polygon);
        self.transform.bind_image(width, height);
        self.sync_view();
        info!(width, height, generation = self.generation, "Image loaded");
    }

    // ==================== Export ====================

    /// Base image with every edit drawn over it
    fn flattened_image(&self) -> RecolorResult<RgbaImage> {
        crate::profile_scope!("flatten");
        let image = self.image.as_ref().ok_or(RecolorError::NoImage)?;
        let mut flat = try_clone(image)?;
        if let Some(overlay) = self.composite_image()? {
            source_over(&mut flat, &overlay);
        }
        Ok(flat)
    }

    /// Preview for listings. Non-positive sizes give a 1x1 transparent image.
    pub fn thumbnail(&self, width: i32, height: i32) -> RecolorResult<RgbaImage> {
        if width <= 0 || height <= 0 {
            return Ok(RgbaImage::new(1, 1));
        }
        let (width, height) = (width as u32, height as u32);
        let Some(image) = &self.image else {
            let mut placeholder = alloc_rgba(width, height)?;
            placeholder.pixels_mut().for_each(|p| *p = Rgba(PLACEHOLDER_GRAY));
            return Ok(placeholder);
        };
        let overlay = self.composite_image()?;
        render_thumbnail(image, overlay.as_ref(), width, height)
    }

    /// Commit everything and return the flattened result
    pub fn sharing_image(&mut self) -> RecolorResult<SharedImage> {
        self.maybe_commit_history(true)?;
        Ok(Arc::new(self.flattened_image()?))
    }

    pub fn share(&mut self) -> RecolorResult<()> {
        let image = self.sharing_image()?;
        self.host().emit(HostEvent::ShareTapped(image));
        Ok(())
    }

    /// Hex code of the flattened pixel at an image-space point
    pub fn pick_color_at(&self, point: Point) -> RecolorResult<Option<String>> {
        let Some(image) = &self.image else {
            return Ok(None);
        };
        let (width, height) = image.dimensions();
        if !Rect::from_size(width as f32, height as f32).contains(point) {
            return Ok(None);
        }
        let flat = self.flattened_image()?;
        let [r, g, b, _] = flat.get_pixel(point.x as u32, point.y as u32).0;
        let code = to_hex(u32::from_be_bytes([0xFF, r, g, b]));
        self.host().emit(HostEvent::ColorPicked {
            code: code.clone(),
            image: Arc::new(flat),
        });
        Ok(Some(code))
    }

    // ==================== Projects ====================

    /// Commit everything and write the project on a worker.
    ///
    /// The handle resolves with the project id once the result is applied.
    pub fn save_project(&mut self, store: &ProjectStore, label: &str) -> RecolorResult<Completion<String>> {
        let image = self.image.clone().ok_or(RecolorError::NoImage)?;
        self.maybe_commit_history(true)?;

        let recolored = self.history.top().map(|l| Arc::clone(&l.image));
        let candidates = self.history.last_colors();
        let oracle = Arc::clone(&self.oracle);
        let store = store.clone();
        let id = self.id.clone();
        let label = label.to_string();
        let (generation, epoch) = (self.generation, self.layer_epoch);
        let completion = Completion::new();
        let done = completion.clone();

        self.executor.spawn(
            "save_project",
            move || {
                let colors = match &recolored {
                    Some(layer) => to_task(visible_colors(oracle.as_ref(), layer, &candidates))?
                        .into_iter()
                        .collect(),
                    None => Vec::new(),
                };
                let thumbnail = to_task(render_thumbnail(
                    &image,
                    recolored.as_deref(),
                    DEFAULT_THUMBNAIL_SIZE,
                    DEFAULT_THUMBNAIL_SIZE,
                ))?;
                let snapshot = ProjectSnapshot {
                    image,
                    recolored,
                    colors,
                    thumbnail,
                    label,
                };
                let (record, meta) = to_task(snapshot.encode())?;
                to_task(store.save(&id, &record, &meta))?;
                Ok(id)
            },
            move |result| SessionMessage::ProjectSaved {
                generation,
                epoch,
                completion: done,
                result,
            },
        );
        Ok(completion)
    }

    pub(crate) fn apply_project_saved(
        &mut self,
        generation: u64,
        epoch: u64,
        completion: Completion<String>,
        result: TaskResult<String>,
    ) {
        match &result {
            Ok(id) if generation == self.generation && epoch == self.layer_epoch => {
                self.saved = true;
                info!(id, "Project saved");
            }
            Ok(id) => debug!(id, "Project saved, but the session changed since"),
            Err(e) => warn!("Saving project failed: {e}"),
        }
        completion.resolve(result);
    }

    /// Read and decode a project on a worker, then restore it
    pub fn load_project(&mut self, store: &ProjectStore, id: &str) -> Completion<()> {
        self.load_request += 1;
        let request = self.load_request;
        let store = store.clone();
        let id = id.to_string();
        let project_id = id.clone();
        let completion = Completion::new();
        let done = completion.clone();
        self.executor.spawn(
            "load_project",
            move || {
                let record = to_task(store.load_record(&id))?;
                to_task(LoadedProject::from_record(&record))
            },
            move |result| SessionMessage::ProjectLoaded {
                request,
                id: project_id,
                completion: done,
                result,
            },
        );
        completion
    }

    pub(crate) fn apply_project_loaded(
        &mut self,
        request: u64,
        id: String,
        completion: Completion<()>,
        result: TaskResult<LoadedProject>,
    ) {
        if request != self.load_request {
            debug!(request, "Dropping superseded project load");
            completion.resolve(Err("superseded by a newer load".into()));
            return;
        }
        match result.and_then(|project| to_task(self.restore(project))) {
            Ok(()) => {
                self.id = id;
                completion.resolve(Ok(()));
            }
            Err(e) => {
                warn!(id, "Loading project failed: {e}");
                completion.resolve(Err(e));
            }
        }
    }

    /// Install a decoded project: the base image, plus the recolored layer
    /// as the only history entry
    pub fn restore(&mut self, project: LoadedProject) -> RecolorResult<()> {
        let (width, height) = project.image.dimensions();
        if width == 0 || height == 0 {
            return Err(RecolorError::Decode("project image has no pixels".into()));
        }
        self.load_request += 1;
        self.install_image(project.image);
        if let Some(layer) = project.recolored {
            self.push_history(Arc::new(layer), project.colors.into_iter().collect());
        }
        self.saved = true;
        Ok(())
    }
}
