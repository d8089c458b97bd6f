//! Integration points with the hosting application.
//!
//! Events flow out through a [`HostChannel`]; the host calls back in
//! through a [`ProviderHandle`], which holds the session weakly so calls
//! arriving after the session is gone are silently dropped.
//!
//! Events are queued while the session is being mutated and delivered once
//! it is released: through [`dispatch`] for a [`SharedSession`], or
//! [`RecolorSession::flush_events`] for one owned directly. A listener may
//! therefore call straight back into the session through its provider.

use crate::session::RecolorSession;
use crate::types::{PaintColor, SharedImage};
use image::RgbaImage;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Events reported to the host as they happen
#[derive(Clone, Debug)]
pub enum HostEvent {
    FillTapped,
    EraserTapped,
    UndoTapped,
    ShareTapped(SharedImage),
    ColorPaletteTapped,
    ImageRequested,
    NewImageRequested,
    ColorPicked { code: String, image: SharedImage },
    SaveColorClicked { code: String },
}

/// Receiver of [`HostEvent`]s
pub trait HostListener: Send + Sync {
    fn on_event(&self, event: HostEvent);
}

impl<F> HostListener for F
where
    F: Fn(HostEvent) + Send + Sync,
{
    fn on_event(&self, event: HostEvent) {
        self(event)
    }
}

/// Events waiting for delivery, with the listener they go to
pub struct PendingEvents {
    listener: Arc<dyn HostListener>,
    events: Vec<HostEvent>,
}

impl PendingEvents {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hand every event to the listener, in emission order
    pub fn deliver(self) {
        debug!(count = self.events.len(), "Delivering host events");
        for event in self.events {
            self.listener.on_event(event);
        }
    }
}

/// Optional listener plus the queue of events not yet delivered; emitting
/// without a listener is a no-op.
#[derive(Default)]
pub struct HostChannel {
    listener: Option<Arc<dyn HostListener>>,
    queue: Mutex<Vec<HostEvent>>,
}

impl HostChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replacing the listener drops events queued for the old one
    pub fn set_listener(&mut self, listener: Option<Arc<dyn HostListener>>) {
        self.listener = listener;
        self.queue.get_mut().clear();
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub fn emit(&self, event: HostEvent) {
        if self.listener.is_some() {
            self.queue.lock().push(event);
        } else {
            debug!(?event, "No host listener, dropping event");
        }
    }

    /// Drain the queue; `None` when there is nothing to deliver
    pub fn take_pending(&self) -> Option<PendingEvents> {
        let listener = Arc::clone(self.listener.as_ref()?);
        let events = std::mem::take(&mut *self.queue.lock());
        (!events.is_empty()).then_some(PendingEvents { listener, events })
    }
}

/// Toolbar actions the host UI forwards to the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolbarAction {
    Fill,
    Eraser,
    Brush,
    Polygon,
    Undo,
    Share,
    ColorPalette,
    PickImage,
    NewImage,
    SaveColor(String),
}

/// Color access the host may use
pub trait ColorProvider {
    fn current_color(&self) -> Option<PaintColor>;
    fn set_color(&self, color: PaintColor);
}

/// Image loading the host may trigger
pub trait ImageProvider {
    fn load_image(&self, image: RgbaImage);
    fn load_image_path(&self, path: PathBuf);
}

/// Session shared between the interaction context and host callbacks
pub type SharedSession = Arc<Mutex<RecolorSession>>;

/// Run `f` on the locked session, then deliver the events it emitted after
/// the lock is released.
pub fn dispatch<T>(session: &SharedSession, f: impl FnOnce(&mut RecolorSession) -> T) -> T {
    let (result, pending) = {
        let mut guard = session.lock();
        let result = f(&mut guard);
        (result, guard.take_host_events())
    };
    if let Some(pending) = pending {
        pending.deliver();
    }
    result
}

/// Provider handed to the host for one session.
#[derive(Clone)]
pub struct ProviderHandle {
    session: Weak<Mutex<RecolorSession>>,
}

impl ProviderHandle {
    pub fn new(session: &SharedSession) -> Self {
        Self {
            session: Arc::downgrade(session),
        }
    }

    /// Whether the session is still alive
    pub fn is_attached(&self) -> bool {
        self.session.strong_count() > 0
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut RecolorSession) -> T) -> Option<T> {
        let Some(session) = self.session.upgrade() else {
            debug!("Provider called after session was dropped");
            return None;
        };
        Some(dispatch(&session, f))
    }
}

impl ColorProvider for ProviderHandle {
    fn current_color(&self) -> Option<PaintColor> {
        self.with_session(|s| s.active_color().cloned()).flatten()
    }

    fn set_color(&self, color: PaintColor) {
        self.with_session(|s| s.set_color(color));
    }
}

impl ImageProvider for ProviderHandle {
    fn load_image(&self, image: RgbaImage) {
        if let Some(Err(e)) = self.with_session(|s| s.load_image(image)) {
            warn!("Host image rejected: {e}");
        }
    }

    fn load_image_path(&self, path: PathBuf) {
        self.with_session(|s| s.load_image_path(path));
    }
}
