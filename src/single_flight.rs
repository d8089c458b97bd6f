//! Start-or-attach coalescing for mask recomputation.
//!
//! At most one run is in flight. Requests arriving meanwhile only mark the
//! slot dirty and share the in-flight handle; when the run finishes, a dirty
//! slot gets exactly one trailing run, after which the shared handle resolves.

use crate::background::Completion;

/// What the caller should do after [`SingleFlight::begin`]
#[derive(Debug)]
pub enum FlightStart<T> {
    /// Nothing was running: start work now
    Started(Completion<T>),
    /// A run is already in flight; its handle now also covers this request
    Attached(Completion<T>),
}

impl<T> FlightStart<T> {
    pub fn completion(&self) -> &Completion<T> {
        match self {
            FlightStart::Started(c) | FlightStart::Attached(c) => c,
        }
    }

    pub fn into_completion(self) -> Completion<T> {
        match self {
            FlightStart::Started(c) | FlightStart::Attached(c) => c,
        }
    }
}

/// What the caller should do after [`SingleFlight::finish`]
#[derive(Debug)]
pub enum FlightEnd<T> {
    /// Requests arrived while running: run once more, slot stays occupied
    Rerun(Completion<T>),
    /// Slot is free again; resolve this handle
    Done(Completion<T>),
    /// `finish` without a run in flight
    Idle,
}

#[derive(Debug)]
pub struct SingleFlight<T> {
    in_flight: Option<Completion<T>>,
    dirty: bool,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            in_flight: None,
            dirty: false,
        }
    }
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> FlightStart<T> {
        match &self.in_flight {
            Some(handle) => {
                self.dirty = true;
                FlightStart::Attached(handle.clone())
            }
            None => {
                let handle = Completion::new();
                self.in_flight = Some(handle.clone());
                FlightStart::Started(handle)
            }
        }
    }

    pub fn finish(&mut self) -> FlightEnd<T> {
        match self.in_flight.take() {
            None => FlightEnd::Idle,
            Some(handle) if self.dirty => {
                self.dirty = false;
                self.in_flight = Some(handle.clone());
                FlightEnd::Rerun(handle)
            }
            Some(handle) => FlightEnd::Done(handle),
        }
    }

    /// Ask a running slot for one more run. No-op when idle.
    pub fn mark_dirty(&mut self) {
        if self.in_flight.is_some() {
            self.dirty = true;
        }
    }

    /// Drop the slot without a trailing run, e.g. when the image is replaced
    pub fn abandon(&mut self) -> Option<Completion<T>> {
        self.dirty = false;
        self.in_flight.take()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
