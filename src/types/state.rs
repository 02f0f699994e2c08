//! Observable binding state

use crate::FetchError;

/// Lifecycle phase of a binding, derived from its [`BindingState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing loaded yet and no load running.
    Idle,
    Loading,
    /// Data present, last load succeeded.
    Ready,
    /// Last load failed. Data from an earlier success may still be present.
    Errored,
}

/// What a binding currently exposes to its consumer.
#[derive(Debug, Clone)]
pub struct BindingState<V> {
    pub data: Option<V>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

impl<V> Default for BindingState<V> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<V> BindingState<V> {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Errored
        } else if self.data.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    pub(crate) fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn settle(&mut self, result: crate::Result<V>) {
        self.loading = false;
        match result {
            Ok(value) => {
                self.data = Some(value);
                self.error = None;
            }
            // Keep whatever data the last success produced
            Err(e) => self.error = Some(e),
        }
    }
}
