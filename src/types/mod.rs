//! Public types for quizfetch

mod event;
mod options;
mod state;

pub use event::{HostEvent, HostEvents};
pub use options::{BindingConfig, DEFAULT_TIMEOUT, DEFAULT_TTL, LoadOptions};
pub use state::{BindingState, Phase};
