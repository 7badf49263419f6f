//! Audio capture: source abstraction, cpal backend, and utterance endpointing.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod endpoint;
pub mod recorder;

pub use endpoint::{Clock, Endpointer, EndpointerConfig, SystemClock};
pub use recorder::{AudioSource, MockAudioSource};
