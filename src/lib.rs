pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod keys;
pub mod mapping;
pub mod note;
pub mod pitch;
pub mod tone;

pub use controller::PlaybackController;
pub use error::{KeyError, KeyResult};
pub use events::{EventSender, KeyboardEvent};
pub use keys::KeyStore;
pub use mapping::{KeyColor, Letter};
pub use note::{Note, PitchSample};
pub use pitch::{PitchDetector, PitchEvents, PitchForwarder};
pub use tone::ToneGenerator;

/// Describes state of a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub(crate) color: KeyColor,
    pub(crate) keynumber: u8,
    pub(crate) pressed: bool,
}

impl Key {
    pub fn color(&self) -> KeyColor {
        self.color
    }

    pub fn keynumber(&self) -> u8 {
        self.keynumber
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}
