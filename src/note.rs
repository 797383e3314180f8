//! Note resolution.
//!
//! Two octave conventions meet here and are kept apart on purpose:
//!
//! * detector samples use scientific octaves, so middle C arrives as
//!   octave 4 and resolves through [`resolve`] to key 60 with octave 5
//!   (`octave + 1`);
//! * static key labels use [`number_from_absolute`], where the octave is
//!   simply `key / 12` with no offset.

use std::fmt;

use crate::error::{KeyError, KeyResult};
use crate::mapping::{self, Letter, OCTAVE_LEN};

/// One reading pushed by a pitch detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchSample {
    /// Octave as reported by the detector (scientific numbering).
    pub octave: i32,
    pub letter: Letter,
    /// Detected frequency in Hz, informational only.
    pub frequency: f32,
}

impl PitchSample {
    pub fn new(octave: i32, letter: Letter) -> Self {
        Self {
            octave,
            letter,
            frequency: 0.0,
        }
    }

    /// Nearest equal-tempered note to `hz`, with A4 = 440 Hz.
    ///
    /// Returns `None` for frequencies that are not positive and finite, or
    /// that fall outside the 128-key range.
    pub fn from_frequency(hz: f32) -> Option<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return None;
        }
        let number = (69.0 + 12.0 * (hz / 440.0).log2()).round();
        if !(0.0..=127.0).contains(&number) {
            return None;
        }
        let mut sample = Self::from_key_number(number as u8).ok()?;
        sample.frequency = hz;
        Some(sample)
    }

    /// The sample that [`resolve`]s back to key `n`.
    pub fn from_key_number(n: u8) -> KeyResult<Self> {
        let n = mapping::check_index(n)?;
        Ok(Self {
            octave: i32::from(n / OCTAVE_LEN) - 1,
            letter: Letter::from_semitone(n),
            frequency: wmidi::Note::try_from(n)
                .map(|note| note.to_freq_f32())
                .unwrap_or_default(),
        })
    }
}

/// A displayable note tied to a key number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub octave: i32,
    pub letter: Letter,
    pub key_number: u8,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.octave)
    }
}

/// Resolves a detector sample to its key.
///
/// Detector convention: `key = (octave + 1) * 12 + semitone` and the note's
/// octave is `octave + 1`. Labels calibrated against the detector depend on
/// this offset.
pub fn resolve(sample: &PitchSample) -> KeyResult<Note> {
    let octave = sample.octave.saturating_add(1);
    let key = octave
        .saturating_mul(i32::from(OCTAVE_LEN))
        .saturating_add(i32::from(sample.letter.semitone()));
    let key_number = u8::try_from(key)
        .map_err(|_| KeyError::KeyOutOfRange(key))
        .and_then(mapping::check_index)?;
    Ok(Note {
        octave,
        letter: sample.letter,
        key_number,
    })
}

/// Note for a key number under the static-label convention: octave is
/// `n / 12`, no offset. Only for labels, never for detector samples.
pub fn number_from_absolute(n: u8) -> KeyResult<Note> {
    Ok(Note {
        octave: i32::from(mapping::octave_of(n)?),
        letter: mapping::letter_of(n)?,
        key_number: n,
    })
}

/// Static label of a key, e.g. `C5/60`. Falls back to the bare number for
/// indices past the keyboard.
pub fn key_label(n: u8) -> String {
    match number_from_absolute(n) {
        Ok(note) => format!("{}/{}", note, n),
        Err(_) => n.to_string(),
    }
}
