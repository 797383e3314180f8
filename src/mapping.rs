//! Key index mapping.
//!
//! Every conversion between an absolute key number (0..=127, MIDI numbering)
//! and its octave, letter, colour and layout slot lives here. The note
//! resolver reuses [`letter_of`] and [`Letter::semitone`] so that what is
//! shown and what is played never disagree.

use std::fmt;
use std::str::FromStr;

use crate::error::{KeyError, KeyResult};

/// Number of keys on the keyboard.
pub const KEY_COUNT: usize = 128;

/// Semitones per octave.
pub const OCTAVE_LEN: u8 = 12;

/// Chromatic offsets of the seven white keys in an octave.
pub const WHITE_OFFSETS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Chromatic offsets of the five black keys in an octave.
pub const BLACK_OFFSETS: [u8; 5] = [1, 3, 6, 8, 10];

/// Letter for each semitone offset, C first.
pub const CHROMATIC_LETTERS: [Letter; 12] = [
    Letter::C,
    Letter::CSharp,
    Letter::D,
    Letter::DSharp,
    Letter::E,
    Letter::F,
    Letter::FSharp,
    Letter::G,
    Letter::GSharp,
    Letter::A,
    Letter::ASharp,
    Letter::B,
];

/// Colour of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyColor {
    White,
    Black,
}

impl KeyColor {
    pub fn is_black(self) -> bool {
        self == KeyColor::Black
    }
}

impl fmt::Display for KeyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyColor::White => f.write_str("white"),
            KeyColor::Black => f.write_str("black"),
        }
    }
}

/// One of the twelve chromatic letters, spelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Letter {
    C = 0,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl Letter {
    /// Position inside the octave, C = 0 .. B = 11.
    pub fn semitone(self) -> u8 {
        self as u8
    }

    /// Letter at a semitone offset. Offsets wrap every octave.
    pub fn from_semitone(semitone: u8) -> Letter {
        CHROMATIC_LETTERS[(semitone % OCTAVE_LEN) as usize]
    }

    pub fn is_sharp(self) -> bool {
        BLACK_OFFSETS.contains(&self.semitone())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Letter::C => "C",
            Letter::CSharp => "C#",
            Letter::D => "D",
            Letter::DSharp => "D#",
            Letter::E => "E",
            Letter::F => "F",
            Letter::FSharp => "F#",
            Letter::G => "G",
            Letter::GSharp => "G#",
            Letter::A => "A",
            Letter::ASharp => "A#",
            Letter::B => "B",
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Letter {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CHROMATIC_LETTERS
            .iter()
            .copied()
            .find(|letter| letter.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| KeyError::UnknownLetter(s.to_string()))
    }
}

/// Checks that `index` is a valid key number.
pub fn check_index(index: u8) -> KeyResult<u8> {
    wmidi::Note::try_from(index)
        .map(u8::from)
        .map_err(|_| KeyError::KeyOutOfRange(i32::from(index)))
}

/// Colour of a key: black when `index % 12` is one of [`BLACK_OFFSETS`].
pub fn color_of(index: u8) -> KeyResult<KeyColor> {
    let index = check_index(index)?;
    if BLACK_OFFSETS.contains(&(index % OCTAVE_LEN)) {
        Ok(KeyColor::Black)
    } else {
        Ok(KeyColor::White)
    }
}

/// Key number of white key `slot` (0..=6) in `octave`.
pub fn white_slot_index(octave: u8, slot: usize) -> KeyResult<u8> {
    slot_index(octave, slot, &WHITE_OFFSETS)
}

/// Key number of black key `slot` (0..=4) in `octave`.
pub fn black_slot_index(octave: u8, slot: usize) -> KeyResult<u8> {
    slot_index(octave, slot, &BLACK_OFFSETS)
}

fn slot_index(octave: u8, slot: usize, offsets: &[u8]) -> KeyResult<u8> {
    let offset = *offsets.get(slot).ok_or(KeyError::SlotOutOfRange {
        slot,
        max: offsets.len() - 1,
    })?;
    let index = i32::from(octave) * i32::from(OCTAVE_LEN) + i32::from(offset);
    u8::try_from(index)
        .map_err(|_| KeyError::KeyOutOfRange(index))
        .and_then(check_index)
}

/// Letter of a key.
pub fn letter_of(index: u8) -> KeyResult<Letter> {
    let index = check_index(index)?;
    Ok(Letter::from_semitone(index))
}

/// Octave of a key under the absolute-index convention (`index / 12`).
pub fn octave_of(index: u8) -> KeyResult<u8> {
    let index = check_index(index)?;
    Ok(index / OCTAVE_LEN)
}

/// Slot of a key within its colour's offset table. Inverse of
/// [`white_slot_index`] / [`black_slot_index`].
pub fn slot_of(index: u8) -> KeyResult<usize> {
    let index = check_index(index)?;
    let offset = index % OCTAVE_LEN;
    let table: &[u8] = if color_of(index)?.is_black() {
        &BLACK_OFFSETS
    } else {
        &WHITE_OFFSETS
    };
    // The two tables partition 0..12, so the offset is always found.
    Ok(table.iter().position(|&o| o == offset).unwrap_or_default())
}
