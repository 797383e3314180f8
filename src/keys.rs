//! The 128-key state store.

use crate::error::{KeyError, KeyResult};
use crate::mapping::{self, KEY_COUNT};
use crate::Key;

/// Owns one [`Key`] per key number, built once and mutated in place.
#[derive(Debug, Clone)]
pub struct KeyStore {
    keys: Vec<Key>,
}

impl KeyStore {
    pub fn new() -> Self {
        let mut keys: Vec<Key> = Vec::with_capacity(KEY_COUNT);
        for i in 0..=127u8 {
            keys.push(Key {
                // 0..=127 are always valid key numbers
                color: mapping::color_of(i).unwrap_or(mapping::KeyColor::White),
                keynumber: i,
                pressed: false,
            });
        }
        Self { keys }
    }

    pub fn get(&self, index: u8) -> KeyResult<&Key> {
        self.keys
            .get(index as usize)
            .ok_or(KeyError::KeyOutOfRange(i32::from(index)))
    }

    /// Sets the pressed flag. Setting the current value again changes nothing.
    pub fn set_pressed(&mut self, index: u8, pressed: bool) -> KeyResult<()> {
        let key = self
            .keys
            .get_mut(index as usize)
            .ok_or(KeyError::KeyOutOfRange(i32::from(index)))?;
        key.pressed = pressed;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Key numbers currently held down, lowest first.
    pub fn pressed_keys(&self) -> Vec<u8> {
        self.keys
            .iter()
            .filter(|k| k.pressed)
            .map(|k| k.keynumber)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}
