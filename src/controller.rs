//! Playback controller.
//!
//! Turns press/release gestures and detected pitch samples into key state
//! changes, tone generator calls and the highlighted note. Every key is its
//! own released/pressed machine; no error escapes to the caller, failures
//! end up in the log.

use std::ops::ControlFlow;

use crate::error::KeyResult;
use crate::events::KeyboardEvent;
use crate::keys::KeyStore;
use crate::note::{self, Note, PitchSample};
use crate::pitch::PitchDetector;
use crate::tone::ToneGenerator;
use crate::Key;

pub struct PlaybackController<T: ToneGenerator, D: PitchDetector> {
    keys: KeyStore,
    tone: T,
    detector: D,
    scroll_mode: bool,
    pitch_detection: bool,
    highlighted: Option<Note>,
}

impl<T: ToneGenerator, D: PitchDetector> PlaybackController<T, D> {
    /// Starts with every key released, scroll mode off and pitch detection
    /// off. The detector is not started until pitch detection is enabled.
    pub fn new(tone: T, detector: D) -> Self {
        Self {
            keys: KeyStore::new(),
            tone,
            detector,
            scroll_mode: false,
            pitch_detection: false,
            highlighted: None,
        }
    }

    /// Plays `index` and marks it pressed. Ignored in scroll mode.
    pub fn press(&mut self, index: u8) {
        if self.scroll_mode {
            log::trace!("press {} ignored in scroll mode", index);
            return;
        }
        if let Err(err) = self.keys.get(index) {
            log::error!("press: {}", err);
            return;
        }
        self.tone.play_note(index);
        if let Err(err) = self.keys.set_pressed(index, true) {
            log::error!("press: {}", err);
        }
    }

    /// Stops `index` and marks it released. Ignored in scroll mode.
    pub fn release(&mut self, index: u8) {
        if self.scroll_mode {
            log::trace!("release {} ignored in scroll mode", index);
            return;
        }
        if let Err(err) = self.keys.get(index) {
            log::error!("release: {}", err);
            return;
        }
        self.tone.stop_note(index);
        if let Err(err) = self.keys.set_pressed(index, false) {
            log::error!("release: {}", err);
        }
    }

    /// Replaces the highlighted note with the resolved sample.
    pub fn on_pitch_sample(&mut self, sample: PitchSample) {
        if !self.pitch_detection {
            log::debug!("dropping pitch sample {:?}: detection is off", sample);
            return;
        }
        match note::resolve(&sample) {
            Ok(note) => self.highlighted = Some(note),
            Err(err) => log::warn!("unplayable pitch sample {:?}: {}", sample, err),
        }
    }

    pub fn set_scroll_mode(&mut self, on: bool) {
        if self.scroll_mode != on {
            log::debug!("scroll mode {}", if on { "on" } else { "off" });
            self.scroll_mode = on;
        }
    }

    pub fn toggle_scroll_mode(&mut self) {
        self.set_scroll_mode(!self.scroll_mode);
    }

    /// Turning detection on starts the detector and restarts the tone
    /// generator; turning it off stops the detector and clears the
    /// highlight. Start failures leave the feature inert.
    pub fn set_pitch_detection(&mut self, on: bool) {
        if self.pitch_detection == on {
            return;
        }
        self.pitch_detection = on;
        if on {
            if let Err(err) = self.detector.start() {
                log::warn!("pitch detector failed to start: {:#}", err);
            }
            self.restart_audio();
        } else {
            self.highlighted = None;
            self.detector.stop();
        }
    }

    pub fn toggle_pitch_detection(&mut self) {
        self.set_pitch_detection(!self.pitch_detection);
    }

    /// One attempt to bring the tone generator back, e.g. on returning to
    /// the foreground.
    pub fn restart_audio(&mut self) {
        if let Err(err) = self.tone.restart() {
            log::warn!("tone generator failed to restart: {:#}", err);
        }
    }

    /// Stops the detector and releases every held key.
    pub fn shutdown(&mut self) {
        self.set_pitch_detection(false);
        for index in self.keys.pressed_keys() {
            self.tone.stop_note(index);
            if let Err(err) = self.keys.set_pressed(index, false) {
                log::error!("shutdown: {}", err);
            }
        }
    }

    /// Applies one event. Breaks on [`KeyboardEvent::Shutdown`].
    pub fn handle(&mut self, event: KeyboardEvent) -> ControlFlow<()> {
        match event {
            KeyboardEvent::Press(index) => self.press(index),
            KeyboardEvent::Release(index) => self.release(index),
            KeyboardEvent::Pitch(sample) => self.on_pitch_sample(sample),
            KeyboardEvent::ScrollMode(on) => self.set_scroll_mode(on),
            KeyboardEvent::PitchDetection(on) => self.set_pitch_detection(on),
            KeyboardEvent::ToggleScrollMode => self.toggle_scroll_mode(),
            KeyboardEvent::TogglePitchDetection => self.toggle_pitch_detection(),
            KeyboardEvent::Foreground => self.restart_audio(),
            KeyboardEvent::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    pub fn key(&self, index: u8) -> KeyResult<&Key> {
        self.keys.get(index)
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    pub fn highlighted_note(&self) -> Option<&Note> {
        self.highlighted.as_ref()
    }

    pub fn is_highlighted(&self, index: u8) -> bool {
        self.highlighted.map_or(false, |note| note.key_number == index)
    }

    pub fn scroll_mode(&self) -> bool {
        self.scroll_mode
    }

    pub fn pitch_detection(&self) -> bool {
        self.pitch_detection
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Letter;

    #[derive(Default)]
    struct Tone {
        played: Vec<u8>,
        stopped: Vec<u8>,
        restarts: usize,
    }

    impl ToneGenerator for Tone {
        fn play_note(&mut self, key: u8) {
            self.played.push(key);
        }

        fn stop_note(&mut self, key: u8) {
            self.stopped.push(key);
        }

        fn restart(&mut self) -> anyhow::Result<()> {
            self.restarts += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Detector {
        running: bool,
    }

    impl PitchDetector for Detector {
        fn start(&mut self) -> anyhow::Result<()> {
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.running = false;
        }
    }

    fn controller() -> PlaybackController<Tone, Detector> {
        PlaybackController::new(Tone::default(), Detector::default())
    }

    #[test]
    fn defaults() {
        let c = controller();
        assert!(!c.scroll_mode());
        assert!(!c.pitch_detection());
        assert!(c.highlighted_note().is_none());
        assert!(c.keys().pressed_keys().is_empty());
    }

    #[test]
    fn press_twice_is_same_as_once() {
        let mut c = controller();
        c.press(10);
        let once = c.keys().clone();
        c.press(10);
        assert_eq!(
            c.keys().iter().collect::<Vec<_>>(),
            once.iter().collect::<Vec<_>>()
        );
        assert_eq!(c.tone().played, vec![10, 10]);
    }

    #[test]
    fn out_of_range_press_is_swallowed() {
        let mut c = controller();
        c.press(200);
        c.release(200);
        assert!(c.tone().played.is_empty());
        assert!(c.tone().stopped.is_empty());
    }

    #[test]
    fn release_is_gated_by_scroll_mode_too() {
        let mut c = controller();
        c.press(40);
        c.toggle_scroll_mode();
        c.release(40);
        assert!(c.key(40).unwrap().is_pressed());
        assert!(c.tone().stopped.is_empty());
    }

    #[test]
    fn enabling_detection_starts_detector_and_restarts_audio() {
        let mut c = controller();
        c.set_pitch_detection(true);
        assert!(c.detector().running);
        assert_eq!(c.tone().restarts, 1);
        // same value again is a no-op
        c.set_pitch_detection(true);
        assert_eq!(c.tone().restarts, 1);
        c.toggle_pitch_detection();
        assert!(!c.detector().running);
    }

    #[test]
    fn unresolvable_sample_keeps_previous_highlight() {
        let mut c = controller();
        c.set_pitch_detection(true);
        c.on_pitch_sample(PitchSample::new(4, Letter::A));
        c.on_pitch_sample(PitchSample::new(9, Letter::B));
        assert_eq!(c.highlighted_note().map(|n| n.key_number), Some(69));
        assert!(c.is_highlighted(69));
        assert!(!c.is_highlighted(70));
    }

    #[test]
    fn samples_ignored_while_detection_off() {
        let mut c = controller();
        c.on_pitch_sample(PitchSample::new(4, Letter::A));
        assert!(c.highlighted_note().is_none());
    }

    #[test]
    fn shutdown_releases_held_keys() {
        let mut c = controller();
        c.press(60);
        c.press(64);
        c.set_pitch_detection(true);
        assert_eq!(c.handle(KeyboardEvent::Shutdown), ControlFlow::Break(()));
        assert!(c.keys().pressed_keys().is_empty());
        assert_eq!(c.tone().stopped, vec![60, 64]);
        assert!(!c.detector().running);
        assert!(!c.pitch_detection());
    }
}
