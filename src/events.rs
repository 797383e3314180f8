//! Events crossing into the owner thread.
//!
//! Gesture sources and pitch detectors live on other threads. They post
//! [`KeyboardEvent`]s through an [`EventSender`]; only the thread holding the
//! receiver touches the [`PlaybackController`].

use std::ops::ControlFlow;
use std::sync::mpsc::{channel as mpsc_channel, Receiver, Sender};

use crate::controller::PlaybackController;
use crate::note::PitchSample;
use crate::pitch::{PitchDetector, PitchForwarder};
use crate::tone::ToneGenerator;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyboardEvent {
    Press(u8),
    Release(u8),
    Pitch(PitchSample),
    ScrollMode(bool),
    PitchDetection(bool),
    ToggleScrollMode,
    TogglePitchDetection,
    /// App came back to the foreground; retry the tone generator once.
    Foreground,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<KeyboardEvent>,
}

impl EventSender {
    /// Posts an event. Returns false once the owner thread has gone away.
    pub fn send(&self, event: KeyboardEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(err) => {
                log::debug!("owner thread gone, dropping {:?}", err.0);
                false
            }
        }
    }

    /// Detector adapter that posts every sample as [`KeyboardEvent::Pitch`].
    pub fn pitch_forwarder(&self) -> PitchForwarder {
        let sender = self.clone();
        PitchForwarder::new(move |sample| {
            sender.send(KeyboardEvent::Pitch(sample));
        })
    }
}

pub fn channel() -> (EventSender, Receiver<KeyboardEvent>) {
    let (tx, rx) = mpsc_channel();
    (EventSender { tx }, rx)
}

/// Applies events until `Shutdown` arrives or every sender is dropped.
/// `observer` runs after each event, e.g. to redraw.
pub fn run<T, D, F>(
    controller: &mut PlaybackController<T, D>,
    rx: &Receiver<KeyboardEvent>,
    mut observer: F,
)
where
    T: ToneGenerator,
    D: PitchDetector,
    F: FnMut(&PlaybackController<T, D>),
{
    while let Ok(event) = rx.recv() {
        let flow = controller.handle(event);
        observer(controller);
        if flow.is_break() {
            return;
        }
    }
    log::info!("all event senders dropped, shutting down");
    controller.shutdown();
}

/// Applies every queued event without blocking. Returns the number applied.
/// Stops early after `Shutdown`.
pub fn drain<T, D>(
    controller: &mut PlaybackController<T, D>,
    rx: &Receiver<KeyboardEvent>,
) -> usize
where
    T: ToneGenerator,
    D: PitchDetector,
{
    let mut applied = 0;
    while let Ok(event) = rx.try_recv() {
        applied += 1;
        if let ControlFlow::Break(()) = controller.handle(event) {
            break;
        }
    }
    applied
}

/// Parses one line of the text driver: `p N`, `r N`, `scroll`, `listen`,
/// `fg`, `q`.
pub fn parse_command(line: &str) -> Option<KeyboardEvent> {
    let mut words = line.split_whitespace();
    let cmd = words.next()?;
    let arg = words.next();
    if words.next().is_some() {
        return None;
    }
    let key = || arg.and_then(|a| a.parse::<u8>().ok());
    match (cmd, arg) {
        ("p" | "press", Some(_)) => key().map(KeyboardEvent::Press),
        ("r" | "release", Some(_)) => key().map(KeyboardEvent::Release),
        ("scroll", None) => Some(KeyboardEvent::ToggleScrollMode),
        ("listen" | "mic", None) => Some(KeyboardEvent::TogglePitchDetection),
        ("fg", None) => Some(KeyboardEvent::Foreground),
        ("q" | "quit", None) => Some(KeyboardEvent::Shutdown),
        _ => None,
    }
}
