//! Pitch detector contract and sample sources.
//!
//! A detector runs on its own thread or callback context and reports through
//! [`PitchEvents`]. [`PitchForwarder`] is the only implementation; it hands
//! samples to an injected closure, which normally posts them to the owner
//! thread (see [`crate::events::EventSender::pitch_forwarder`]).

use std::error::Error;
use std::fmt;
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{spawn, JoinHandle};
use std::time::Duration;

use anyhow::anyhow;
use midir::{Ignore, MidiInput, MidiInputConnection};
use rand::Rng;
use wmidi::MidiMessage;

use crate::note::PitchSample;

/// Start/stop lifecycle of an external pitch source.
pub trait PitchDetector {
    fn start(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self);
}

impl<P: PitchDetector + ?Sized> PitchDetector for Box<P> {
    fn start(&mut self) -> anyhow::Result<()> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Placeholder when no pitch source is configured; never starts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPitchDetector;

impl PitchDetector for NoPitchDetector {
    fn start(&mut self) -> anyhow::Result<()> {
        Err(anyhow!("no pitch source configured"))
    }

    fn stop(&mut self) {}
}

/// Receiver side of a pitch detector.
pub trait PitchEvents: Send + Sync {
    fn on_pitch(&self, sample: PitchSample);
    fn on_error(&self, err: &dyn Error);
    fn on_below_threshold(&self);
}

/// Forwards detected samples to a closure; errors and silence are logged.
#[derive(Clone)]
pub struct PitchForwarder {
    on_sample: Arc<dyn Fn(PitchSample) + Send + Sync>,
}

impl PitchForwarder {
    pub fn new<F>(on_sample: F) -> Self
    where
        F: Fn(PitchSample) + Send + Sync + 'static,
    {
        Self {
            on_sample: Arc::new(on_sample),
        }
    }
}

impl fmt::Debug for PitchForwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PitchForwarder").finish_non_exhaustive()
    }
}

impl PitchEvents for PitchForwarder {
    fn on_pitch(&self, sample: PitchSample) {
        (self.on_sample)(sample)
    }

    fn on_error(&self, err: &dyn Error) {
        log::warn!("pitch detector error: {}", err);
    }

    fn on_below_threshold(&self) {
        log::debug!("below level threshold");
    }
}

/// Uses note-on messages from a MIDI input port as detected pitches.
pub struct MidiPitchDetector<E: PitchEvents + Clone + 'static> {
    port_index: usize,
    events: E,
    connection: Option<MidiInputConnection<()>>,
}

impl<E: PitchEvents + Clone + 'static> MidiPitchDetector<E> {
    pub fn new(port_index: usize, events: E) -> Self {
        Self {
            port_index,
            events,
            connection: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.connection.is_some()
    }
}

impl<E: PitchEvents + Clone + 'static> PitchDetector for MidiPitchDetector<E> {
    fn start(&mut self) -> anyhow::Result<()> {
        self.stop();
        let mut midi_in = MidiInput::new("pianovox reading input")?;
        midi_in.ignore(Ignore::All);

        let in_ports = midi_in.ports();
        let in_port = in_ports
            .get(self.port_index)
            .ok_or_else(|| anyhow!("no MIDI input port {}", self.port_index))?
            .clone();
        let in_port_name = midi_in.port_name(&in_port)?;

        let events = self.events.clone();
        let connection = midi_in
            .connect(
                &in_port,
                "pianovox-read-input",
                move |_, message, _| dispatch_message(&events, message),
                (),
            )
            .map_err(|err| anyhow!("failed to open '{}': {}", in_port_name, err))?;
        log::info!("reading pitches from MIDI input '{}'", in_port_name);
        self.connection = Some(connection);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
            log::info!("closed MIDI input connection");
        }
    }
}

impl<E: PitchEvents + Clone + 'static> Drop for MidiPitchDetector<E> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Routes one raw MIDI message to the matching [`PitchEvents`] call.
pub fn dispatch_message<E: PitchEvents>(events: &E, message: &[u8]) {
    match MidiMessage::try_from(message) {
        Ok(MidiMessage::NoteOn(_, note, velocity)) if u8::from(velocity) > 0 => {
            match PitchSample::from_key_number(u8::from(note)) {
                Ok(sample) => events.on_pitch(sample),
                Err(err) => events.on_error(&err),
            }
        }
        Ok(MidiMessage::NoteOn(..)) | Ok(MidiMessage::NoteOff(..)) => events.on_below_threshold(),
        Ok(_) => {}
        Err(err) => events.on_error(&err),
    }
}

/// Emits a random pitch at a fixed interval from a background thread.
/// Stands in for a microphone when no input device is configured.
pub struct SimulatedPitchDetector<E: PitchEvents + Clone + 'static> {
    interval: Duration,
    events: E,
    // dropping the sender wakes the worker and ends it
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl<E: PitchEvents + Clone + 'static> SimulatedPitchDetector<E> {
    pub fn new(interval: Duration, events: E) -> Self {
        Self {
            interval,
            events,
            stop_tx: None,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

/// A slightly detuned frequency in the vocal range, C2..B5.
fn random_frequency<R: Rng>(rng: &mut R) -> f32 {
    let key: u8 = rng.gen_range(36..=83);
    let cents: f32 = rng.gen_range(-20.0..20.0);
    440.0 * 2f32.powf((f32::from(key) - 69.0 + cents / 100.0) / 12.0)
}

impl<E: PitchEvents + Clone + 'static> PitchDetector for SimulatedPitchDetector<E> {
    fn start(&mut self) -> anyhow::Result<()> {
        self.stop();
        let (stop_tx, stop_rx) = channel::<()>();
        let events = self.events.clone();
        let interval = self.interval;
        self.worker = Some(spawn(move || {
            let mut rng = rand::thread_rng();
            loop {
                match PitchSample::from_frequency(random_frequency(&mut rng)) {
                    Some(sample) => events.on_pitch(sample),
                    None => events.on_below_threshold(),
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }));
        self.stop_tx = Some(stop_tx);
        Ok(())
    }

    fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("simulated pitch detector thread panicked");
            }
        }
    }
}

impl<E: PitchEvents + Clone + 'static> Drop for SimulatedPitchDetector<E> {
    fn drop(&mut self) {
        self.stop();
    }
}
