//! Tone generator contract and the cpal square-wave synth behind it.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::mapping::KEY_COUNT;

/// Plays and stops notes by key number. Calls are fire-and-forget.
pub trait ToneGenerator {
    fn play_note(&mut self, key: u8);
    fn stop_note(&mut self, key: u8);
    /// Reopens the output. A failure leaves the previous state in place,
    /// so a generator that never opened stays silent.
    fn restart(&mut self) -> anyhow::Result<()>;
}

/// Per-key oscillator state shared with the audio callback.
#[derive(Debug, Clone)]
struct Voice {
    gate: bool,
    freq: f32,
    sample_clock: f32,
}

/// Square-wave synth on the default cpal output device.
pub struct SquareToneGenerator {
    volume: f32,
    voices: Arc<Mutex<Vec<Voice>>>,
    stream: Option<cpal::Stream>,
}

impl SquareToneGenerator {
    /// Creates the synth and tries to open the output once. On failure the
    /// generator stays silent until [`ToneGenerator::restart`] succeeds.
    pub fn new(volume: f32) -> Self {
        let voices = (0..KEY_COUNT as u8)
            .map(|i| Voice {
                gate: false,
                freq: wmidi::Note::try_from(i)
                    .map(|n| n.to_freq_f32())
                    .unwrap_or_default(),
                sample_clock: 0.0,
            })
            .collect();
        let mut generator = Self {
            volume,
            voices: Arc::new(Mutex::new(voices)),
            stream: None,
        };
        if let Err(err) = generator.restart() {
            log::warn!("audio output unavailable: {:#}", err);
        }
        generator
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn set_gate(&self, key: u8, gate: bool) {
        if let Ok(mut voices) = self.voices.lock() {
            if let Some(voice) = voices.get_mut(key as usize) {
                voice.gate = gate;
                voice.sample_clock = 0.0;
            }
        }
    }

    fn open_stream(&self) -> anyhow::Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("failed to find output device"))?;
        log::info!("Output device: {:?}", device.name()?);

        let config: cpal::StreamConfig = device
            .default_output_config()
            .context("no default output config")?
            .into();
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;
        log::debug!("Sample Rate: {}, Channels: {}", sample_rate, channels);

        let voices = Arc::clone(&self.voices);
        let volume = self.volume;
        let mut next_value = move || {
            match voices.lock() {
                Ok(mut voices) => mix(&mut voices, sample_rate, volume),
                Err(_) => 0.0,
            }
        };

        let err_fn = |err| log::error!("an error occurred on stream: {}", err);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                write_data(data, channels, &mut next_value)
            },
            err_fn,
        )?;
        stream.play()?;
        Ok(stream)
    }
}

impl ToneGenerator for SquareToneGenerator {
    fn play_note(&mut self, key: u8) {
        self.set_gate(key, true);
    }

    fn stop_note(&mut self, key: u8) {
        self.set_gate(key, false);
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        let opened = self.open_stream();
        replace_stream(&mut self.stream, opened)
    }
}

/// Swaps in a freshly opened stream. A failed open keeps the old one playing.
fn replace_stream<S>(current: &mut Option<S>, opened: anyhow::Result<S>) -> anyhow::Result<()> {
    *current = Some(opened?);
    Ok(())
}

/// Next sample of all gated voices, averaged so chords stay within [-1, 1].
fn mix(voices: &mut [Voice], sample_rate: f32, volume: f32) -> f32 {
    let mut out = 0.0;
    let mut active = 0u32;
    for voice in voices.iter_mut().filter(|v| v.gate) {
        voice.sample_clock += 1.0;
        out += square(voice.freq, voice.sample_clock, sample_rate);
        active += 1;
    }
    if active == 0 {
        return 0.0;
    }
    out / active as f32 * volume
}

fn square(freq: f32, clock: f32, sample_rate: f32) -> f32 {
    4.0 * (freq * clock / sample_rate).floor() - 2.0 * (2.0 * freq * clock / sample_rate).floor()
        + 1.0
}

fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
where
    T: cpal::Sample,
{
    for frame in output.chunks_mut(channels) {
        let value: T = cpal::Sample::from::<f32>(&next_sample());
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_alternates_between_rails() {
        // 1 Hz at 4 samples per second: high for the first half period
        let values: Vec<f32> = (0..4).map(|c| square(1.0, c as f32, 4.0)).collect();
        assert_eq!(values, vec![1.0, 1.0, -1.0, -1.0]);
    }

    fn voice(freq: f32, gate: bool) -> Voice {
        Voice {
            gate,
            freq,
            sample_clock: 0.0,
        }
    }

    #[test]
    fn chords_stay_within_full_scale() {
        let mut voices = vec![voice(1.0, true), voice(1.0, true), voice(1.0, true)];
        // all three in phase on the high rail
        let first = mix(&mut voices, 4.0, 1.0);
        assert_eq!(first, 1.0);
        for _ in 0..16 {
            assert!(mix(&mut voices, 4.0, 1.0).abs() <= 1.0);
        }
        let mut quiet = vec![voice(220.0, true), voice(330.0, true)];
        for _ in 0..64 {
            assert!(mix(&mut quiet, 48_000.0, 0.55).abs() <= 0.55);
        }
    }

    #[test]
    fn silent_when_no_gate_is_open() {
        let mut voices = vec![voice(440.0, false); 4];
        assert_eq!(mix(&mut voices, 48_000.0, 1.0), 0.0);
        assert!(voices.iter().all(|v| v.sample_clock == 0.0));
    }

    #[test]
    fn failed_reopen_keeps_the_running_stream() {
        let mut current = Some(1u32);
        assert!(replace_stream(&mut current, Err(anyhow!("device busy"))).is_err());
        assert_eq!(current, Some(1));

        assert!(replace_stream(&mut current, Ok(2)).is_ok());
        assert_eq!(current, Some(2));

        let mut none: Option<u32> = None;
        assert!(replace_stream(&mut none, Err(anyhow!("no device"))).is_err());
        assert_eq!(none, None);
    }

    #[test]
    fn write_data_fills_every_channel() {
        let mut buf = vec![0.0f32; 6];
        let mut n = 0.0f32;
        let mut next = || {
            n += 0.25;
            n
        };
        write_data(&mut buf, 2, &mut next);
        assert_eq!(buf, vec![0.25, 0.25, 0.5, 0.5, 0.75, 0.75]);
    }
}
