//! Command line configuration.

use std::time::Duration;

use anyhow::bail;
use clap::Parser;

/// Default square-wave amplitude.
pub const DEFAULT_VOLUME: f32 = 0.55;

/// On-screen piano core driven from the terminal.
#[derive(Debug, Clone, Parser)]
#[clap(name = "pianovox", version, about)]
pub struct Args {
    /// MIDI input port index used as the pitch source
    #[clap(short, long)]
    pub port: Option<usize>,

    /// Use randomly generated pitch samples instead of a MIDI port
    #[clap(long, conflicts_with = "port")]
    pub simulate: bool,

    /// Milliseconds between simulated pitch samples
    #[clap(long, default_value_t = 500)]
    pub simulate_interval_ms: u64,

    /// Output volume, 0.0 to 1.0
    #[clap(long, default_value_t = DEFAULT_VOLUME)]
    pub volume: f32,

    /// Start in scroll mode (key presses are ignored)
    #[clap(long)]
    pub scroll: bool,

    /// Start with pitch detection on
    #[clap(long)]
    pub listen: bool,

    /// Debug logging
    #[clap(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            bail!("volume must be between 0.0 and 1.0, got {}", self.volume);
        }
        if self.simulate_interval_ms == 0 {
            bail!("simulate interval must be at least 1 ms");
        }
        Ok(())
    }

    pub fn simulate_interval(&self) -> Duration {
        Duration::from_millis(self.simulate_interval_ms)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["pianovox"]).unwrap();
        assert_eq!(args.port, None);
        assert!(!args.simulate);
        assert!(!args.scroll);
        assert!(!args.listen);
        assert_eq!(args.volume, DEFAULT_VOLUME);
        assert_eq!(args.simulate_interval(), Duration::from_millis(500));
        assert_eq!(args.log_level(), log::LevelFilter::Warn);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn parses_flags() {
        let args =
            Args::try_parse_from(["pianovox", "--port", "2", "--listen", "--scroll", "-v"]).unwrap();
        assert_eq!(args.port, Some(2));
        assert!(args.listen);
        assert!(args.scroll);
        assert_eq!(args.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn port_conflicts_with_simulate() {
        assert!(Args::try_parse_from(["pianovox", "--port", "1", "--simulate"]).is_err());
    }

    #[test]
    fn rejects_loud_volume() {
        let args = Args::try_parse_from(["pianovox", "--volume", "1.5"]).unwrap();
        assert!(args.validate().is_err());
    }
}
