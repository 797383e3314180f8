use std::io::{stdin, BufRead};
use std::thread::spawn;

use clap::Parser;
use pianovox::config::Args;
use pianovox::events::{self, parse_command, KeyboardEvent};
use pianovox::note;
use pianovox::pitch::{MidiPitchDetector, NoPitchDetector, PitchDetector, SimulatedPitchDetector};
use pianovox::tone::{SquareToneGenerator, ToneGenerator};
use pianovox::PlaybackController;

fn init_logging(args: &Args) {
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);
    args.validate()?;

    let (sender, rx) = events::channel();

    let detector: Box<dyn PitchDetector> = if let Some(port) = args.port {
        Box::new(MidiPitchDetector::new(port, sender.pitch_forwarder()))
    } else if args.simulate {
        Box::new(SimulatedPitchDetector::new(
            args.simulate_interval(),
            sender.pitch_forwarder(),
        ))
    } else {
        Box::new(NoPitchDetector)
    };

    let tone = SquareToneGenerator::new(args.volume);
    if !tone.is_running() {
        println!("No audio output, keys will be silent.");
    }

    let mut controller = PlaybackController::new(tone, detector);
    controller.set_scroll_mode(args.scroll);
    controller.set_pitch_detection(args.listen);

    // stdin is read on its own thread; every command goes through the channel
    let input_sender = sender.clone();
    let _read_thread = spawn(move || {
        for line in stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    println!("Error: {}", err);
                    break;
                }
            };
            match parse_command(&line) {
                Some(event) => {
                    let quit = event == KeyboardEvent::Shutdown;
                    if !input_sender.send(event) || quit {
                        return;
                    }
                }
                None if line.trim().is_empty() => {}
                None => println!("commands: p N, r N, scroll, listen, fg, q"),
            }
        }
        input_sender.send(KeyboardEvent::Shutdown);
    });
    drop(sender);

    println!("Ready. Commands: p N, r N, scroll, listen, fg, q");
    events::run(&mut controller, &rx, |c| print_status(c));
    println!("Ending program...");
    Ok(())
}

fn print_status<T: ToneGenerator, D: PitchDetector>(controller: &PlaybackController<T, D>) {
    let held: Vec<String> = controller
        .keys()
        .pressed_keys()
        .iter()
        .map(|&k| note::key_label(k))
        .collect();
    let highlight = match controller.highlighted_note() {
        Some(note) => format!("{} (key {})", note, note.key_number),
        None => "None".to_string(),
    };
    println!(
        "held [{}]  scroll {}  listen {}  note {}",
        held.join(" "),
        if controller.scroll_mode() { "on" } else { "off" },
        if controller.pitch_detection() { "on" } else { "off" },
        highlight,
    );
}
