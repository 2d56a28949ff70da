//! gesture_dj — interactive entry point.

use clap::Parser;
use log::{error, info};

use gesture_dj::app::{run, AppConfig, SourceKind};

#[derive(Parser, Debug)]
#[command(name = "gesture_dj", version, about = "Hand-gesture MIDI controller for DJ software")]
struct Args {
    /// Read landmark frames (JSON lines) from stdin.
    #[arg(long, conflicts_with = "detector")]
    stdin: bool,

    /// Launch a hand-landmark detector and read JSON-lines frames from its stdout.
    /// Without this or --stdin the keyboard simulator is used.
    #[arg(long, value_name = "CMD")]
    detector: Option<String>,

    /// Minimum detection score for a tracked hand.
    #[arg(long, value_name = "SCORE", default_value_t = 0.7)]
    min_confidence: f32,

    /// Print the available MIDI output ports and exit.
    #[arg(long)]
    list_ports: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = AppConfig::default();

    if args.list_ports {
        match dj_midi::list_output_ports(&cfg.midi_client_name) {
            Ok(ports) if ports.is_empty() => println!("No MIDI output ports found."),
            Ok(ports) => {
                for (i, name) in ports.iter().enumerate() {
                    println!("{}{}: {}", if i == 0 { "*" } else { " " }, i, name);
                }
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    cfg.source = match (args.stdin, args.detector) {
        (true, _)       => SourceKind::Stdin,
        (false, Some(cmd)) => SourceKind::Command(cmd),
        (false, None)   => SourceKind::Simulated,
    };
    cfg.min_confidence = args.min_confidence;

    info!("Gesture DJ - source: {}", cfg.source.describe());

    if let Err(e) = run(cfg) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
