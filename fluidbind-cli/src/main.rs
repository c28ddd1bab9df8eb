//! fluidbind CLI: play a chord from a soundfont through FluidSynth.
//!
//! Subcommands
//! - `info`   : binding and engine versions
//! - `live`   : FluidSynth's own audio driver plays while we send events
//! - `render` : offline render to a 16-bit stereo WAV via `write_s16`
//! - `play`   : pull rendered samples and stream them through cpal

mod chord;
mod play;
mod render;

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use fluidbind_engine::{Synth, SynthConfig};
use tracing::Level;

use crate::chord::ChordArgs;

#[derive(Debug, Parser)]
#[command(name = "fluidbind", version, about = "Play and render soundfonts through FluidSynth")]
struct Cli {
    /// TOML synth config (see SynthConfig).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the FluidSynth shared library.
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// FluidSynth audio driver for `live` (alsa, pulseaudio, coreaudio, ...).
    #[arg(long, global = true)]
    driver: Option<String>,

    /// More logging (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print binding and engine versions.
    Info,
    /// Play through FluidSynth's audio driver.
    Live(ChordArgs),
    /// Render to a WAV file.
    Render {
        #[command(flatten)]
        chord: ChordArgs,
        /// Output WAV path.
        #[arg(short, long, default_value = "out.wav")]
        out: PathBuf,
    },
    /// Render in pull mode and stream through the default cpal device.
    Play(ChordArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<SynthConfig, Box<dyn Error>> {
    let cfg = match &cli.config {
        Some(path) => SynthConfig::load(path)?,
        None => SynthConfig::from_env(),
    };
    apply_flags(cli, cfg)
}

/// Command-line flags win over the file and the environment.
fn apply_flags(cli: &Cli, mut cfg: SynthConfig) -> Result<SynthConfig, Box<dyn Error>> {
    if let Some(lib) = &cli.library {
        cfg.library = Some(lib.clone());
    }
    if let Some(drv) = &cli.driver {
        cfg.audio_driver = Some(drv.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn info(cfg: SynthConfig) -> Result<(), Box<dyn Error>> {
    println!("binding interface: {}", <Synth>::version());
    let mut synth = Synth::new(cfg);
    synth.init()?;
    match synth.engine_version() {
        Some(v) => println!("fluidsynth:        {v}"),
        None => println!("fluidsynth:        (version not exported)"),
    }
    synth.stop();
    Ok(())
}

fn live(cfg: SynthConfig, args: &ChordArgs) -> Result<(), Box<dyn Error>> {
    let mut synth = Synth::new(cfg);
    synth.init()?;
    synth.start()?;
    chord::load_program(&mut synth, args)?;

    std::thread::sleep(Duration::from_secs_f32(args.lead_in));
    chord::press(&mut synth, args)?;
    std::thread::sleep(Duration::from_secs_f32(args.hold));
    chord::release(&mut synth, args)?;
    std::thread::sleep(Duration::from_secs_f32(args.tail));

    synth.stop();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = load_config(&cli)?;

    match &cli.command {
        Command::Info => info(cfg),
        Command::Live(args) => live(cfg, args),
        Command::Render { chord, out } => render::to_wav(cfg, chord, out),
        Command::Play(args) => play::stream(cfg, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_defaults() {
        let cli = Cli::parse_from(["fluidbind", "render", "piano.sf2"]);
        match cli.command {
            Command::Render { chord, out } => {
                assert_eq!(out, PathBuf::from("out.wav"));
                assert_eq!(chord.keys, vec![60, 67, 76]);
                assert_eq!(chord.velocity, 30);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_overrides_apply() {
        let cli = Cli::parse_from([
            "fluidbind",
            "--library",
            "/opt/lib/libfluidsynth.so",
            "--driver",
            "alsa",
            "live",
            "piano.sf2",
        ]);
        let cfg = apply_flags(&cli, SynthConfig::default()).unwrap();
        assert_eq!(cfg.audio_driver.as_deref(), Some("alsa"));
        assert_eq!(cfg.library, Some(PathBuf::from("/opt/lib/libfluidsynth.so")));
    }

    #[test]
    fn config_file_is_read() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "gain = 0.8").unwrap();
        let path = f.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from(["fluidbind", "--config", &path, "info"]);
        assert_eq!(load_config(&cli).unwrap().gain, 0.8);
    }

    #[test]
    fn invalid_flag_values_are_rejected() {
        let cli = Cli::parse_from(["fluidbind", "--driver", "al\u{0}sa", "info"]);
        assert!(apply_flags(&cli, SynthConfig::default()).is_err());
    }
}
