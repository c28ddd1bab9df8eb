//! The demo phrase every subcommand plays: optional silence, a held chord,
//! then the release tail.

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use fluidbind_engine::{Backend, Synth};

#[derive(Debug, Clone, Args)]
pub struct ChordArgs {
    /// SoundFont (.sf2) to load.
    pub soundfont: PathBuf,

    #[arg(long, default_value_t = 0)]
    pub channel: i32,

    #[arg(long, default_value_t = 0)]
    pub bank: i32,

    #[arg(long, default_value_t = 0)]
    pub preset: i32,

    /// MIDI keys of the chord.
    #[arg(long, value_delimiter = ',', default_values_t = [60, 67, 76])]
    pub keys: Vec<i32>,

    #[arg(long, default_value_t = 30)]
    pub velocity: i32,

    /// Seconds of silence before the chord.
    #[arg(long, default_value_t = 0.0, value_parser = parse_seconds)]
    pub lead_in: f32,

    /// Seconds the chord is held.
    #[arg(long, default_value_t = 1.0, value_parser = parse_seconds)]
    pub hold: f32,

    /// Seconds of decay after note-off.
    #[arg(long, default_value_t = 1.0, value_parser = parse_seconds)]
    pub tail: f32,
}

fn parse_seconds(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(format!("{s} is not a non-negative number of seconds"))
    }
}

impl ChordArgs {
    pub fn total_seconds(&self) -> f32 {
        self.lead_in + self.hold + self.tail
    }
}

/// Load the soundfont and bind its preset to the chord's channel.
pub fn load_program<B: Backend>(synth: &mut Synth<B>, args: &ChordArgs) -> Result<i32, Box<dyn Error>> {
    let id = synth.sfload(&args.soundfont)?;
    if id < 0 {
        return Err(format!("failed to load soundfont {}", args.soundfont.display()).into());
    }
    let status = synth.program_select(args.channel, id, args.bank, args.preset)?;
    if status.is_failed() {
        tracing::warn!(
            bank = args.bank,
            preset = args.preset,
            "program_select failed: {status}"
        );
    }
    Ok(id)
}

pub fn press<B: Backend>(synth: &mut Synth<B>, args: &ChordArgs) -> Result<(), Box<dyn Error>> {
    for &key in &args.keys {
        let status = synth.noteon(args.channel, key, args.velocity)?;
        if status.is_failed() {
            tracing::warn!(key, "noteon failed: {status}");
        }
    }
    Ok(())
}

pub fn release<B: Backend>(synth: &mut Synth<B>, args: &ChordArgs) -> Result<(), Box<dyn Error>> {
    for &key in &args.keys {
        synth.noteoff(args.channel, key)?;
    }
    Ok(())
}
