//! Offline render to a 16-bit stereo WAV file.

use std::error::Error;
use std::path::Path;

use fluidbind_engine::layout::CHANNELS;
use fluidbind_engine::{Backend, SampleLayout, Synth, SynthConfig};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::chord::{self, ChordArgs};

/// Frames rendered per engine call.
const BLOCK_FRAMES: usize = 4096;

pub fn to_wav(mut cfg: SynthConfig, args: &ChordArgs, out: &Path) -> Result<(), Box<dyn Error>> {
    if cfg.layout != SampleLayout::Interleaved {
        tracing::warn!("WAV output needs interleaved samples; ignoring configured layout");
        cfg.layout = SampleLayout::Interleaved;
    }
    let sample_rate = cfg.sample_rate;
    let mut synth = Synth::new(cfg);
    synth.init()?;
    chord::load_program(&mut synth, args)?;

    let spec = WavSpec {
        channels: 2,
        sample_rate: sample_rate.round() as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(out, spec)?;

    let mut frames = render_seconds(&mut synth, sample_rate, args.lead_in, &mut writer)?;
    chord::press(&mut synth, args)?;
    frames += render_seconds(&mut synth, sample_rate, args.hold, &mut writer)?;
    chord::release(&mut synth, args)?;
    frames += render_seconds(&mut synth, sample_rate, args.tail, &mut writer)?;

    writer.finalize()?;
    synth.stop();
    println!("Wrote {frames} frames to {}", out.display());
    Ok(())
}

/// Render `seconds` of audio block by block into `writer`; returns frames written.
fn render_seconds<B, W>(
    synth: &mut Synth<B>,
    sample_rate: f64,
    seconds: f32,
    writer: &mut WavWriter<W>,
) -> Result<usize, Box<dyn Error>>
where
    B: Backend,
    W: std::io::Write + std::io::Seek,
{
    let total = (f64::from(seconds) * sample_rate).round() as usize;
    let mut block = vec![0i16; BLOCK_FRAMES * CHANNELS];
    let mut remaining = total;

    while remaining > 0 {
        let frames = remaining.min(BLOCK_FRAMES);
        let written = fill(synth, &mut block[..frames * CHANNELS])?;
        for &s in &block[..written * CHANNELS] {
            writer.write_sample(s)?;
        }
        remaining -= written;
    }
    Ok(total)
}

/// Fill `out` with whole interleaved frames, one engine call per
/// `max_frames_per_call` frames at most. Returns the frames written.
pub fn fill<B: Backend>(synth: &mut Synth<B>, out: &mut [i16]) -> fluidbind_engine::Result<usize> {
    let chunk = synth.config().max_frames_per_call.max(1) * CHANNELS;
    let mut frames = 0;
    for block in out.chunks_mut(chunk) {
        frames += synth.render_into(block)?;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidbind_engine::testing::RampBackend;

    fn capped(max_frames_per_call: usize) -> Synth<RampBackend> {
        let cfg = SynthConfig { max_frames_per_call, ..SynthConfig::default() };
        let mut synth = Synth::with_backend(RampBackend::default(), cfg);
        synth.init().unwrap();
        synth
    }

    #[test]
    fn fill_splits_at_the_frame_cap() {
        let mut synth = capped(1000);
        let mut buf = vec![0i16; BLOCK_FRAMES * CHANNELS];
        assert_eq!(fill(&mut synth, &mut buf).unwrap(), BLOCK_FRAMES);
        assert_eq!(synth.backend().renders(), vec![1000, 1000, 1000, 1000, 96]);
        // each chunk restarts the ramp
        assert_eq!(buf[2000..2002], [0i16, 0]);
    }

    #[test]
    fn fill_uses_one_call_under_the_cap() {
        let mut synth = capped(8192);
        let mut buf = vec![0i16; 512 * CHANNELS];
        assert_eq!(fill(&mut synth, &mut buf).unwrap(), 512);
        assert_eq!(synth.backend().renders(), vec![512]);
    }

    #[test]
    fn small_cap_still_renders_whole_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capped.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        let mut synth = capped(1000);

        let frames = render_seconds(&mut synth, 44_100.0, 0.1, &mut writer).unwrap();
        writer.finalize().unwrap();

        assert_eq!(frames, 4410);
        assert!(synth.backend().renders().iter().all(|&n| n <= 1000));
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 4410 * 2);
    }
}
