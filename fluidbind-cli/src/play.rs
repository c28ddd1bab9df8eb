//! Pull-mode playback: the cpal callback asks the synthesizer for samples via
//! `render_into`, while the main thread sends note events.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fluidbind_engine::{SampleLayout, Synth, SynthConfig};
use parking_lot::Mutex;

use crate::chord::{self, ChordArgs};
use crate::render;

type Shared = Arc<Mutex<Synth>>;

pub fn stream(mut cfg: SynthConfig, args: &ChordArgs) -> Result<(), Box<dyn Error>> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("no default output device")?;
    let sup_cfg = device.default_output_config()?;
    let sample_format = sup_cfg.sample_format();
    let stream_cfg: cpal::StreamConfig = sup_cfg.config();

    // Render at the device rate so no resampling is needed.
    cfg.sample_rate = f64::from(stream_cfg.sample_rate.0);
    cfg.layout = SampleLayout::Interleaved;

    let mut synth = Synth::new(cfg);
    synth.init()?;
    chord::load_program(&mut synth, args)?;
    let synth: Shared = Arc::new(Mutex::new(synth));

    println!("Using device: {}", device.name()?);
    println!("Stream config: {stream_cfg:?} (sample_format: {sample_format:?})");

    let err_fn = |e: cpal::StreamError| tracing::error!("cpal stream error: {e}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_cfg, Arc::clone(&synth), err_fn)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_cfg, Arc::clone(&synth), err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_cfg, Arc::clone(&synth), err_fn)?,
        other => return Err(format!("unsupported device sample format: {other:?}").into()),
    };
    stream.play()?;

    std::thread::sleep(Duration::from_secs_f32(args.lead_in));
    chord::press(&mut *synth.lock(), args)?;
    std::thread::sleep(Duration::from_secs_f32(args.hold));
    chord::release(&mut *synth.lock(), args)?;
    std::thread::sleep(Duration::from_secs_f32(args.tail));

    drop(stream);
    synth.lock().stop();
    tracing::info!("Played {:.1} s", args.total_seconds());
    Ok(())
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    synth: Shared,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::FromSample<i16> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels);
    let mut scratch: Vec<i16> = vec![0; 8192];

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            let frames = output.len() / channels.max(1);
            if scratch.len() < frames * 2 {
                scratch.resize(frames * 2, 0);
            }
            let rendered = match render::fill(&mut *synth.lock(), &mut scratch[..frames * 2]) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!("render failed: {e}");
                    0
                }
            };
            for (i, frame) in output.chunks_mut(channels).enumerate() {
                let (l, r) = if i < rendered {
                    (scratch[2 * i], scratch[2 * i + 1])
                } else {
                    (0, 0)
                };
                write_frame(frame, l, r);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Map a stereo pair onto a device frame of any width.
fn write_frame<T: cpal::Sample + cpal::FromSample<i16>>(frame: &mut [T], l: i16, r: i16) {
    match frame.len() {
        0 => {}
        1 => frame[0] = T::from_sample(((i32::from(l) + i32::from(r)) / 2) as i16),
        _ => {
            frame[0] = T::from_sample(l);
            frame[1] = T::from_sample(r);
            for ch in &mut frame[2..] {
                *ch = T::EQUILIBRIUM;
            }
        }
    }
}
