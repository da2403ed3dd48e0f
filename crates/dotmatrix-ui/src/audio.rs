use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use dotmatrix_core::apu::Apu;
use dotmatrix_core::audio_queue::AudioConsumer;
use log::warn;

/// Start audio playback using `cpal`, pulling samples from the APU's ring
/// buffer on the device callback thread.
///
/// Returns the active [`cpal::Stream`] if successful; on any failure the
/// emulator simply runs without sound.
pub fn start_stream(apu: &mut Apu) -> Option<cpal::Stream> {
    let host = cpal::default_host();
    let device = host.default_output_device()?;
    let supported = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            warn!("no supported audio output config: {e}");
            return None;
        }
    };
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let consumer = apu.enable_output(config.sample_rate.0);
    let channels = config.channels as usize;
    let err_fn = |err| log::error!("audio stream error: {err}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _| {
                for frame in data.chunks_mut(channels) {
                    let (left, right) = next_frame(&consumer);
                    frame[0] = left;
                    if channels > 1 {
                        frame[1] = right;
                    }
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _| {
                for frame in data.chunks_mut(channels) {
                    let (left, right) = next_frame(&consumer);
                    frame[0] = to_i16(left);
                    if channels > 1 {
                        frame[1] = to_i16(right);
                    }
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_output_stream(
            &config,
            move |data: &mut [u16], _| {
                for frame in data.chunks_mut(channels) {
                    let (left, right) = next_frame(&consumer);
                    frame[0] = (to_i16(left) as i32 + 32768) as u16;
                    if channels > 1 {
                        frame[1] = (to_i16(right) as i32 + 32768) as u16;
                    }
                }
            },
            err_fn,
            None,
        ),
        other => {
            warn!("unsupported audio sample format {other:?}");
            return None;
        }
    };

    match stream {
        Ok(stream) => {
            if let Err(e) = stream.play() {
                warn!("failed to start audio stream: {e}");
                return None;
            }
            Some(stream)
        }
        Err(e) => {
            warn!("failed to build audio stream: {e}");
            None
        }
    }
}

/// Underruns play silence.
#[inline]
fn next_frame(consumer: &AudioConsumer) -> (f32, f32) {
    consumer.pop_stereo().unwrap_or((0.0, 0.0))
}

#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
