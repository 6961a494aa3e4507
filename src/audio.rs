use crate::error::AudioError;
use cpal::{
    SampleFormat,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Format expected by the speech recognition endpoint.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

struct Recording {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// Records the default microphone for `window` and returns 16 kHz mono WAV bytes.
pub async fn record_wav(window: Duration) -> Result<Vec<u8>, AudioError> {
    let recording = tokio::task::spawn_blocking(move || record_samples(window)).await??;
    log::debug!(
        "Recorded {} samples at {} Hz over {} channels",
        recording.samples.len(),
        recording.sample_rate,
        recording.channels
    );
    let mono = downmix(&recording.samples, recording.channels);
    let resampled = resample(&mono, recording.sample_rate, SPEECH_SAMPLE_RATE);
    encode_wav(&resampled, SPEECH_SAMPLE_RATE)
}

fn record_samples(window: Duration) -> Result<Recording, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioError::NoInputDevice)?;
    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
    let err_fn = |err: cpal::StreamError| log::error!("Input stream error: {err}");

    let stream = match sample_format {
        SampleFormat::F32 => {
            let buffer = Arc::clone(&buffer);
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buffer) = buffer.lock() {
                        buffer.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::I16 => {
            let buffer = Arc::clone(&buffer);
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buffer) = buffer.lock() {
                        buffer.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                    }
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let buffer = Arc::clone(&buffer);
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buffer) = buffer.lock() {
                        buffer.extend(data.iter().map(|&s| (s as f32 - 32_768.0) / 32_768.0));
                    }
                },
                err_fn,
                None,
            )?
        }
        other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
    };

    stream.play()?;
    std::thread::sleep(window);
    drop(stream);

    let samples = buffer
        .lock()
        .map(|mut buffer| std::mem::take(&mut *buffer))
        .map_err(|e| AudioError::ThreadJoin(e.to_string()))?;

    Ok(Recording {
        samples,
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    })
}

pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

// Linear interpolation; good enough for speech.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || from == 0 || to == 0 || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = from as f64 / to as f64;
    let len = (samples.len() as f64 / ratio).floor() as usize;
    (0..len)
        .map(|i| {
            let position = i as f64 * ratio;
            let index = position.floor() as usize;
            let fraction = (position - index as f64) as f32;
            let current = samples[index];
            let next = samples.get(index + 1).copied().unwrap_or(current);
            current + (next - current) * fraction
        })
        .collect()
}

pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Plays encoded audio on a background thread; failures are only logged.
pub fn play_audio(bytes: Vec<u8>) {
    std::thread::spawn(move || {
        if let Err(e) = play_blocking(bytes) {
            log::error!("Failed to play narration: {e}");
        }
    });
}

fn play_blocking(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
    let (_stream, stream_handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&stream_handle)?;
    let source = Decoder::new(Cursor::new(bytes))?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frames_are_averaged() {
        assert_eq!(downmix(&[0.5, 0.1, -0.2, 0.2], 2), vec![0.3, 0.0]);
    }

    #[test]
    fn downsampling_halves_length() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let resampled = resample(&samples, 32_000, 16_000);
        assert_eq!(resampled.len(), 50);
        assert_eq!(resampled[1], samples[2]);
    }

    #[test]
    fn wav_header_describes_mono_pcm() {
        let bytes = encode_wav(&[0.0, 0.5, -0.5, 1.5], SPEECH_SAMPLE_RATE).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SPEECH_SAMPLE_RATE);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16383, -16383, i16::MAX]);
    }
}
