//! Desktop microphone and speaker via cpal

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};

use super::{
    AudioDevice, AudioMode, CaptureHandle, CaptureOutcome, PlaybackHandle, PlaybackSource,
    Release,
};
use crate::blob::BlobStore;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// File name of the finalized recording in file mode
const RECORDING_FILE_NAME: &str = "recording.wav";

/// Where a finalized recording ends up
#[derive(Debug, Clone)]
pub enum RecordingSink {
    /// Written to `<dir>/recording.wav`, URI is `file://...`
    File(PathBuf),
    /// Registered as a transient `blob:` handle
    Blob(BlobStore),
}

/// Default input/output devices of the cpal host
pub struct CpalDevice {
    sink: RecordingSink,
}

impl CpalDevice {
    /// Create a device that finalizes recordings into `sink`
    #[must_use]
    pub const fn new(sink: RecordingSink) -> Self {
        Self { sink }
    }
}

#[async_trait(?Send)]
impl AudioDevice for CpalDevice {
    async fn request_permission(&self) -> Result<bool> {
        // Desktop hosts have no permission prompt; a default input device is the grant
        let host = cpal::default_host();
        Ok(host.default_input_device().is_some())
    }

    async fn configure_mode(&self, mode: AudioMode) -> Result<()> {
        tracing::debug!(?mode, "audio mode requested (no session control on desktop)");
        Ok(())
    }

    async fn acquire_capture(&self) -> Result<Box<dyn CaptureHandle>> {
        let capture = CpalCapture::start(self.sink.clone())?;
        Ok(Box::new(capture))
    }

    async fn acquire_playback(&self, source: &PlaybackSource) -> Result<Box<dyn PlaybackHandle>> {
        let encoded = match source {
            PlaybackSource::Blob { data, .. } => data.clone(),
            PlaybackSource::File(path) => tokio::fs::read(path).await?,
        };

        let (samples, sample_rate) = decode_mp3(&encoded)?;
        let playback = CpalPlayback::load(samples, sample_rate)?;
        Ok(Box::new(playback))
    }
}

/// Recording in progress on the default input device
struct CpalCapture {
    stream: Option<Stream>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sink: RecordingSink,
}

impl CpalCapture {
    fn start(sink: RecordingSink) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let ranges: Vec<SupportedStreamConfigRange> =
            device.supported_input_configs().map_err(audio_err)?.collect();
        let config = pick_config(&ranges, &[1], SAMPLE_RATE)
            .ok_or_else(|| Error::Audio("no mono 16kHz input config".to_string()))?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = writer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(audio_err)?;

        stream.play().map_err(audio_err)?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "audio capture started"
        );

        Ok(Self {
            stream: Some(stream),
            buffer,
            sink,
        })
    }

    fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl CaptureHandle for CpalCapture {
    async fn stop(&mut self) -> Result<CaptureOutcome> {
        self.release();

        let samples = self.take_buffer();
        if samples.is_empty() {
            return Ok(CaptureOutcome {
                uri: None,
                finished: true,
            });
        }

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let uri = match &self.sink {
            RecordingSink::File(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                let path = dir.join(RECORDING_FILE_NAME);
                tokio::fs::write(&path, &wav).await?;
                format!("file://{}", path.display())
            }
            RecordingSink::Blob(store) => store.create(wav),
        };

        tracing::debug!(samples = samples.len(), uri = %uri, "recording finalized");

        Ok(CaptureOutcome {
            uri: Some(uri),
            finished: true,
        })
    }
}

impl Release for CpalCapture {
    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }
}

/// Decoded reply bound to the default output device
struct CpalPlayback {
    samples: Arc<Vec<f32>>,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl CpalPlayback {
    fn load(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        // Mono preferred, stereo gets the same sample on both channels
        let ranges: Vec<SupportedStreamConfigRange> =
            device.supported_output_configs().map_err(audio_err)?.collect();
        let config = pick_config(&ranges, &[1, 2], sample_rate).ok_or_else(|| {
            Error::Audio(format!("no output config for {sample_rate} Hz"))
        })?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            samples = samples.len(),
            "reply loaded"
        );

        Ok(Self {
            samples: Arc::new(samples),
            config,
            stream: None,
        })
    }
}

#[async_trait(?Send)]
impl PlaybackHandle for CpalPlayback {
    async fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let channels = self.config.channels as usize;
        let samples = Arc::clone(&self.samples);
        let position = Arc::new(Mutex::new(0usize));

        let stream = device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut pos) = position.lock() else {
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(*pos).copied().unwrap_or(0.0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                        if *pos < samples.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(audio_err)?;

        stream.play().map_err(audio_err)?;
        self.stream = Some(stream);

        tracing::debug!("playback started");
        Ok(())
    }
}

impl Release for CpalPlayback {
    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("playback released");
        }
    }
}

fn audio_err(e: impl std::fmt::Display) -> Error {
    Error::Audio(e.to_string())
}

/// First range covering `rate`, trying channel counts in the given order
fn pick_config(
    ranges: &[SupportedStreamConfigRange],
    channels: &[u16],
    rate: u32,
) -> Option<StreamConfig> {
    let rate = SampleRate(rate);
    channels
        .iter()
        .find_map(|&wanted| {
            ranges.iter().find(|r| {
                r.channels() == wanted && (r.min_sample_rate()..=r.max_sample_rate()).contains(&rate)
            })
        })
        .map(|r| r.clone().with_sample_rate(rate).config())
}

/// Scale a float sample in [-1.0, 1.0] to 16-bit PCM
#[allow(clippy::cast_possible_truncation)]
fn pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

/// Encode mono samples as a 16-bit PCM WAV file
///
/// # Errors
///
/// Returns `Error::Audio` if the WAV writer fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let count = u32::try_from(samples.len()).map_err(audio_err)?;

    let mut wav = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut wav, spec).map_err(audio_err)?;
    let mut pcm = writer.get_i16_writer(count);
    for &sample in samples {
        pcm.write_sample(pcm16(sample));
    }
    pcm.flush().map_err(audio_err)?;
    writer.finalize().map_err(audio_err)?;

    Ok(wav.into_inner())
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns `Error::Decode` if the bytes are not MP3 audio
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate.is_none() {
                    sample_rate = u32::try_from(frame.sample_rate).ok();
                }

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| Error::Decode("no MP3 frames in reply".to_string()))?;
    Ok((samples, sample_rate))
}
