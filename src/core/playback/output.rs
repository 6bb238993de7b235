//! Audio outputs driven by the playback consumer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use super::PlaybackError;
use crate::core::audio::AudioFormat;

/// Parameters announced by the `info` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
}

/// An open output device.
pub trait AudioOutput: Send {
    fn write(&mut self, payload: &[u8]) -> Result<(), PlaybackError>;

    /// Flush and release the device. Called exactly once.
    fn stop(&mut self) -> Result<(), PlaybackError>;
}

/// Opens a fresh output for each session.
pub trait OutputFactory: Send {
    fn open(&mut self, spec: &OutputSpec) -> Result<Box<dyn AudioOutput>, PlaybackError>;
}

// =============================================================================
// WAV file
// =============================================================================

/// Writes 16-bit little-endian PCM into a WAV file.
pub struct WavFileOutput {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    /// Odd byte left over from the previous payload
    carry: Option<u8>,
}

impl WavFileOutput {
    pub fn create(path: &std::path::Path, spec: &OutputSpec) -> Result<Self, PlaybackError> {
        if spec.format != AudioFormat::Wav {
            return Err(PlaybackError::DeviceInitFailed(format!(
                "WAV output cannot play {}",
                spec.format
            )));
        }
        let wav_spec = hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, wav_spec)
            .map_err(|e| PlaybackError::DeviceInitFailed(format!("{}: {e}", path.display())))?;
        Ok(Self {
            writer: Some(writer),
            carry: None,
        })
    }
}

impl AudioOutput for WavFileOutput {
    fn write(&mut self, payload: &[u8]) -> Result<(), PlaybackError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PlaybackError::Write("output already stopped".to_string()))?;

        let mut bytes = payload;
        if let Some(low) = self.carry.take() {
            let Some((&high, rest)) = bytes.split_first() else {
                self.carry = Some(low);
                return Ok(());
            };
            writer
                .write_sample(i16::from_le_bytes([low, high]))
                .map_err(|e| PlaybackError::Write(e.to_string()))?;
            bytes = rest;
        }

        let mut chunks = bytes.chunks_exact(2);
        for pair in &mut chunks {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|e| PlaybackError::Write(e.to_string()))?;
        }
        self.carry = chunks.remainder().first().copied();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        match self.writer.take() {
            Some(writer) => writer
                .finalize()
                .map_err(|e| PlaybackError::Write(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Opens a [`WavFileOutput`] at a fixed path.
pub struct WavFileFactory {
    path: PathBuf,
}

impl WavFileFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputFactory for WavFileFactory {
    fn open(&mut self, spec: &OutputSpec) -> Result<Box<dyn AudioOutput>, PlaybackError> {
        Ok(Box::new(WavFileOutput::create(&self.path, spec)?))
    }
}

// =============================================================================
// Raw PCM writer
// =============================================================================

/// Writes payloads verbatim into any [`Write`], e.g. stdout piped to a player.
pub struct PcmWriterOutput<W: Write + Send> {
    inner: W,
}

impl<W: Write + Send> PcmWriterOutput<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write + Send> AudioOutput for PcmWriterOutput<W> {
    fn write(&mut self, payload: &[u8]) -> Result<(), PlaybackError> {
        self.inner
            .write_all(payload)
            .map_err(|e| PlaybackError::Write(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.inner
            .flush()
            .map_err(|e| PlaybackError::Write(e.to_string()))
    }
}

/// Opens a [`PcmWriterOutput`] around a writer produced per session.
pub struct PcmWriterFactory<F> {
    make: F,
}

impl<F, W> PcmWriterFactory<F>
where
    F: FnMut() -> std::io::Result<W> + Send,
    W: Write + Send + 'static,
{
    pub fn new(make: F) -> Self {
        Self { make }
    }
}

impl<F, W> OutputFactory for PcmWriterFactory<F>
where
    F: FnMut() -> std::io::Result<W> + Send,
    W: Write + Send + 'static,
{
    fn open(&mut self, _spec: &OutputSpec) -> Result<Box<dyn AudioOutput>, PlaybackError> {
        let writer = (self.make)().map_err(|e| PlaybackError::DeviceInitFailed(e.to_string()))?;
        Ok(Box::new(PcmWriterOutput::new(writer)))
    }
}
