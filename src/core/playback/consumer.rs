//! Turns a relay frame sequence into audio output.

use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, info, warn};

use super::output::{AudioOutput, OutputFactory, OutputSpec};
use super::PlaybackError;
use crate::core::audio::WAV_HEADER_LEN;
use crate::core::relay::{StreamFrame, StreamInfo};

/// How a playback session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed {
        transcript: String,
        audio_frames: usize,
        bytes_written: usize,
    },
    /// The relay answered from its cache; nothing was played
    Cached {
        transcript: String,
        audio_available: bool,
    },
    /// The relay reported an error. Anything already played is incomplete.
    Failed { message: String },
}

/// Whether the session continues after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done(PlaybackOutcome),
}

struct ActiveSession {
    device: Box<dyn AudioOutput>,
    transcript: String,
    audio_frames: usize,
    bytes_written: usize,
}

/// Client-side consumer of a relay session.
///
/// Reusable: every terminal frame releases the device and resets state.
pub struct PlaybackConsumer<F: OutputFactory> {
    factory: F,
    active: Option<ActiveSession>,
}

/// Drop the fixed-size container header carried by the first audio payload.
pub fn strip_header(first_payload: &[u8]) -> &[u8] {
    if first_payload.len() > WAV_HEADER_LEN {
        &first_payload[WAV_HEADER_LEN..]
    } else {
        first_payload
    }
}

impl<F: OutputFactory> PlaybackConsumer<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            active: None,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Whether an output device is currently open.
    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Process one frame.
    pub fn handle(&mut self, frame: StreamFrame) -> Result<Step, PlaybackError> {
        match frame {
            StreamFrame::Info(info) => {
                self.start(info)?;
                Ok(Step::Continue)
            }
            StreamFrame::Audio(payload) => {
                self.play(&payload)?;
                Ok(Step::Continue)
            }
            StreamFrame::Final => {
                let session = self
                    .active
                    .take()
                    .ok_or(PlaybackError::UnexpectedFrame("final before info"))?;
                let mut device = session.device;
                device.stop()?;
                info!(
                    audio_frames = session.audio_frames,
                    bytes = session.bytes_written,
                    "Playback finished"
                );
                Ok(Step::Done(PlaybackOutcome::Completed {
                    transcript: session.transcript,
                    audio_frames: session.audio_frames,
                    bytes_written: session.bytes_written,
                }))
            }
            StreamFrame::Error { message, .. } => {
                warn!(error = %message, "Relay reported an error");
                self.release();
                Ok(Step::Done(PlaybackOutcome::Failed { message }))
            }
            StreamFrame::Cached {
                transcript,
                audio_available,
                ..
            } => {
                self.release();
                Ok(Step::Done(PlaybackOutcome::Cached {
                    transcript,
                    audio_available,
                }))
            }
        }
    }

    /// Drive a whole session from a frame stream.
    pub async fn consume<S, E>(&mut self, frames: S) -> Result<PlaybackOutcome, PlaybackError>
    where
        S: Stream<Item = Result<StreamFrame, E>>,
        E: Display,
    {
        let mut frames = std::pin::pin!(frames);
        while let Some(frame) = frames.next().await {
            let frame = match frame {
                Ok(f) => f,
                Err(e) => {
                    self.release();
                    return Err(PlaybackError::Transport(e.to_string()));
                }
            };
            match self.handle(frame) {
                Ok(Step::Continue) => {}
                Ok(Step::Done(outcome)) => return Ok(outcome),
                Err(e) => {
                    self.release();
                    return Err(e);
                }
            }
        }
        self.release();
        Err(PlaybackError::Truncated)
    }

    fn start(&mut self, info: StreamInfo) -> Result<(), PlaybackError> {
        if self.active.is_some() {
            return Err(PlaybackError::UnexpectedFrame("second info frame"));
        }
        let spec = OutputSpec {
            sample_rate: info.sample_rate,
            channels: info.channel.channels(),
            format: info.format,
        };
        let device = self.factory.open(&spec).map_err(|e| match e {
            PlaybackError::DeviceInitFailed(_) => e,
            other => PlaybackError::DeviceInitFailed(other.to_string()),
        })?;
        debug!(sample_rate = spec.sample_rate, voice_id = %info.voice_id, "Output device opened");
        self.active = Some(ActiveSession {
            device,
            transcript: info.transcript,
            audio_frames: 0,
            bytes_written: 0,
        });
        Ok(())
    }

    fn play(&mut self, payload: &[u8]) -> Result<(), PlaybackError> {
        let session = self
            .active
            .as_mut()
            .ok_or(PlaybackError::UnexpectedFrame("audio before info"))?;
        let bytes = if session.audio_frames == 0 {
            strip_header(payload)
        } else {
            payload
        };
        session.device.write(bytes)?;
        session.audio_frames += 1;
        session.bytes_written += bytes.len();
        Ok(())
    }

    /// Stop the device, if any, ignoring errors.
    fn release(&mut self) {
        if let Some(mut session) = self.active.take()
            && let Err(e) = session.device.stop()
        {
            warn!(error = %e, "Failed to release output device");
        }
    }
}

impl<F: OutputFactory> Drop for PlaybackConsumer<F> {
    fn drop(&mut self) {
        self.release();
    }
}
