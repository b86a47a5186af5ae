//! Analysis frame preparation.
//!
//! [`FramePipeline::drain_frame()`] takes exactly one frame of `N` samples
//! out of a [`WavStream`]'s ring buffer and produces two views of it:
//!
//! - `analysis`: the samples as `f32`, Hann-windowed in place, ready for an
//!   external FFT.
//! - `pwm`: each sample as a PWM duty-cycle percentage (0.0 to 100.0) for
//!   audio playback.

use core::f32::consts::PI;
use core::fmt;

use crate::constants::FFT_SIZE;
use crate::storage::AudioStorage;
use crate::stream::WavStream;

/// Map a PCM16 sample onto a PWM duty-cycle percentage.
///
/// `-32768` maps to 0.0 and `32767` to 100.0.
pub fn pcm16_to_pwm_percent(sample: i16) -> f32 {
    let percent = 100.0 * (sample as f32 + 32768.0) / 65535.0;
    percent.clamp(0.0, 100.0)
}

/// Hann window coefficients, `w[i] = 0.5 * (1 - cos(2πi / (N - 1)))`.
pub struct HannWindow<const N: usize> {
    coeffs: [f32; N],
}

impl<const N: usize> HannWindow<N> {
    const LEN_OK: () = assert!(N >= 2, "Hann window needs at least two points");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::LEN_OK;

        let mut coeffs = [0.0f32; N];
        let denom = (N - 1) as f32;
        for (i, c) in coeffs.iter_mut().enumerate() {
            *c = 0.5 * (1.0 - libm::cosf(2.0 * PI * i as f32 / denom));
        }
        HannWindow { coeffs }
    }

    pub fn coefficients(&self) -> &[f32; N] {
        &self.coeffs
    }

    /// Multiply `samples` by the window in place.
    pub fn apply(&self, samples: &mut [f32; N]) {
        for (s, &w) in samples.iter_mut().zip(self.coeffs.iter()) {
            *s *= w;
        }
    }
}

impl<const N: usize> Default for HannWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// One prepared frame.
pub struct Frame<const N: usize> {
    /// Windowed samples.
    pub analysis: [f32; N],
    /// Duty-cycle percentages of the unwindowed samples.
    pub pwm: [f32; N],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// The stream has not signalled a full frame.
    NotReady,
    /// The ring buffer ran dry after `read` samples. The partial frame is
    /// discarded and the ready flag cleared.
    Underrun { read: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::NotReady => f.write_str("no frame ready"),
            FrameError::Underrun { read } => write!(f, "ring buffer underrun after {read} samples"),
        }
    }
}

/// Drains frames from a stream and windows them.
pub struct FramePipeline<const N: usize = FFT_SIZE> {
    window: HannWindow<N>,
    frame: Frame<N>,
}

impl<const N: usize> FramePipeline<N> {
    pub fn new() -> Self {
        FramePipeline {
            window: HannWindow::new(),
            frame: Frame {
                analysis: [0.0; N],
                pwm: [0.0; N],
            },
        }
    }

    pub fn window(&self) -> &HannWindow<N> {
        &self.window
    }

    /// The most recently drained frame.
    pub fn frame(&self) -> &Frame<N> {
        &self.frame
    }

    /// Drain one frame from `stream` if it has signalled one.
    ///
    /// Clearing the ready flag lets the stream decode the next frame and, once
    /// the file is closed and fewer than `N` samples remain, end the session.
    pub fn drain_frame<S: AudioStorage>(
        &mut self,
        stream: &mut WavStream<S, N>,
    ) -> Result<&Frame<N>, FrameError> {
        if !stream.frame_ready() {
            return Err(FrameError::NotReady);
        }
        let Some(ring) = stream.ring_mut() else {
            return Err(FrameError::NotReady);
        };

        let mut underrun = None;
        for i in 0..N {
            let Some(sample) = ring.read() else {
                underrun = Some(i);
                break;
            };
            self.frame.analysis[i] = sample.value as f32;
            self.frame.pwm[i] = pcm16_to_pwm_percent(sample.value);
        }

        stream.frame_consumed();
        if let Some(read) = underrun {
            warn!("frame underrun after {} samples", read);
            return Err(FrameError::Underrun { read });
        }

        self.window.apply(&mut self.frame.analysis);
        trace!("frame drained");
        Ok(&self.frame)
    }
}

impl<const N: usize> Default for FramePipeline<N> {
    fn default() -> Self {
        Self::new()
    }
}
