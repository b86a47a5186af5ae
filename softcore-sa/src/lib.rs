//! # softcore-sa
//!
//! A `no_std` core for a soft-core audio spectrum analyzer: PCM16 WAV files
//! are streamed from storage into a bounded sample ring buffer, drained one
//! analysis frame at a time, Hann-windowed for an external FFT and converted
//! to PWM duty cycles for playback. Independently, a register-level driver
//! runs a dual AD7476A converter peripheral for live two-channel capture.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Buffering | [`ring_buffer`] | Bounded single-producer single-consumer sample queue |
//! | Format | [`wav`] | Header validation, channel layout, stereo downmix, paths |
//! | Storage | [`storage`] | `AudioStorage` trait over `embedded-io` files |
//! | Decode | [`stream`] | `WavStream`: chunked, backpressured WAV decoding |
//! | Analysis | [`frame`] | `FramePipeline`: frame drain, Hann window, PWM percent |
//! | Output | `playback` | `PwmPlayer` on an `embedded-hal` PWM channel (feature-gated) |
//! | Capture | `adc` | `Dual7476a` conversion controller (feature-gated) |
//!
//! ## Quick start
//!
//! ```ignore
//! use softcore_sa::frame::FramePipeline;
//! use softcore_sa::stream::WavStream;
//!
//! let mut stream = WavStream::new(sd_card, audio_file);
//! let mut pipeline = FramePipeline::new();
//!
//! while !stream.is_finished() {
//!     stream.feed()?;
//!     if let Ok(frame) = pipeline.drain_frame(&mut stream) {
//!         fft.process(&frame.analysis);
//!         player.load(frame);
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `adc7476` | yes | Dual AD7476A driver (requires `embedded-hal`) |
//! | `pwm` | yes | PWM playback (requires `embedded-hal`) |
//! | `defmt` | no | Log through `defmt` |
//!
//! ## Parameters
//!
//! - **Frame size:** 1024 samples ([`constants::FFT_SIZE`])
//! - **Ring buffer:** two frames
//! - **Raw chunk:** 8 frames of bytes ([`constants::MAX_CHUNK_BUFFER`])
//! - **Sample format:** PCM16 little-endian, mono or stereo (downmixed)

#![no_std]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod constants;
pub mod ring_buffer;
pub mod wav;
pub mod storage;
pub mod stream;
pub mod frame;

#[cfg(feature = "pwm")]
pub mod playback;

#[cfg(feature = "adc7476")]
pub mod adc;
