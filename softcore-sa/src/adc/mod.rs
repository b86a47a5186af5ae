//! Dual AD7476A converter peripheral.
//!
//! Register-level driver for the soft-core's dual-ADC block: clock divider
//! setup, single and counted multi conversions, and the per-interrupt
//! bookkeeping that fills two caller-provided sample buffers.
//!
//! # Feature gate
//!
//! This module is available when the `adc7476` feature is enabled (on by default).

mod dual7476a;
mod mmio;
pub mod registers;
mod signal;

pub use dual7476a::{AdcError, Conversion, ConversionState, Dual7476a};
pub use mmio::{Mmio, RegisterBlock};
pub use signal::{CompletionFlag, CompletionSignal, GpioLine};
