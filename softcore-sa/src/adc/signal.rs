//! Conversion-complete signalling between interrupt and foreground context.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::OutputPin;

/// The "results ready" indication raised by the interrupt handler once every
/// requested conversion has been stored.
///
/// The foreground must not read the result buffers until it observes the
/// signal, and must clear it before arming the next conversion.
pub trait CompletionSignal {
    type Error;

    fn raise(&mut self) -> Result<(), Self::Error>;

    fn clear(&mut self) -> Result<(), Self::Error>;
}

/// Completion signalled on a GPIO output line (high = complete), for an
/// external consumer wired to the pin.
pub struct GpioLine<P> {
    pin: P,
}

impl<P: OutputPin> GpioLine<P> {
    pub fn new(pin: P) -> Self {
        GpioLine { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> CompletionSignal for GpioLine<P> {
    type Error = P::Error;

    fn raise(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()
    }

    fn clear(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()
    }
}

/// In-memory completion flag shared between the interrupt handler and the
/// foreground loop.
///
/// Raising uses `Release` and observing uses `Acquire`, so result buffer
/// writes made before [`raise`](CompletionSignal::raise) are visible to a
/// foreground that has seen the flag set.
pub struct CompletionFlag(AtomicBool);

impl CompletionFlag {
    pub const fn new() -> Self {
        CompletionFlag(AtomicBool::new(false))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Acquire)
    }
}

impl Default for CompletionFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal for &CompletionFlag {
    type Error = Infallible;

    fn raise(&mut self) -> Result<(), Infallible> {
        self.0.store(true, Ordering::Release);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Infallible> {
        self.0.store(false, Ordering::Release);
        Ok(())
    }
}
