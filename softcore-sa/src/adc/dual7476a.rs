//! Dual AD7476A conversion controller.
//!
//! The peripheral drives two AD7476A converters from one clock and start
//! pulse and interrupts once per completed conversion pair. In multi mode the
//! hardware keeps sampling on its own; per interrupt the driver only stores
//! the pair and acknowledges the interrupt.
//!
//! ```text
//! Idle ──start_single()──► SingleArmed ──IRQ──────────────► Idle + signal
//! Idle ──start_multi(n)──► MultiArmed  ──IRQ × (n-1)──► MultiArmed
//!                                      ──IRQ (n-th)──► Idle + signal
//! ```
//!
//! # Example
//!
//! The driver is shared between the ADC interrupt and the foreground, here as
//! an RTIC shared resource:
//!
//! ```ignore
//! static DONE: CompletionFlag = CompletionFlag::new();
//!
//! #[shared]
//! struct Shared {
//!     adc: Dual7476a<'static, Mmio, &'static CompletionFlag>,
//! }
//!
//! // init
//! let regs = unsafe { Mmio::new(ADC_BASE) };
//! let mut adc = Dual7476a::new(regs, &DONE, ADC_CLOCK_DIVIDER)?;
//! adc.start_multi(buf_a, buf_b, 1024)?;
//!
//! #[task(binds = ADC, shared = [adc], priority = 2)]
//! fn adc_isr(mut cx: adc_isr::Context) {
//!     cx.shared.adc.lock(|adc| {
//!         let _ = adc.on_conversion_complete();
//!     });
//! }
//!
//! // foreground
//! while !DONE.take() {}
//! cx.shared.adc.lock(|adc| {
//!     let (a, b) = adc.results();
//!     process(a, b);
//! });
//! ```

use core::fmt;

use super::mmio::RegisterBlock;
use super::registers as reg;
use super::signal::CompletionSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError<E> {
    /// Clock divider does not fit the 4-bit CLKDIV field.
    ClockDivider(u8),
    /// Conversion total outside `1..=4095`.
    ConversionCount(u32),
    /// An output buffer cannot hold every requested conversion.
    BufferTooSmall { needed: usize, len: usize },
    /// The completion signal could not be driven.
    Signal(E),
}

impl<E: fmt::Debug> fmt::Display for AdcError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdcError::ClockDivider(d) => {
                write!(f, "clock divider {d} exceeds {}", reg::CTRL_CLKDIV_MAX)
            }
            AdcError::ConversionCount(n) => {
                write!(f, "conversion count {n} outside 1..={}", reg::CTRL_COUNT_MAX)
            }
            AdcError::BufferTooSmall { needed, len } => {
                write!(f, "buffer of {len} samples cannot hold {needed} conversions")
            }
            AdcError::Signal(e) => write!(f, "completion signal error: {e:?}"),
        }
    }
}

/// Armed state, derived from the control register shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionState {
    Idle,
    SingleArmed,
    MultiArmed,
}

/// Result of servicing one conversion interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Conversion {
    /// Multi mode: `completed` pairs stored so far, more to come.
    Pending { completed: u32 },
    /// All requested pairs stored and the completion signal raised.
    Complete,
    /// Interrupt taken while idle. Acknowledged, nothing stored.
    Spurious,
}

/// Driver for the dual AD7476A peripheral.
///
/// `'buf` is the lifetime of the caller's result buffers, which the driver
/// borrows between `start_*` and [`release_buffers()`](Self::release_buffers).
pub struct Dual7476a<'buf, R, S> {
    regs: R,
    signal: S,
    clock_divider: u8,
    /// Last value written to CTRL.
    control: u32,
    total: u32,
    /// Index of the next pair to store.
    count: u32,
    /// Pairs stored since the last start.
    filled: usize,
    channel_a: &'buf mut [u16],
    channel_b: &'buf mut [u16],
}

impl<'buf, R, S> Dual7476a<'buf, R, S>
where
    R: RegisterBlock,
    S: CompletionSignal,
{
    /// Enable the peripheral interrupt, program the clock divider with the
    /// engine stopped, and clear the completion signal.
    pub fn new(mut regs: R, mut signal: S, clock_divider: u8) -> Result<Self, AdcError<S::Error>> {
        if clock_divider > reg::CTRL_CLKDIV_MAX {
            return Err(AdcError::ClockDivider(clock_divider));
        }

        regs.write(reg::IRQ, reg::IRQ_EN);
        let control = (clock_divider as u32) << reg::CTRL_CLKDIV_LSB;
        regs.write(reg::CTRL, control);
        signal.clear().map_err(AdcError::Signal)?;
        debug!("adc init, clock divider {}", clock_divider);

        Ok(Dual7476a {
            regs,
            signal,
            clock_divider,
            control,
            total: 0,
            count: 0,
            filled: 0,
            channel_a: &mut [],
            channel_b: &mut [],
        })
    }

    fn divider_bits(&self) -> u32 {
        (self.clock_divider as u32) << reg::CTRL_CLKDIV_LSB
    }

    fn write_control(&mut self, value: u32) {
        self.control = value;
        self.regs.write(reg::CTRL, value);
    }

    /// Pulse IRQ.CLR, leaving the interrupt enabled.
    fn acknowledge(&mut self) {
        self.regs.write(reg::IRQ, reg::IRQ_EN | reg::IRQ_CLR);
        self.regs.write(reg::IRQ, reg::IRQ_EN);
    }

    fn read_pair(&mut self) -> (u16, u16) {
        let a = self.regs.read(reg::DATA_A) & reg::DATA_MASK;
        let b = self.regs.read(reg::DATA_B) & reg::DATA_MASK;
        (a as u16, b as u16)
    }

    /// Start one conversion pair. The results land in `a[0]` and `b[0]`.
    pub fn start_single(
        &mut self,
        a: &'buf mut [u16],
        b: &'buf mut [u16],
    ) -> Result<(), AdcError<S::Error>> {
        check_len(a, 1)?;
        check_len(b, 1)?;

        self.channel_a = a;
        self.channel_b = b;
        self.total = 1;
        self.count = 0;
        self.filled = 0;
        let control = self.divider_bits() | reg::CTRL_EN | reg::CTRL_START;
        self.write_control(control);
        debug!("adc single conversion armed");
        Ok(())
    }

    /// Start `total` counted conversions, stored at `a[0..total]` and
    /// `b[0..total]`.
    ///
    /// `total` is validated before anything is written: `0` or a value wider
    /// than the 12-bit COUNT field is rejected.
    pub fn start_multi(
        &mut self,
        a: &'buf mut [u16],
        b: &'buf mut [u16],
        total: u32,
    ) -> Result<(), AdcError<S::Error>> {
        if total == 0 || total > reg::CTRL_COUNT_MAX {
            warn!("adc conversion count {} rejected", total);
            return Err(AdcError::ConversionCount(total));
        }
        check_len(a, total as usize)?;
        check_len(b, total as usize)?;

        self.channel_a = a;
        self.channel_b = b;
        self.total = total;
        self.count = 0;
        self.filled = 0;
        let control = (total << reg::CTRL_COUNT_LSB)
            | self.divider_bits()
            | reg::CTRL_MULTI
            | reg::CTRL_START
            | reg::CTRL_EN;
        self.write_control(control);
        debug!("adc multi conversion armed, {} pairs", total);
        Ok(())
    }

    /// Service the conversion-complete interrupt.
    pub fn on_conversion_complete(&mut self) -> Result<Conversion, S::Error> {
        match self.state() {
            ConversionState::Idle => {
                self.acknowledge();
                Ok(Conversion::Spurious)
            }
            ConversionState::MultiArmed => {
                let (a, b) = self.read_pair();
                let idx = self.count as usize;
                if let (Some(da), Some(db)) = (self.channel_a.get_mut(idx), self.channel_b.get_mut(idx)) {
                    *da = a;
                    *db = b;
                }
                self.filled = idx + 1;

                if self.count + 1 >= self.total {
                    self.write_control(0);
                    self.acknowledge();
                    self.signal.raise()?;
                    debug!("adc multi conversion complete");
                    Ok(Conversion::Complete)
                } else {
                    self.count += 1;
                    self.acknowledge();
                    Ok(Conversion::Pending {
                        completed: self.count,
                    })
                }
            }
            ConversionState::SingleArmed => {
                self.write_control(0);
                self.acknowledge();
                let (a, b) = self.read_pair();
                if let (Some(da), Some(db)) = (self.channel_a.first_mut(), self.channel_b.first_mut()) {
                    *da = a;
                    *db = b;
                }
                self.filled = 1;
                self.signal.raise()?;
                debug!("adc single conversion complete");
                Ok(Conversion::Complete)
            }
        }
    }

    /// Clear the completion signal before arming the next conversion.
    pub fn clear_completion(&mut self) -> Result<(), S::Error> {
        self.signal.clear()
    }

    pub fn state(&self) -> ConversionState {
        if self.control & reg::CTRL_START == 0 {
            ConversionState::Idle
        } else if self.control & reg::CTRL_MULTI != 0 {
            ConversionState::MultiArmed
        } else {
            ConversionState::SingleArmed
        }
    }

    /// Last value written to the control register.
    pub fn control(&self) -> u32 {
        self.control
    }

    /// Zero-based index of the next pair in the current multi conversion.
    pub fn conversion_count(&self) -> u32 {
        self.count
    }

    pub fn total_conversions(&self) -> u32 {
        self.total
    }

    pub fn clock_divider(&self) -> u8 {
        self.clock_divider
    }

    /// The pairs stored so far. Only complete once the signal is raised.
    pub fn results(&self) -> (&[u16], &[u16]) {
        let n = self.filled.min(self.channel_a.len()).min(self.channel_b.len());
        (&self.channel_a[..n], &self.channel_b[..n])
    }

    /// Hand the result buffers back to the caller.
    pub fn release_buffers(&mut self) -> (&'buf mut [u16], &'buf mut [u16]) {
        self.filled = 0;
        (
            core::mem::take(&mut self.channel_a),
            core::mem::take(&mut self.channel_b),
        )
    }

    // ── Raw register reads ─────────────────────────────────────────────

    pub fn read_control(&mut self) -> u32 {
        self.regs.read(reg::CTRL)
    }

    pub fn read_status(&mut self) -> u32 {
        self.regs.read(reg::STATUS)
    }

    pub fn read_irq(&mut self) -> u32 {
        self.regs.read(reg::IRQ)
    }

    pub fn read_data_a(&mut self) -> u32 {
        self.regs.read(reg::DATA_A)
    }

    pub fn read_data_b(&mut self) -> u32 {
        self.regs.read(reg::DATA_B)
    }

    /// Release the register block and signal.
    pub fn free(self) -> (R, S) {
        (self.regs, self.signal)
    }
}

fn check_len<E>(buf: &[u16], needed: usize) -> Result<(), AdcError<E>> {
    if buf.len() < needed {
        return Err(AdcError::BufferTooSmall {
            needed,
            len: buf.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::signal::{CompletionFlag, GpioLine};
    use crate::constants::ADC_CLOCK_DIVIDER;
    use alloc::vec::Vec;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    // ── Mock register file ────────────────────────────────────────────

    /// Register file that records writes in chronological order.
    struct MockRegs {
        regs: [u32; 5],
        log: Vec<(usize, u32)>,
    }

    impl MockRegs {
        fn new() -> Self {
            Self {
                regs: [0; 5],
                log: Vec::new(),
            }
        }

        /// Latch a conversion result as the hardware would.
        fn latch(&mut self, a: u32, b: u32) {
            self.regs[reg::DATA_A / 4] = a;
            self.regs[reg::DATA_B / 4] = b;
        }
    }

    impl RegisterBlock for MockRegs {
        fn read(&mut self, offset: usize) -> u32 {
            self.regs[offset / 4]
        }

        fn write(&mut self, offset: usize, value: u32) {
            self.regs[offset / 4] = value;
            self.log.push((offset, value));
        }
    }

    const DIV: u8 = ADC_CLOCK_DIVIDER;
    const DIV_BITS: u32 = 0x40;

    type TestAdc<'a> = Dual7476a<'a, &'a mut MockRegs, &'a CompletionFlag>;

    fn init<'a>(regs: &'a mut MockRegs, flag: &'a CompletionFlag) -> TestAdc<'a> {
        Dual7476a::new(regs, flag, DIV).unwrap()
    }

    #[test]
    fn init_sequence() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();
        (&flag).raise().unwrap();

        let adc = init(&mut regs, &flag);
        assert_eq!(adc.state(), ConversionState::Idle);
        assert_eq!(adc.control(), DIV_BITS);
        let (regs, _) = adc.free();

        assert_eq!(regs.log, [(reg::IRQ, reg::IRQ_EN), (reg::CTRL, DIV_BITS)]);
        assert!(!flag.is_set());
    }

    #[test]
    fn clock_divider_out_of_range() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();
        let err = Dual7476a::new(&mut regs, &flag, 16).err();
        assert_eq!(err, Some(AdcError::ClockDivider(16)));
        assert!(regs.log.is_empty());
    }

    #[test]
    fn single_conversion() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();
        let mut a = [0u16; 1];
        let mut b = [0u16; 1];

        let mut adc = init(&mut regs, &flag);
        adc.start_single(&mut a, &mut b).unwrap();
        assert_eq!(adc.state(), ConversionState::SingleArmed);
        assert_eq!(adc.control(), DIV_BITS | reg::CTRL_EN | reg::CTRL_START);

        adc.regs.latch(0x0ABC, 0xFFFF_0123);
        assert_eq!(adc.on_conversion_complete(), Ok(Conversion::Complete));
        assert_eq!(adc.state(), ConversionState::Idle);
        assert_eq!(adc.control(), 0);
        assert!(flag.is_set());
        assert_eq!(adc.results(), (&[0x0ABC][..], &[0x0123][..]));

        let (regs, _) = adc.free();
        assert_eq!(
            regs.log[2..],
            [
                (reg::CTRL, DIV_BITS | reg::CTRL_EN | reg::CTRL_START),
                (reg::CTRL, 0),
                (reg::IRQ, reg::IRQ_EN | reg::IRQ_CLR),
                (reg::IRQ, reg::IRQ_EN),
            ]
        );
        assert_eq!((a[0], b[0]), (0x0ABC, 0x0123));
    }

    #[test]
    fn multi_conversion_of_three() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();
        let mut a = [0u16; 4];
        let mut b = [0u16; 4];

        let mut adc = init(&mut regs, &flag);
        adc.start_multi(&mut a, &mut b, 3).unwrap();
        assert_eq!(adc.state(), ConversionState::MultiArmed);
        let armed = (3 << 8) | DIV_BITS | reg::CTRL_MULTI | reg::CTRL_START | reg::CTRL_EN;
        assert_eq!(adc.control(), armed);
        assert_eq!(armed, 0x0000_0347);

        adc.regs.latch(100, 200);
        assert_eq!(adc.on_conversion_complete(), Ok(Conversion::Pending { completed: 1 }));
        assert!(!flag.is_set());
        assert_eq!(adc.conversion_count(), 1);

        adc.regs.latch(101, 201);
        assert_eq!(adc.on_conversion_complete(), Ok(Conversion::Pending { completed: 2 }));
        assert!(!flag.is_set());

        adc.regs.latch(102, 202);
        assert_eq!(adc.on_conversion_complete(), Ok(Conversion::Complete));
        assert!(flag.take());
        assert_eq!(adc.state(), ConversionState::Idle);
        assert_eq!(adc.conversion_count(), 2);
        assert_eq!(adc.total_conversions(), 3);
        assert_eq!(adc.results(), (&[100, 101, 102][..], &[200, 201, 202][..]));

        let (regs, _) = adc.free();
        let irq_pulses = regs
            .log
            .iter()
            .filter(|&&w| w == (reg::IRQ, reg::IRQ_EN | reg::IRQ_CLR))
            .count();
        assert_eq!(irq_pulses, 3);
        // Only the final interrupt stops the engine
        assert_eq!(regs.log.iter().filter(|&&w| w == (reg::CTRL, 0)).count(), 1);
        assert_eq!(a[..3], [100, 101, 102]);
        assert_eq!(a[3], 0);
    }

    #[test]
    fn multi_count_limits() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();
        let mut a = alloc::vec![0u16; 4095];
        let mut b = alloc::vec![0u16; 4095];

        let mut adc = init(&mut regs, &flag);
        let before = adc.control();

        assert_eq!(
            adc.start_multi(&mut [], &mut [], 0),
            Err(AdcError::ConversionCount(0))
        );
        assert_eq!(
            adc.start_multi(&mut [], &mut [], 4096),
            Err(AdcError::ConversionCount(4096))
        );
        assert_eq!(adc.control(), before);
        assert_eq!(adc.state(), ConversionState::Idle);

        adc.start_multi(&mut a, &mut b, 4095).unwrap();
        assert_eq!(adc.control() >> reg::CTRL_COUNT_LSB, 4095);

        let (regs, _) = adc.free();
        // init writes plus the one accepted start
        assert_eq!(regs.log.len(), 3);
    }

    #[test]
    fn undersized_buffers_rejected() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();
        let mut a = [0u16; 2];
        let mut b = [0u16; 3];

        let mut adc = init(&mut regs, &flag);
        assert_eq!(
            adc.start_multi(&mut a, &mut b, 3),
            Err(AdcError::BufferTooSmall { needed: 3, len: 2 })
        );
        assert_eq!(
            adc.start_single(&mut [], &mut []),
            Err(AdcError::BufferTooSmall { needed: 1, len: 0 })
        );
        assert_eq!(adc.state(), ConversionState::Idle);
    }

    #[test]
    fn restart_resets_progress() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();
        let mut a = [0u16; 3];
        let mut b = [0u16; 3];

        let mut adc = init(&mut regs, &flag);
        adc.start_multi(&mut a, &mut b, 3).unwrap();
        adc.on_conversion_complete().unwrap();
        adc.on_conversion_complete().unwrap();
        assert_eq!(adc.conversion_count(), 2);

        let (a, b) = adc.release_buffers();
        assert_eq!(adc.results(), (&[][..], &[][..]));
        adc.start_multi(a, b, 2).unwrap();
        assert_eq!(adc.conversion_count(), 0);
        assert_eq!(adc.on_conversion_complete(), Ok(Conversion::Pending { completed: 1 }));
        assert_eq!(adc.on_conversion_complete(), Ok(Conversion::Complete));
    }

    #[test]
    fn spurious_interrupt_is_acknowledged() {
        let mut regs = MockRegs::new();
        let flag = CompletionFlag::new();

        let mut adc = init(&mut regs, &flag);
        assert_eq!(adc.on_conversion_complete(), Ok(Conversion::Spurious));
        assert!(!flag.is_set());
        assert_eq!(adc.results(), (&[][..], &[][..]));

        let (regs, _) = adc.free();
        assert_eq!(regs.log[2..], [(reg::IRQ, reg::IRQ_EN | reg::IRQ_CLR), (reg::IRQ, reg::IRQ_EN)]);
    }

    #[test]
    fn raw_register_reads() {
        let mut regs = MockRegs::new();
        regs.regs[reg::STATUS / 4] = 0x5;
        let flag = CompletionFlag::new();

        let mut adc = init(&mut regs, &flag);
        adc.regs.latch(0x1234_0FFF, 7);
        assert_eq!(adc.read_control(), DIV_BITS);
        assert_eq!(adc.read_status(), 0x5);
        assert_eq!(adc.read_irq(), reg::IRQ_EN);
        assert_eq!(adc.read_data_a(), 0x1234_0FFF);
        assert_eq!(adc.read_data_b(), 7);
    }

    #[test]
    fn gpio_line_low_at_init_high_on_completion() {
        let pin = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut regs = MockRegs::new();
        let mut a = [0u16; 2];
        let mut b = [0u16; 2];

        let mut adc = Dual7476a::new(&mut regs, GpioLine::new(pin), DIV).unwrap();
        adc.start_multi(&mut a, &mut b, 2).unwrap();
        assert_eq!(adc.on_conversion_complete().unwrap(), Conversion::Pending { completed: 1 });
        assert_eq!(adc.on_conversion_complete().unwrap(), Conversion::Complete);
        adc.clear_completion().unwrap();

        let (_, line) = adc.free();
        let mut pin = line.into_inner();
        pin.done();
    }
}
