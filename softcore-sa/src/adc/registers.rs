//! Dual AD7476A converter peripheral register map.
//!
//! All registers are 32 bits wide and word aligned. DATA_A and DATA_B are
//! read-only and carry the 12-bit conversion result in their low half-word.

// ── Register offsets ───────────────────────────────────────────────────────

/// Control register.
/// - Bits 19:8: COUNT (multi-conversion total, 1..=4095)
/// - Bits  7:4: CLKDIV (SCLK = SYSCLK / (2 × (CLKDIV + 1)))
/// - Bit   2  : MULTI (1 = counted continuous conversions)
/// - Bit   1  : START (start pulse)
/// - Bit   0  : EN (enable engine)
pub const CTRL: usize = 0x00;

/// Status register (read-only).
pub const STATUS: usize = 0x04;

/// Channel A result (read-only).
pub const DATA_A: usize = 0x08;

/// Channel B result (read-only).
pub const DATA_B: usize = 0x0C;

/// Interrupt register.
/// - Bit 1: CLR (acknowledge pending interrupt)
/// - Bit 0: EN (interrupt enable)
pub const IRQ: usize = 0x10;

// ── CTRL bitfields ─────────────────────────────────────────────────────────

pub const CTRL_EN: u32 = 1 << 0;
pub const CTRL_START: u32 = 1 << 1;
pub const CTRL_MULTI: u32 = 1 << 2;

pub const CTRL_CLKDIV_LSB: u32 = 4;
pub const CTRL_CLKDIV_WIDTH: u32 = 4;
pub const CTRL_CLKDIV_MAX: u8 = (1 << CTRL_CLKDIV_WIDTH) - 1;

pub const CTRL_COUNT_LSB: u32 = 8;
pub const CTRL_COUNT_WIDTH: u32 = 12;
/// Largest conversion total the COUNT field can hold.
pub const CTRL_COUNT_MAX: u32 = (1 << CTRL_COUNT_WIDTH) - 1;

// ── IRQ bitfields ──────────────────────────────────────────────────────────

pub const IRQ_EN: u32 = 1 << 0;
pub const IRQ_CLR: u32 = 1 << 1;

/// Mask applied to DATA_A/DATA_B reads.
pub const DATA_MASK: u32 = 0xFFFF;
