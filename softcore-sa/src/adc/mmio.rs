//! Register access for memory-mapped peripherals.

/// 32-bit register file addressed by byte offset.
pub trait RegisterBlock {
    fn read(&mut self, offset: usize) -> u32;

    fn write(&mut self, offset: usize, value: u32);
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for &mut T {
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Volatile access to a peripheral mapped at a fixed bus address.
pub struct Mmio {
    base: *mut u32,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the word-aligned address of the peripheral's register
    /// window, valid for volatile reads and writes for the lifetime of the
    /// returned value, and not accessed through any other `Mmio`.
    pub const unsafe fn new(base: usize) -> Self {
        Mmio {
            base: base as *mut u32,
        }
    }

    fn reg(&self, offset: usize) -> *mut u32 {
        self.base.wrapping_byte_add(offset)
    }
}

// SAFETY: the register window is a fixed bus address, exclusively owned per `new`.
unsafe impl Send for Mmio {}

impl RegisterBlock for Mmio {
    fn read(&mut self, offset: usize) -> u32 {
        // SAFETY: `offset` lies inside the window promised valid by `new`.
        unsafe { self.reg(offset).read_volatile() }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: as for `read`.
        unsafe { self.reg(offset).write_volatile(value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatile_access_uses_byte_offsets() {
        let mut window = [0u32; 5];
        let mut regs = unsafe { Mmio::new(window.as_mut_ptr() as usize) };

        regs.write(0x08, 0xDEAD_BEEF);
        regs.write(0x10, 3);
        assert_eq!(regs.read(0x08), 0xDEAD_BEEF);
        assert_eq!(regs.read(0x00), 0);
        assert_eq!(window, [0, 0, 0xDEAD_BEEF, 0, 3]);
    }
}
