//! Real hardware access: mapped register aperture and busy delays

use std::time::Duration;

use crate::{Delay, RegisterIo};

/// Registers accessed through a mapped MMIO aperture
#[derive(Debug)]
pub struct MmioRegisters {
    base: *mut u8,
    len: usize,
}

// The aperture is plain device memory; callers serialize access.
unsafe impl Send for MmioRegisters {}
unsafe impl Sync for MmioRegisters {}

impl MmioRegisters {
    /// Wrap a mapped register aperture
    ///
    /// # Safety
    ///
    /// `base` must point to a mapping of at least `len` bytes of device
    /// registers that stays valid for the lifetime of the returned value.
    pub unsafe fn new(base: *mut u8, len: usize) -> Self {
        Self { base, len }
    }

    fn reg_ptr(&self, reg: u32) -> Option<*mut u32> {
        let offset = reg as usize;
        if offset % 4 != 0 || offset + 4 > self.len {
            return None;
        }
        Some(unsafe { self.base.add(offset) } as *mut u32)
    }
}

impl RegisterIo for MmioRegisters {
    fn read(&self, reg: u32) -> u32 {
        match self.reg_ptr(reg) {
            Some(ptr) => unsafe { core::ptr::read_volatile(ptr) },
            None => {
                tracing::error!("register read outside aperture: 0x{:04x}", reg);
                0
            }
        }
    }

    fn write(&self, reg: u32, value: u32) {
        match self.reg_ptr(reg) {
            Some(ptr) => unsafe { core::ptr::write_volatile(ptr, value) },
            None => tracing::error!("register write outside aperture: 0x{:04x}", reg),
        }
    }
}

/// Delay that sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepDelay;

impl Delay for SleepDelay {
    fn delay_us(&self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }
}
