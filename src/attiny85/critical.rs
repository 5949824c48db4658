//! Scoped interrupt masking.
//!
//! The bit-banged transfers and the shared callback table are only safe
//! against interrupt preemption, not concurrent callers; masking the
//! global interrupt flag for the span of a guard is all the locking this
//! single-threaded part needs.

const SREG: *mut u8 = 0x5F as *mut u8;
const SREG_I: u8 = 0x80;

/// Save the status register and clear the global interrupt flag.
pub fn mask_interrupts() -> u8 {
    unsafe {
        let saved = SREG.read_volatile();
        SREG.write_volatile(saved & !SREG_I);
        saved
    }
}

/// Write back a status register captured by [`mask_interrupts`].
///
/// Restores the caller's interrupt flag rather than forcing it on, so
/// nested sections compose.
pub fn restore_interrupts(saved: u8) {
    unsafe {
        SREG.write_volatile(saved);
    }
}

/// Interrupts stay masked while this guard lives; the saved flag is
/// restored on drop, on every exit path.
pub struct CriticalSection {
    saved: u8,
}

impl CriticalSection {
    pub fn enter() -> Self {
        CriticalSection {
            saved: mask_interrupts(),
        }
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        restore_interrupts(self.saved);
    }
}
