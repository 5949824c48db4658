//! Cycle-counted busy-wait time source.
//!
//! This part has no spare timer once Timer0 is generating PWM, so the
//! injectable clock the bit-banged drivers expect is approximated by a
//! calibrated spin loop. Accuracy is only as good as the spin: interrupts
//! stealing cycles make every wait run long, never short.

use core::time::Duration;

use embedded_hal::timer::{CountDown, Periodic};

const NANOS_PER_SEC: u64 = 1_000_000_000;

// The wait loop costs roughly this many CPU cycles per iteration.
const CYCLES_PER_SPIN: u64 = 4;

/// Busy-wait `CountDown` timer calibrated against the CPU clock.
pub struct Delay {
    cpu_hz: u32,
    spins: u32,
}

impl Delay {
    pub fn new(cpu_hz: u32) -> Self {
        Delay { cpu_hz, spins: 0 }
    }

    /// A timer pre-started with a fixed period, for drivers that only
    /// ever call `wait`: one tick per bus clock edge.
    pub fn periodic(cpu_hz: u32, period: Duration) -> Self {
        let mut delay = Delay::new(cpu_hz);
        delay.start(period);
        delay
    }

    /// Spin for `us` microseconds.
    pub fn delay_us(&mut self, us: u32) {
        self.start(Duration::from_micros(u64::from(us)));
        nb::block!(self.wait()).ok();
    }

    /// Spin for `ms` milliseconds.
    pub fn delay_ms(&mut self, ms: u16) {
        self.start(Duration::from_millis(u64::from(ms)));
        nb::block!(self.wait()).ok();
    }

    fn spins_for(&self, duration: Duration) -> u32 {
        let nanos = duration.as_nanos() as u64;
        let cycles = nanos * u64::from(self.cpu_hz) / NANOS_PER_SEC;
        (cycles / CYCLES_PER_SPIN).max(1) as u32
    }
}

impl CountDown for Delay {
    type Time = Duration;

    fn start<T: Into<Duration>>(&mut self, count: T) {
        self.spins = self.spins_for(count.into());
    }

    fn wait(&mut self) -> nb::Result<(), void::Void> {
        for _ in 0..self.spins {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

impl Periodic for Delay {}
