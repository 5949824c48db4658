//! Port B pins, the only GPIO this part has.
//!
//! Pins are taken by value through the mode-changing constructors and hand
//! back `embedded-hal` digital handles. [`OpenDrain`] is the line
//! discipline the I2C master needs: `set_high` releases the pin to the
//! external pull-up, `set_low` drives it.

use core::cell::UnsafeCell;
use core::convert::Infallible;

use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

use super::critical::CriticalSection;

const PINB: *mut u8 = 0x36 as *mut u8;
const DDRB: *mut u8 = 0x37 as *mut u8;
const PORTB: *mut u8 = 0x38 as *mut u8;
const DIDR0: *mut u8 = 0x34 as *mut u8;
const PCMSK: *mut u8 = 0x35 as *mut u8;
const GIMSK: *mut u8 = 0x5B as *mut u8;

const PCIE: u8 = 0x20;

/// Port B pin index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinId {
    Pb0 = 0,
    Pb1 = 1,
    Pb2 = 2,
    Pb3 = 3,
    Pb4 = 4,
    Pb5 = 5,
}

impl PinId {
    fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// An unconfigured pin, converted into a mode-specific handle before use.
pub struct Pin {
    id: PinId,
}

impl Pin {
    pub fn new(id: PinId) -> Self {
        Pin { id }
    }

    /// Push-pull output, initially low.
    pub fn into_output(self) -> Output {
        unsafe {
            PORTB.write_volatile(PORTB.read_volatile() & !self.id.mask());
            DDRB.write_volatile(DDRB.read_volatile() | self.id.mask());
        }
        Output { id: self.id }
    }

    /// Push-pull output, initially high, the idle state a UART TX line
    /// must start from.
    pub fn into_output_high(self) -> Output {
        unsafe {
            PORTB.write_volatile(PORTB.read_volatile() | self.id.mask());
            DDRB.write_volatile(DDRB.read_volatile() | self.id.mask());
        }
        Output { id: self.id }
    }

    /// Floating input.
    pub fn into_input(self) -> Input {
        unsafe {
            DDRB.write_volatile(DDRB.read_volatile() & !self.id.mask());
            PORTB.write_volatile(PORTB.read_volatile() & !self.id.mask());
        }
        Input { id: self.id }
    }

    /// Input with the internal pull-up engaged.
    pub fn into_pull_up_input(self) -> Input {
        unsafe {
            DDRB.write_volatile(DDRB.read_volatile() & !self.id.mask());
            PORTB.write_volatile(PORTB.read_volatile() | self.id.mask());
        }
        Input { id: self.id }
    }

    /// Open-drain line, initially released.
    pub fn into_open_drain(self) -> OpenDrain {
        let mut pin = OpenDrain { id: self.id };
        let _ = pin.set_high();
        pin
    }

    /// Analog input: digital buffer disabled via DIDR0.
    pub fn into_analog(self) -> Analog {
        unsafe {
            DDRB.write_volatile(DDRB.read_volatile() & !self.id.mask());
            PORTB.write_volatile(PORTB.read_volatile() & !self.id.mask());
            DIDR0.write_volatile(DIDR0.read_volatile() | self.id.mask());
        }
        Analog { id: self.id }
    }
}

/// Push-pull output pin.
pub struct Output {
    id: PinId,
}

impl OutputPin for Output {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Infallible> {
        unsafe {
            PORTB.write_volatile(PORTB.read_volatile() | self.id.mask());
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        unsafe {
            PORTB.write_volatile(PORTB.read_volatile() & !self.id.mask());
        }
        Ok(())
    }
}

impl StatefulOutputPin for Output {
    fn is_set_high(&self) -> Result<bool, Infallible> {
        Ok(unsafe { PORTB.read_volatile() } & self.id.mask() != 0)
    }

    fn is_set_low(&self) -> Result<bool, Infallible> {
        self.is_set_high().map(|level| !level)
    }
}

impl ToggleableOutputPin for Output {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Infallible> {
        // Writing a one to PINB toggles the output latch.
        unsafe {
            PINB.write_volatile(self.id.mask());
        }
        Ok(())
    }
}

/// Input pin.
pub struct Input {
    id: PinId,
}

impl InputPin for Input {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(unsafe { PINB.read_volatile() } & self.id.mask() != 0)
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|level| !level)
    }
}

/// Open-drain pin: driven low or released to the pull-up, never driven
/// high.
pub struct OpenDrain {
    id: PinId,
}

impl OutputPin for OpenDrain {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Infallible> {
        unsafe {
            DDRB.write_volatile(DDRB.read_volatile() & !self.id.mask());
            PORTB.write_volatile(PORTB.read_volatile() | self.id.mask());
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        unsafe {
            DDRB.write_volatile(DDRB.read_volatile() | self.id.mask());
            PORTB.write_volatile(PORTB.read_volatile() & !self.id.mask());
        }
        Ok(())
    }
}

impl InputPin for OpenDrain {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(unsafe { PINB.read_volatile() } & self.id.mask() != 0)
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|level| !level)
    }
}

/// Pin configured for the ADC input mux.
pub struct Analog {
    #[allow(dead_code)]
    id: PinId,
}

// ---------------------------------------------------------------------------
// Pin-change interrupt dispatch

/// Callback invoked from the pin-change interrupt context.
pub type PinCallback = fn(PinId);

struct CallbackTable(UnsafeCell<[Option<PinCallback>; 6]>);

// Written only inside masked sections, read only from the single
// interrupt-handling context.
unsafe impl Sync for CallbackTable {}

struct SnapshotCell(UnsafeCell<u8>);

unsafe impl Sync for SnapshotCell {}

static PCINT_CALLBACKS: CallbackTable = CallbackTable(UnsafeCell::new([None; 6]));
static PCINT_PREVIOUS: SnapshotCell = SnapshotCell(UnsafeCell::new(0));

const PIN_IDS: [PinId; 6] = [
    PinId::Pb0,
    PinId::Pb1,
    PinId::Pb2,
    PinId::Pb3,
    PinId::Pb4,
    PinId::Pb5,
];

/// Register a pin-change callback and unmask the pin in PCMSK.
///
/// The table is process-wide and statically sized; registering again for
/// the same pin replaces the previous callback.
pub fn enable_pcint(pin: PinId, callback: PinCallback) {
    let _masked = CriticalSection::enter();
    unsafe {
        (*PCINT_CALLBACKS.0.get())[pin as usize] = Some(callback);
        PCMSK.write_volatile(PCMSK.read_volatile() | pin.mask());
        GIMSK.write_volatile(GIMSK.read_volatile() | PCIE);
        *PCINT_PREVIOUS.0.get() = PINB.read_volatile();
    }
}

/// Unregister a pin's callback; the pin-change interrupt is disabled
/// entirely once no pins remain masked in.
pub fn disable_pcint(pin: PinId) {
    let _masked = CriticalSection::enter();
    unsafe {
        (*PCINT_CALLBACKS.0.get())[pin as usize] = None;
        let pcmsk = PCMSK.read_volatile() & !pin.mask();
        PCMSK.write_volatile(pcmsk);
        if pcmsk == 0 {
            GIMSK.write_volatile(GIMSK.read_volatile() & !PCIE);
        }
    }
}

/// Dispatch callbacks for every pin that changed since the last call.
///
/// The part has a single shared pin-change vector; the application's
/// `PCINT0` handler calls this once per interrupt.
pub fn pcint_dispatch() {
    unsafe {
        let current = PINB.read_volatile();
        let changed = current ^ *PCINT_PREVIOUS.0.get();
        for pin in PIN_IDS {
            if changed & pin.mask() != 0 {
                if let Some(callback) = (*PCINT_CALLBACKS.0.get())[pin as usize] {
                    callback(pin);
                }
            }
        }
        *PCINT_PREVIOUS.0.get() = current;
    }
}
