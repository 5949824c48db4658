//! TCA0 single-slope PWM on waveform outputs WO0–WO2.
//!
//! The period register is pinned to 255 so every channel behaves as an
//! 8-bit PWM, matching the Timer0 channels on the classic core.

use embedded_hal::PwmPin;

const CTRLA: *mut u8 = 0x0A00 as *mut u8;
const CTRLB: *mut u8 = 0x0A01 as *mut u8;
const PERL: *mut u8 = 0x0A26 as *mut u8;
const CMP0L: *mut u8 = 0x0A28 as *mut u8;
const CMP1L: *mut u8 = 0x0A2A as *mut u8;
const CMP2L: *mut u8 = 0x0A2C as *mut u8;

const ENABLE: u8 = 0x01;
const WGMODE_SINGLESLOPE: u8 = 0x03;
const CMP0EN: u8 = 0x10;
const CMP1EN: u8 = 0x20;
const CMP2EN: u8 = 0x40;

/// Timer clock prescaler, encoded as the CLKSEL field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div64 = 5,
    Div256 = 6,
    Div1024 = 7,
}

unsafe fn write_16(low: *mut u8, value: u16) {
    // Low byte goes through TEMP, the high-byte write commits both.
    low.write_volatile(value as u8);
    low.add(1).write_volatile((value >> 8) as u8);
}

unsafe fn read_16(low: *mut u8) -> u16 {
    let l = low.read_volatile() as u16;
    let h = low.add(1).read_volatile() as u16;
    l | (h << 8)
}

/// TCA0 configured for single-slope PWM, split into its channels.
pub struct Tca0Pwm;

impl Tca0Pwm {
    pub fn new(prescaler: Prescaler) -> Self {
        unsafe {
            CTRLB.write_volatile(WGMODE_SINGLESLOPE);
            write_16(PERL, u16::from(u8::MAX));
            CTRLA.write_volatile(((prescaler as u8) << 1) | ENABLE);
        }
        Tca0Pwm
    }

    /// Hand out the three channels; each starts disconnected with zero
    /// duty.
    pub fn split(self) -> (PwmWo0, PwmWo1, PwmWo2) {
        (PwmWo0, PwmWo1, PwmWo2)
    }
}

macro_rules! tca_channel {
    ($name:ident, $doc:expr, $cmp:ident, $en:ident) => {
        #[doc = $doc]
        pub struct $name;

        impl PwmPin for $name {
            type Duty = u8;

            fn enable(&mut self) {
                unsafe {
                    CTRLB.write_volatile(CTRLB.read_volatile() | $en);
                }
            }

            fn disable(&mut self) {
                unsafe {
                    CTRLB.write_volatile(CTRLB.read_volatile() & !$en);
                }
            }

            fn get_duty(&self) -> u8 {
                unsafe { read_16($cmp) as u8 }
            }

            fn get_max_duty(&self) -> u8 {
                u8::MAX
            }

            fn set_duty(&mut self, duty: u8) {
                unsafe {
                    write_16($cmp, u16::from(duty));
                }
            }
        }
    };
}

tca_channel!(PwmWo0, "Compare channel 0, waveform output WO0.", CMP0L, CMP0EN);
tca_channel!(PwmWo1, "Compare channel 1, waveform output WO1.", CMP1L, CMP1EN);
tca_channel!(PwmWo2, "Compare channel 2, waveform output WO2.", CMP2L, CMP2EN);
