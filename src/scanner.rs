//! Hardware key scanning: turns raw pin/ADC reads into `Key` updates.
//!
//! Ported from the `LocalReader` section of `original_source/pico/teclado.c`
//! (`localReader__initAnalogGPIO`/`localReader__initDigitalGPIO`,
//! `localReader_readAnalogKeys`/`localReader_readDigitalKeys`, and the
//! `detect_resistor`/`detect_connection`/`readKeyboardVersion` hardware
//! autodetection). The source keeps one `LocalReader` holding either a
//! multiplexed analog fan-in or a flat digital GPIO bank, picked at boot by
//! probing for a resistor or jumper that differs per board revision/side;
//! this module mirrors that split as two scanner kinds behind generic
//! embedded-hal pins, following the same genericity as
//! [`crate::direct_pin_matrix::DirectPinMatrix`].
//!
//! `hw_id_to_key_id` tables are transcribed verbatim from
//! `leftAnalogHwIdToSwId`/`rightAnalogHwIdToSwId`/`leftDigitalHwIdToSwId`/
//! `rightDigitalHwIdToSwId`; `-1` (here `None`) marks an unpopulated hardware
//! slot.

use embedded_hal::adc::{Channel, OneShot};
use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::config::{N_ANALOG_HW_KEYS, N_ANA_PINS, N_DIGITAL_HW_KEYS, N_SEL_PINS};
use crate::key::{Key, Side};

/// `leftAnalogHwIdToSwId`.
pub const LEFT_ANALOG_HW_ID_TO_KEY_ID: [Option<u8>; N_ANALOG_HW_KEYS] = [
    Some(17), Some(14), Some(9), Some(4), Some(16), Some(13), Some(8), Some(3), Some(15), Some(12),
    Some(7), Some(2), None, Some(11), Some(6), Some(1), None, Some(10), Some(5), Some(0),
];

/// `rightAnalogHwIdToSwId`.
pub const RIGHT_ANALOG_HW_ID_TO_KEY_ID: [Option<u8>; N_ANALOG_HW_KEYS] = [
    None, Some(32), Some(27), Some(22), None, Some(31), Some(26), Some(21), Some(34), Some(30),
    Some(25), Some(20), Some(35), Some(29), Some(24), Some(19), Some(33), Some(28), Some(23), Some(18),
];

/// `rightDigitalHwIdToSwId`.
pub const RIGHT_DIGITAL_HW_ID_TO_KEY_ID: [Option<u8>; N_DIGITAL_HW_KEYS] = [
    None, None, Some(18), Some(20), Some(19), Some(25), Some(21), Some(26), Some(23), Some(24), Some(30), Some(29), Some(31), Some(28), Some(22), Some(27),
    None, None, None, None, None, None, None, None, None, None, Some(32), Some(35), Some(34), Some(33), None, None,
];

/// `leftDigitalHwIdToSwId`.
pub const LEFT_DIGITAL_HW_ID_TO_KEY_ID: [Option<u8>; N_DIGITAL_HW_KEYS] = [
    None, None, Some(10), Some(13), Some(17), Some(16), Some(0), Some(6), Some(15), Some(14), Some(5), Some(11), Some(8), Some(12), Some(9), Some(7),
    None, None, None, None, None, None, None, None, None, None, Some(3), Some(1), Some(2), Some(4), None, None,
];

/// Minimum peak-to-peak raw ADC swing an analog key must exhibit before it's
/// allowed to report a value, ported from `key_setMinRawRange(key, 80)` in
/// `localReader_init`.
pub const ANALOG_MIN_RAW_RANGE: u16 = 80;

/// Which hardware revision/side was detected at boot, ported from the
/// `hw_version` numbering in `readKeyboardVersion` (0: left analog, 1: right
/// analog, 2: right digital/choc, 3: left digital/choc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BoardKind {
    LeftAnalog,
    RightAnalog,
    RightDigital,
    LeftDigital,
}

impl BoardKind {
    /// Ported from `readKeyboardVersion`'s `switch`.
    pub fn from_hw_version(hw_version: i8) -> Option<Self> {
        match hw_version {
            0 => Some(BoardKind::LeftAnalog),
            1 => Some(BoardKind::RightAnalog),
            2 => Some(BoardKind::RightDigital),
            3 => Some(BoardKind::LeftDigital),
            _ => None,
        }
    }

    pub fn side(self) -> Side {
        match self {
            BoardKind::LeftAnalog | BoardKind::LeftDigital => Side::Left,
            BoardKind::RightAnalog | BoardKind::RightDigital => Side::Right,
        }
    }

    pub fn is_analog(self) -> bool {
        matches!(self, BoardKind::LeftAnalog | BoardKind::RightAnalog)
    }

    pub fn hw_id_to_key_id(self) -> &'static [Option<u8>] {
        match self {
            BoardKind::LeftAnalog => &LEFT_ANALOG_HW_ID_TO_KEY_ID,
            BoardKind::RightAnalog => &RIGHT_ANALOG_HW_ID_TO_KEY_ID,
            BoardKind::RightDigital => &RIGHT_DIGITAL_HW_ID_TO_KEY_ID,
            BoardKind::LeftDigital => &LEFT_DIGITAL_HW_ID_TO_KEY_ID,
        }
    }
}

/// Reads back a probe result distinguishing the four board revisions.
/// Ported from `detect_resistor`/`detect_connection`; the two probes this
/// crate cares about are whether a resistor bridges two analog-capable pins
/// (choc/digital boards) and whether one pin reads low-then-high when a
/// neighboring pin is driven low-then-high (hall/analog boards). The actual
/// ADC/GPIO wiggling is board-specific and lives in `main.rs`; this just
/// picks the `BoardKind` out of the four yes/no answers, same order the
/// source tries them in.
pub fn discover_board_kind(
    resistor_28_29: bool,
    resistor_28_26: bool,
    connection_1_2: bool,
    connection_3_2: bool,
) -> Option<BoardKind> {
    if resistor_28_29 {
        return Some(BoardKind::RightDigital);
    }
    if resistor_28_26 {
        return Some(BoardKind::LeftDigital);
    }
    if connection_1_2 {
        return Some(BoardKind::RightAnalog);
    }
    if connection_3_2 {
        return Some(BoardKind::LeftAnalog);
    }
    None
}

/// Multiplexed analog key bank: `N_SEL_PINS` select lines fan out to
/// `N_ANA_PINS` ADC channels each, for `N_SEL_PINS * N_ANA_PINS` hardware
/// slots scanned in `sel`-major order. Ported from
/// `localReader_readAnalogKeys`.
pub struct AnalogScanner<SEL, PIN, ADC>
where
    SEL: OutputPin,
{
    sel_pins: [SEL; N_SEL_PINS],
    ana_pins: [PIN; N_ANA_PINS],
    hw_id_to_key_id: &'static [Option<u8>],
    _adc: core::marker::PhantomData<ADC>,
}

impl<SEL, PIN, ADC> AnalogScanner<SEL, PIN, ADC>
where
    SEL: OutputPin,
    PIN: Channel<ADC>,
{
    pub fn new(sel_pins: [SEL; N_SEL_PINS], ana_pins: [PIN; N_ANA_PINS], hw_id_to_key_id: &'static [Option<u8>]) -> Self {
        AnalogScanner { sel_pins, ana_pins, hw_id_to_key_id, _adc: core::marker::PhantomData }
    }

    /// Drives each select line high in turn and samples every ADC channel
    /// behind it, feeding results straight into the matching `Key`.
    /// `keys` is indexed by logical key id, same as `Key_keyWithId`.
    pub fn read<A, E>(&mut self, adc: &mut A, keys: &mut [Key]) -> Result<(), E>
    where
        A: OneShot<ADC, u16, PIN, Error = E>,
        PIN: Channel<ADC>,
    {
        let mut hw_id = 0usize;
        for sel in self.sel_pins.iter_mut() {
            let _ = sel.set_high();
            for ana in self.ana_pins.iter_mut() {
                let raw: u16 = nb::block!(adc.read(ana))?;
                if let Some(key_id) = self.hw_id_to_key_id[hw_id] {
                    if let Some(key) = keys.iter_mut().find(|k| k.id() == key_id) {
                        key.set_new_analog_raw(raw);
                    }
                }
                hw_id += 1;
            }
            let _ = sel.set_low();
        }
        Ok(())
    }
}

/// Flat digital GPIO bank: up to `N_DIGITAL_HW_KEYS` pull-up input pins read
/// as active-low. Ported from `localReader_readDigitalKeys`, which reads the
/// whole port in one `gpio_get_all()`; here pins are read one at a time
/// since embedded-hal has no equivalent bulk read.
pub struct DigitalScanner<PIN>
where
    PIN: InputPin,
{
    pins: [Option<PIN>; N_DIGITAL_HW_KEYS],
    hw_id_to_key_id: &'static [Option<u8>],
}

impl<PIN> DigitalScanner<PIN>
where
    PIN: InputPin,
{
    pub fn new(pins: [Option<PIN>; N_DIGITAL_HW_KEYS], hw_id_to_key_id: &'static [Option<u8>]) -> Self {
        DigitalScanner { pins, hw_id_to_key_id }
    }

    pub fn read<E>(&mut self, now: crate::clock::Instant, keys: &mut [Key]) -> Result<(), E>
    where
        PIN: InputPin<Error = E>,
    {
        for (bit, pin) in self.pins.iter().enumerate() {
            let Some(pin) = pin else { continue };
            let Some(key_id) = self.hw_id_to_key_id[bit] else { continue };
            let pressed = pin.is_low()?;
            if let Some(key) = keys.iter_mut().find(|k| k.id() == key_id) {
                key.set_new_digital_raw(now, pressed);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_kind_matches_hw_version_numbering() {
        assert_eq!(BoardKind::from_hw_version(0), Some(BoardKind::LeftAnalog));
        assert_eq!(BoardKind::from_hw_version(1), Some(BoardKind::RightAnalog));
        assert_eq!(BoardKind::from_hw_version(2), Some(BoardKind::RightDigital));
        assert_eq!(BoardKind::from_hw_version(3), Some(BoardKind::LeftDigital));
        assert_eq!(BoardKind::from_hw_version(-1), None);
    }

    #[test]
    fn board_kind_reports_side_and_analog_ness() {
        assert_eq!(BoardKind::LeftAnalog.side(), Side::Left);
        assert_eq!(BoardKind::RightDigital.side(), Side::Right);
        assert!(BoardKind::LeftAnalog.is_analog());
        assert!(!BoardKind::RightDigital.is_analog());
    }

    #[test]
    fn discover_prefers_resistor_probes_over_connection_probes() {
        assert_eq!(discover_board_kind(true, false, true, true), Some(BoardKind::RightDigital));
        assert_eq!(discover_board_kind(false, true, true, true), Some(BoardKind::LeftDigital));
        assert_eq!(discover_board_kind(false, false, true, false), Some(BoardKind::RightAnalog));
        assert_eq!(discover_board_kind(false, false, false, true), Some(BoardKind::LeftAnalog));
        assert_eq!(discover_board_kind(false, false, false, false), None);
    }

    #[test]
    fn left_analog_hw_id_table_has_two_unpopulated_slots() {
        assert_eq!(LEFT_ANALOG_HW_ID_TO_KEY_ID.iter().filter(|k| k.is_none()).count(), 2);
        assert_eq!(LEFT_ANALOG_HW_ID_TO_KEY_ID[0], Some(17));
        assert_eq!(LEFT_ANALOG_HW_ID_TO_KEY_ID[19], Some(0));
    }
}
