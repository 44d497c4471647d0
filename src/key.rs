//! Per-key analog/digital filtering and press/release edge detection.
//!
//! Ported from the `struct key` plus `key_setNewAnalogRaw`,
//! `key_setNewDigitalRaw` and `key_setVal` in
//! `original_source/pico/teclado.c`. `Key` there keeps a `Controller *`
//! back-pointer and an intrusive `next` field and calls straight into the
//! controller from `key_processChanges`; here a `Key` only tracks its own
//! state and reports "did I just get pressed/released/change value" as
//! plain return values, which the controller (`controller.rs`) polls each
//! tick and acts on. No behavior changes, just no raw back-pointer.

use crate::clock::{Instant, Timer};
use crate::config::{DEBOUNCING_DELAY_MS, SENSITIVITY};

/// Which side of the board a key id belongs to, mirroring `keyboardSide`
/// and `key_side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Side {
    Left,
    Right,
}

pub fn side_of(key_id: u8) -> Side {
    if key_id <= 17 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Sensing hardware behind one key.
#[derive(Debug, Clone, Copy, defmt::Format)]
pub enum KeyKind {
    Analog(AnalogState),
    Digital(DigitalState),
}

#[derive(Debug, Clone, Copy, Default, defmt::Format)]
pub struct AnalogState {
    raw: u16,
    /// Minimum peak-to-peak range the filtered value must reach before
    /// this key is allowed to report anything, to reject sensor noise on
    /// unpopulated slots.
    min_raw_range: u16,
    min_raw_s: u32,
    max_raw_s: u32,
    /// `u32::MAX` is a sentinel for "not yet initialized", as in the
    /// source (which sizes it the same way).
    filtered_raw_s: u32,
}

#[derive(Debug, Clone, Copy, Default, defmt::Format)]
pub struct DigitalState {
    last_digital: bool,
    ignore_until: Timer,
}

/// One logical key: an id, a smoothed 0..=9 analog value, and a pressed
/// flag derived from that value crossing a hysteresis band around its own
/// recent min/max.
#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct Key {
    key_id: u8,
    val: i8,
    pressed: bool,
    val_changed: bool,
    press_changed: bool,
    min_val: i8,
    max_val: i8,
    kind: KeyKind,
}

impl Key {
    pub fn new_analog(key_id: u8, min_raw_range: u16) -> Self {
        Key {
            key_id,
            val: 0,
            pressed: false,
            val_changed: false,
            press_changed: false,
            min_val: 0,
            max_val: 0,
            kind: KeyKind::Analog(AnalogState {
                raw: 0,
                min_raw_range,
                min_raw_s: 0,
                max_raw_s: 0,
                filtered_raw_s: u32::MAX,
            }),
        }
    }

    pub fn new_digital(key_id: u8) -> Self {
        Key {
            key_id,
            val: 0,
            pressed: false,
            val_changed: false,
            press_changed: false,
            min_val: 0,
            max_val: 0,
            kind: KeyKind::Digital(DigitalState::default()),
        }
    }

    pub fn id(&self) -> u8 {
        self.key_id
    }

    pub fn side(&self) -> Side {
        side_of(self.key_id)
    }

    pub fn val(&self) -> i8 {
        self.val
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Clears and returns the "value changed since last call" flag.
    /// Driving code uses this to decide whether to relay the new analog
    /// value to the other half over the inter-half link.
    pub fn take_val_changed(&mut self) -> bool {
        core::mem::replace(&mut self.val_changed, false)
    }

    /// Clears and returns the "pressed state changed since last call"
    /// flag, together with the new pressed state, so the caller can drive
    /// `controller_keyPressed`/`controller_keyReleased` equivalents.
    pub fn take_press_changed(&mut self) -> Option<bool> {
        if core::mem::replace(&mut self.press_changed, false) {
            Some(self.pressed)
        } else {
            None
        }
    }

    /// Applies a value received from the other half over the inter-half
    /// link, same as `comm_task` calling `key_setVal` directly on the
    /// value out of a key-value message (already resolved through the
    /// peer's own filtering, so it's applied as-is rather than re-filtered).
    /// Values outside `0..=9` are a corrupted/malformed message and are
    /// dropped, mirroring `comm_task`'s `msgVal > 9` rejection.
    pub fn set_remote_val(&mut self, new_val: i8) {
        if !(0..=9).contains(&new_val) {
            return;
        }
        self.set_val(new_val);
    }

    fn set_val(&mut self, new_val: i8) {
        if new_val == self.val {
            return;
        }
        self.val = new_val;
        self.val_changed = true;

        if self.pressed {
            self.max_val = self.max_val.max(new_val);
            if self.max_val - new_val >= SENSITIVITY as i8 {
                self.min_val = new_val;
                self.pressed = false;
                self.press_changed = true;
            }
        } else {
            self.min_val = self.min_val.min(new_val);
            if new_val - self.min_val >= SENSITIVITY as i8 {
                self.max_val = new_val;
                self.pressed = true;
                self.press_changed = true;
            }
        }
    }

    fn filter_raw_value(state: &mut AnalogState) {
        if state.filtered_raw_s == u32::MAX {
            state.filtered_raw_s = (state.raw as u32) << 13;
            state.max_raw_s = state.filtered_raw_s;
            state.min_raw_s = state.filtered_raw_s;
            return;
        }
        filter_scaled(&mut state.filtered_raw_s, (state.raw as u32) << 13, 2);
        if state.filtered_raw_s < state.min_raw_s {
            filter(&mut state.min_raw_s, state.filtered_raw_s, 1);
        } else if state.filtered_raw_s > state.max_raw_s {
            filter(&mut state.max_raw_s, state.filtered_raw_s, 1);
        } else {
            let dist = (state.max_raw_s - state.min_raw_s) / 3;
            if state.filtered_raw_s - state.min_raw_s < dist {
                filter(&mut state.min_raw_s, state.filtered_raw_s, 13);
            } else if state.max_raw_s - state.filtered_raw_s < dist {
                filter(&mut state.max_raw_s, state.filtered_raw_s, 13);
            }
        }
    }

    /// Feeds a fresh ADC reading through the adaptive min/max filter and
    /// re-derives the 0..=9 value from where it sits in the recent range.
    pub fn set_new_analog_raw(&mut self, new_raw: u16) {
        let KeyKind::Analog(state) = &mut self.kind else {
            return;
        };
        state.raw = new_raw;
        Self::filter_raw_value(state);

        let min_raw = (state.min_raw_s >> 13) as i32;
        let max_raw = (state.max_raw_s >> 13) as i32;
        let raw_range = max_raw - min_raw;
        if raw_range < state.min_raw_range as i32 {
            return;
        }
        let old_val_90 = self.val as i32 * 10;
        let new_val_90 = ((new_raw as i32 - min_raw) * 100 / raw_range).clamp(0, 90);
        if (new_val_90 - old_val_90).abs() > 6 {
            let new_val = ((new_val_90 + 5) / 10) as i8;
            self.set_val(new_val);
        }
    }

    /// Debounces a raw GPIO level and turns it into a binary 0/9 value,
    /// reusing the same `set_val` hysteresis path as analog keys.
    pub fn set_new_digital_raw(&mut self, now: Instant, new_raw: bool) {
        let KeyKind::Digital(state) = &mut self.kind else {
            return;
        };
        if state.ignore_until.is_enabled() && state.ignore_until.elapsed(now) {
            state.ignore_until.disable();
        }
        if state.ignore_until.is_enabled() {
            return;
        }
        if new_raw == state.last_digital {
            return;
        }
        state.last_digital = new_raw;
        state.ignore_until.enable_ms(now, DEBOUNCING_DELAY_MS);
        self.set_val(if new_raw { 9 } else { 0 });
    }
}

fn filter(old_scaled: &mut u32, new_scaled: u32, weight: u8) {
    *old_scaled = (*old_scaled).wrapping_add(new_scaled >> weight).wrapping_sub(*old_scaled >> weight);
}

fn filter_scaled(old_scaled: &mut u32, new_scaled: u32, weight: u8) {
    filter(old_scaled, new_scaled, weight);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_and_right_side_split_at_18() {
        assert_eq!(side_of(0), Side::Left);
        assert_eq!(side_of(17), Side::Left);
        assert_eq!(side_of(18), Side::Right);
        assert_eq!(side_of(35), Side::Right);
    }

    #[test]
    fn digital_key_debounces_and_reports_one_edge() {
        let mut k = Key::new_digital(0);
        let t0 = Instant::from_micros(1_000);
        k.set_new_digital_raw(t0, true);
        assert_eq!(k.take_press_changed(), Some(true));
        assert!(k.is_pressed());

        // bouncing within the debounce window is ignored
        let t1 = Instant::from_micros(1_500);
        k.set_new_digital_raw(t1, false);
        assert_eq!(k.take_press_changed(), None);
        assert!(k.is_pressed());

        let t2 = Instant::from_micros(1_000 + DEBOUNCING_DELAY_MS * 1000 + 1000);
        k.set_new_digital_raw(t2, false);
        assert_eq!(k.take_press_changed(), Some(false));
        assert!(!k.is_pressed());
    }

    #[test]
    fn analog_key_needs_enough_swing_before_reporting() {
        let mut k = Key::new_analog(18, 50);
        for raw in [100u16, 100, 100, 100, 100, 100, 100, 100] {
            k.set_new_analog_raw(raw);
        }
        assert!(!k.is_pressed());
        for raw in [100u16, 400, 800, 1200, 1600, 2000, 2400, 2800, 3200, 3600, 4000] {
            k.set_new_analog_raw(raw);
        }
        assert!(k.is_pressed());
    }

    #[test]
    fn remote_val_applies_hysteresis_and_rejects_out_of_range() {
        let mut k = Key::new_digital(20);
        k.set_remote_val(9);
        assert_eq!(k.take_press_changed(), Some(true));
        assert!(k.is_pressed());

        k.set_remote_val(10);
        assert_eq!(k.take_press_changed(), None);
        assert!(k.is_pressed());

        k.set_remote_val(0);
        assert_eq!(k.take_press_changed(), Some(false));
        assert!(!k.is_pressed());
    }
}
