//! Outgoing HID event queue and the 6-slot active-keycode table it drains
//! into.
//!
//! Ported from `Keycodeq`/`struct usb`'s `keycodes[6]` table and the
//! `usb__send*`/`usb_task` family in `original_source/pico/teclado.c`.
//! Two asymmetric draining rules are carried over on purpose, not
//! smoothed into a single policy: a run of consecutive keycode or
//! modifier *presses* is drained in one go (`usb__sendKeycodePresses`/
//! `usb__sendModifierPresses` loop `while head == ...`), but a *release*
//! is drained one at a time (`usb__sendKeycodeReleases`/
//! `usb__sendModifierReleases` `break` after the first, despite the
//! `while`). A controller flooding presses coalesces into one report;
//! releases are paced out release-by-release.

use crate::config::KCQ_CAPACITY;
use crate::keycode::{Buttons, KeyCode, Modifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
enum QueueCommand {
    KeycodePress(KeyCode),
    KeycodeRelease(KeyCode),
    ModifierPress(Modifier),
    ModifierRelease(Modifier),
}

/// The HID keyboard report this half currently wants to send: 8 sent
/// modifier bits and up to 6 simultaneously active (non-modifier)
/// keycodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct KeyboardReport {
    pub modifiers: Modifier,
    pub keycodes: [KeyCode; 6],
}

/// A mouse HID report: a button bitmap plus four signed axes (vertical and
/// horizontal movement, vertical and horizontal wheel). Ported from
/// `usb_sendMouseReport`'s argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct MouseReport {
    pub buttons: Buttons,
    pub v: i8,
    pub h: i8,
    pub wv: i8,
    pub wh: i8,
}

/// Combines the event queue with the keyboard/mouse state it drains into.
/// A single key press/release may turn into a modifier update, a keycode
/// update, or (for modifier keycodes) fold into the modifier byte instead
/// of occupying one of the 6 keycode slots, same dispatch
/// `usb_pressKeycode`/`usb_releaseKeycode` do against `keycode_is_modifier`.
///
/// Mouse reports are unlike keyboard reports: the source sends one the
/// instant a button or movement changes (`usb_pressMouseButton`/
/// `usb_moveMouse` call `usb_sendMouseReport` directly) rather than
/// queueing and draining. `pending_mouse_report` mirrors that: each mouse
/// method overwrites it, and the driving loop collects it with
/// `take_mouse_report` once per tick.
pub struct HidOutput {
    queue: heapless::Deque<QueueCommand, KCQ_CAPACITY>,
    keycodes: heapless::Vec<KeyCode, 6>,
    live_modifiers: Modifier,
    sent_modifiers: Modifier,
    mouse_buttons: Buttons,
    pending_mouse_report: Option<MouseReport>,
}

impl Default for HidOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl HidOutput {
    pub fn new() -> Self {
        HidOutput {
            queue: heapless::Deque::new(),
            keycodes: heapless::Vec::new(),
            live_modifiers: Modifier::NONE,
            sent_modifiers: Modifier::NONE,
            mouse_buttons: Buttons::NONE,
            pending_mouse_report: None,
        }
    }

    /// Ported from `usb_pressMouseButton`.
    pub fn press_mouse_button(&mut self, button: Buttons) {
        self.mouse_buttons = self.mouse_buttons.union(button);
        self.pending_mouse_report = Some(MouseReport { buttons: self.mouse_buttons, v: 0, h: 0, wv: 0, wh: 0 });
    }

    /// Ported from `usb_releaseMouseButton`.
    pub fn release_mouse_button(&mut self, button: Buttons) {
        self.mouse_buttons = self.mouse_buttons.without(button);
        self.pending_mouse_report = Some(MouseReport { buttons: self.mouse_buttons, v: 0, h: 0, wv: 0, wh: 0 });
    }

    /// Ported from `usb_moveMouse`.
    pub fn move_mouse(&mut self, v: i8, h: i8, wv: i8, wh: i8) {
        self.pending_mouse_report = Some(MouseReport { buttons: self.mouse_buttons, v, h, wv, wh });
    }

    /// Drains the most recent mouse report, if any mouse state changed
    /// since the last call.
    pub fn take_mouse_report(&mut self) -> Option<MouseReport> {
        self.pending_mouse_report.take()
    }

    fn push(&mut self, cmd: QueueCommand) {
        if self.queue.push_back(cmd).is_err() {
            defmt::error!("hid output queue full, dropping event");
        }
    }

    pub fn press_keycode(&mut self, keycode: KeyCode) {
        if keycode.is_modifier() {
            self.press_modifier(keycode.to_modifier());
        } else {
            self.push(QueueCommand::KeycodePress(keycode));
        }
    }

    pub fn release_keycode(&mut self, keycode: KeyCode) {
        if keycode.is_modifier() {
            self.release_modifier(keycode.to_modifier());
        } else {
            self.push(QueueCommand::KeycodeRelease(keycode));
        }
    }

    pub fn press_modifier(&mut self, modifier: Modifier) {
        self.live_modifiers = self.live_modifiers.union(modifier);
        self.push(QueueCommand::ModifierPress(modifier));
    }

    pub fn release_modifier(&mut self, modifier: Modifier) {
        self.live_modifiers = self.live_modifiers.without(modifier);
        self.push(QueueCommand::ModifierRelease(modifier));
    }

    /// Sets the full modifier state at once, emitting only the bits that
    /// actually changed. Ported from `usb_setModifiers`.
    pub fn set_modifiers(&mut self, new_modifiers: Modifier) {
        let to_release = self.live_modifiers.without(new_modifiers);
        if !to_release.is_empty() {
            self.release_modifier(to_release);
        }
        let to_press = Modifier(new_modifiers.0 & !self.live_modifiers.0);
        if !to_press.is_empty() {
            self.press_modifier(to_press);
        }
    }

    fn insert_keycode(&mut self, keycode: KeyCode) {
        if self.keycodes.len() >= 6 {
            self.keycodes.remove(0);
        }
        let _ = self.keycodes.push(keycode);
    }

    fn remove_keycode(&mut self, keycode: KeyCode) {
        self.keycodes.retain(|&k| k != keycode);
    }

    /// Processes as much of the queue as one HID report update should
    /// carry, and returns the resulting report if anything changed. Call
    /// once per USB tick while this half owns the USB connection.
    pub fn pump(&mut self) -> Option<KeyboardReport> {
        match *self.queue.front()? {
            QueueCommand::KeycodePress(_) => {
                while let Some(&QueueCommand::KeycodePress(keycode)) = self.queue.front() {
                    self.queue.pop_front();
                    self.insert_keycode(keycode);
                }
            }
            QueueCommand::ModifierPress(_) => {
                while let Some(&QueueCommand::ModifierPress(modifier)) = self.queue.front() {
                    self.queue.pop_front();
                    self.sent_modifiers = self.sent_modifiers.union(modifier);
                }
            }
            QueueCommand::KeycodeRelease(keycode) => {
                self.queue.pop_front();
                self.remove_keycode(keycode);
            }
            QueueCommand::ModifierRelease(modifier) => {
                self.queue.pop_front();
                self.sent_modifiers = self.sent_modifiers.without(modifier);
            }
        }
        Some(self.report())
    }

    pub fn report(&self) -> KeyboardReport {
        let mut keycodes = [KeyCode::NONE; 6];
        for (slot, kc) in keycodes.iter_mut().zip(self.keycodes.iter()) {
            *slot = *kc;
        }
        KeyboardReport { modifiers: self.sent_modifiers, keycodes }
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_presses_drain_together() {
        let mut hid = HidOutput::new();
        hid.press_keycode(KeyCode::A);
        hid.press_keycode(KeyCode::B);
        let report = hid.pump().unwrap();
        assert_eq!(report.keycodes[0], KeyCode::A);
        assert_eq!(report.keycodes[1], KeyCode::B);
        assert!(!hid.has_pending());
    }

    #[test]
    fn releases_drain_one_at_a_time() {
        let mut hid = HidOutput::new();
        hid.press_keycode(KeyCode::A);
        hid.pump();
        hid.release_keycode(KeyCode::A);
        hid.press_keycode(KeyCode::B);
        hid.pump();
        let report = hid.pump().unwrap();
        assert_eq!(report.keycodes[0], KeyCode::NONE);
    }

    #[test]
    fn seventh_key_evicts_oldest() {
        let mut hid = HidOutput::new();
        for kc in [KeyCode::A, KeyCode::B, KeyCode::C, KeyCode::D, KeyCode::E, KeyCode::F, KeyCode::G] {
            hid.press_keycode(kc);
        }
        let report = hid.pump().unwrap();
        assert_eq!(report.keycodes, [KeyCode::B, KeyCode::C, KeyCode::D, KeyCode::E, KeyCode::F, KeyCode::G]);
    }

    #[test]
    fn modifier_keycode_folds_into_modifier_byte() {
        let mut hid = HidOutput::new();
        hid.press_keycode(KeyCode::LSHIFT);
        let report = hid.pump().unwrap();
        assert_eq!(report.modifiers, Modifier::LSHIFT);
        assert_eq!(report.keycodes, [KeyCode::NONE; 6]);
    }
}
