//! The set of things a key in the layout table can do.
//!
//! Ported from the `Action` tagged union and its `KEY`/`ASC`/`STR`/...
//! constructor macros in `original_source/pico/teclado.c`. The C source
//! pads every variant into one struct with an `action_type` discriminant;
//! a Rust enum carries that data natively; and rather than cutting the
//! layer table down, it is still expressed as one `Action` value per key,
//! matching the table in `layout.rs`.

use crate::keycode::{Buttons, KeyCode, Modifier};
use crate::layout::LayerId;

/// Direction an analog "mouse" key moves the pointer or wheel in, scaled by
/// the key's current analog value (see `key.rs` and `controller.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum MouseMove {
    Up,
    Down,
    Left,
    Right,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
}

/// Non-HID side effects a key can trigger, ported from the C source's
/// `command_action_t`'s inline `enum { RESET, WORDLOCK, USB_SIDE }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Command {
    /// Reboot into the bootloader / reset the MCU.
    Reset,
    /// Toggle word-lock (next word typed entirely in caps).
    WordLock,
    /// Force this half to take over (or give up) the USB-active role.
    UsbSide,
}

/// Whether holding an action (past the tap/hold threshold) changes its
/// meaning, and to what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum HoldType {
    None,
    Modifier,
    Layer,
}

/// A single key's behavior in one layer of the layout table.
///
/// `KeyOrMod`/`StrOrMod`/`KeyOrLayer`/`StrOrLayer` are "dual" actions: a
/// short tap performs the first behavior, a hold (past
/// `config::HOLD_DELAY_MS`) performs the second. The controller picks
/// between them via `tap_action`/`hold_action` below rather than testing
/// the variant directly, same split the source makes in
/// `action_tapAction`/`action_holdAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Action {
    NoAction,
    Key(KeyCode),
    /// Sends the keycode for an ASCII char: `shifted` if Shift is currently
    /// held, `unshifted` otherwise.
    Ascii { unshifted: u8, shifted: u8 },
    /// Types a literal UTF-8 string, one codepoint at a time.
    Str(&'static str),
    Mod(Modifier),
    KeyOrMod { key: KeyCode, modifier: Modifier },
    StrOrMod { text: &'static str, modifier: Modifier },
    KeyOrLayer { key: KeyCode, layer: LayerId },
    StrOrLayer { text: &'static str, layer: LayerId },
    /// Switches the active layer until something switches it back.
    Layer(LayerId),
    /// Switches the active layer for as long as the key is held.
    HoldLayer(LayerId),
    /// Switches the active layer for exactly one subsequent keypress.
    OnceLayer(LayerId),
    /// Switches the active layer, and becomes the new base layer if tapped
    /// twice within `config::LOCK_DELAY_MS`.
    LockLayer(LayerId),
    BaseLayer(LayerId),
    Command(Command),
    MouseMove(MouseMove),
    MouseButton(Buttons),

    // Auxiliary actions, only ever installed as a key's release action by
    // `controller.rs`, never placed directly in the layout table.
    RelKey(KeyCode),
    RelAscii(u8),
    RelMod(Modifier),
    RelLayer,
    RelOnceLayer,
    RelButton(Buttons),
}

impl Action {
    pub fn hold_type(self) -> HoldType {
        match self {
            Action::KeyOrMod { .. } | Action::StrOrMod { .. } => HoldType::Modifier,
            Action::KeyOrLayer { .. } | Action::StrOrLayer { .. } => HoldType::Layer,
            _ => HoldType::None,
        }
    }

    /// Keys whose press is echoed straight into a keycode (rather than
    /// going through the unicode-typing path) get their own release
    /// action rather than an all-keys-up on every keystroke.
    pub fn is_typing_action(self) -> bool {
        matches!(self, Action::Key(_) | Action::Ascii { .. })
    }

    pub fn is_mouse_movement_action(self) -> bool {
        matches!(self, Action::MouseMove(_))
    }

    /// What a short tap of this action does. Dual actions resolve to their
    /// tap half; everything else is unchanged.
    pub fn tap_action(self) -> Action {
        match self {
            Action::KeyOrMod { key, .. } => Action::Key(key),
            Action::StrOrMod { text, .. } => Action::Str(text),
            Action::KeyOrLayer { key, .. } => Action::Key(key),
            Action::StrOrLayer { text, .. } => Action::Str(text),
            other => other,
        }
    }

    /// What holding this action past the hold threshold does.
    pub fn hold_action(self) -> Action {
        match self {
            Action::KeyOrMod { modifier, .. } => Action::Mod(modifier),
            Action::StrOrMod { modifier, .. } => Action::Mod(modifier),
            Action::KeyOrLayer { layer, .. } => Action::HoldLayer(layer),
            Action::StrOrLayer { layer, .. } => Action::HoldLayer(layer),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_action_splits_into_tap_and_hold() {
        let a = Action::KeyOrMod { key: KeyCode::A, modifier: Modifier::LGUI };
        assert_eq!(a.hold_type(), HoldType::Modifier);
        assert_eq!(a.tap_action(), Action::Key(KeyCode::A));
        assert_eq!(a.hold_action(), Action::Mod(Modifier::LGUI));
    }

    #[test]
    fn plain_action_is_its_own_tap_and_hold() {
        let a = Action::Key(KeyCode::Z);
        assert_eq!(a.hold_type(), HoldType::None);
        assert_eq!(a.tap_action(), a);
        assert_eq!(a.hold_action(), a);
    }

    #[test]
    fn typing_and_mouse_classification() {
        assert!(Action::Key(KeyCode::A).is_typing_action());
        assert!(Action::Ascii { unshifted: b'a', shifted: b'A' }.is_typing_action());
        assert!(!Action::Str("abc").is_typing_action());
        assert!(Action::MouseMove(MouseMove::Up).is_mouse_movement_action());
        assert!(!Action::MouseMove(MouseMove::Up).is_typing_action());
    }
}
