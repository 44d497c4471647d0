//! USB HID keycodes, modifiers and mouse buttons.
//!
//! Values are the USB HID usage IDs for the "Keyboard/Keypad" page, ported
//! from the `keycode_t` enum in `original_source/pico/teclado.c` (which in
//! turn mirrors the USB HID spec table). Kept as a flat `u8` newtype rather
//! than a fully exhaustive enum: the source leaves gaps in the usage table
//! (0x53..0x63 unused here, F13-F24 unused, etc.) and a sparse `u8` with
//! named constants is the natural fit, same as `keyberon::key_code::KeyCode`
//! does it for the teacher.

/// A USB HID keyboard usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub const NONE: KeyCode = KeyCode(0x00);

    pub const A: KeyCode = KeyCode(0x04);
    pub const B: KeyCode = KeyCode(0x05);
    pub const C: KeyCode = KeyCode(0x06);
    pub const D: KeyCode = KeyCode(0x07);
    pub const E: KeyCode = KeyCode(0x08);
    pub const F: KeyCode = KeyCode(0x09);
    pub const G: KeyCode = KeyCode(0x0a);
    pub const H: KeyCode = KeyCode(0x0b);
    pub const I: KeyCode = KeyCode(0x0c);
    pub const J: KeyCode = KeyCode(0x0d);
    pub const K: KeyCode = KeyCode(0x0e);
    pub const L: KeyCode = KeyCode(0x0f);
    pub const M: KeyCode = KeyCode(0x10);
    pub const N: KeyCode = KeyCode(0x11);
    pub const O: KeyCode = KeyCode(0x12);
    pub const P: KeyCode = KeyCode(0x13);
    pub const Q: KeyCode = KeyCode(0x14);
    pub const R: KeyCode = KeyCode(0x15);
    pub const S: KeyCode = KeyCode(0x16);
    pub const T: KeyCode = KeyCode(0x17);
    pub const U: KeyCode = KeyCode(0x18);
    pub const V: KeyCode = KeyCode(0x19);
    pub const W: KeyCode = KeyCode(0x1a);
    pub const X: KeyCode = KeyCode(0x1b);
    pub const Y: KeyCode = KeyCode(0x1c);
    pub const Z: KeyCode = KeyCode(0x1d);

    pub const N1: KeyCode = KeyCode(0x1e);
    pub const N2: KeyCode = KeyCode(0x1f);
    pub const N3: KeyCode = KeyCode(0x20);
    pub const N4: KeyCode = KeyCode(0x21);
    pub const N5: KeyCode = KeyCode(0x22);
    pub const N6: KeyCode = KeyCode(0x23);
    pub const N7: KeyCode = KeyCode(0x24);
    pub const N8: KeyCode = KeyCode(0x25);
    pub const N9: KeyCode = KeyCode(0x26);
    pub const N0: KeyCode = KeyCode(0x27);

    pub const ENTER: KeyCode = KeyCode(0x28);
    pub const ESCAPE: KeyCode = KeyCode(0x29);
    pub const BACKSPACE: KeyCode = KeyCode(0x2a);
    pub const TAB: KeyCode = KeyCode(0x2b);
    pub const SPACE: KeyCode = KeyCode(0x2c);
    pub const MINUS: KeyCode = KeyCode(0x2d);
    pub const EQUAL: KeyCode = KeyCode(0x2e);
    pub const LBRACKET: KeyCode = KeyCode(0x2f);
    pub const RBRACKET: KeyCode = KeyCode(0x30);
    pub const BACKSLASH: KeyCode = KeyCode(0x31);
    pub const NONUS_HASH: KeyCode = KeyCode(0x32);
    pub const SEMICOLON: KeyCode = KeyCode(0x33);
    pub const APOSTROPHE: KeyCode = KeyCode(0x34);
    pub const GRAVE: KeyCode = KeyCode(0x35);
    pub const COMMA: KeyCode = KeyCode(0x36);
    pub const DOT: KeyCode = KeyCode(0x37);
    pub const SLASH: KeyCode = KeyCode(0x38);
    pub const CAPS_LOCK: KeyCode = KeyCode(0x39);

    pub const F1: KeyCode = KeyCode(0x3a);
    pub const F2: KeyCode = KeyCode(0x3b);
    pub const F3: KeyCode = KeyCode(0x3c);
    pub const F4: KeyCode = KeyCode(0x3d);
    pub const F5: KeyCode = KeyCode(0x3e);
    pub const F6: KeyCode = KeyCode(0x3f);
    pub const F7: KeyCode = KeyCode(0x40);
    pub const F8: KeyCode = KeyCode(0x41);
    pub const F9: KeyCode = KeyCode(0x42);
    pub const F10: KeyCode = KeyCode(0x43);
    pub const F11: KeyCode = KeyCode(0x44);
    pub const F12: KeyCode = KeyCode(0x45);

    pub const PRINT_SCREEN: KeyCode = KeyCode(0x46);
    pub const SCROLL_LOCK: KeyCode = KeyCode(0x47);
    pub const PAUSE: KeyCode = KeyCode(0x48);
    pub const INSERT: KeyCode = KeyCode(0x49);
    pub const HOME: KeyCode = KeyCode(0x4a);
    pub const PAGE_UP: KeyCode = KeyCode(0x4b);
    pub const DELETE: KeyCode = KeyCode(0x4c);
    pub const END: KeyCode = KeyCode(0x4d);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x4e);
    pub const RIGHT: KeyCode = KeyCode(0x4f);
    pub const LEFT: KeyCode = KeyCode(0x50);
    pub const DOWN: KeyCode = KeyCode(0x51);
    pub const UP: KeyCode = KeyCode(0x52);

    pub const APPLICATION: KeyCode = KeyCode(0x65);

    pub const MUTE: KeyCode = KeyCode(0x7f);
    pub const VOLUME_UP: KeyCode = KeyCode(0x80);
    pub const VOLUME_DOWN: KeyCode = KeyCode(0x81);

    pub const LCTRL: KeyCode = KeyCode(0xe0);
    pub const LSHIFT: KeyCode = KeyCode(0xe1);
    pub const LALT: KeyCode = KeyCode(0xe2);
    pub const LGUI: KeyCode = KeyCode(0xe3);
    pub const RCTRL: KeyCode = KeyCode(0xe4);
    pub const RSHIFT: KeyCode = KeyCode(0xe5);
    pub const RALT: KeyCode = KeyCode(0xe6);
    pub const RGUI: KeyCode = KeyCode(0xe7);

    /// Alias for the compose key. Must be configured as such in the host OS
    /// input method (e.g. IBus "Compose Key" setting), same convention as
    /// the source's `K_COMPOSE`.
    pub const COMPOSE: KeyCode = KeyCode::RGUI;

    pub fn is_modifier(self) -> bool {
        (Self::LCTRL.0..=Self::RGUI.0).contains(&self.0)
    }

    /// Panics if `self` is not a modifier keycode; only call after
    /// `is_modifier` has been checked.
    pub fn to_modifier(self) -> Modifier {
        Modifier(1 << (self.0 - Self::LCTRL.0))
    }
}

/// Bitset of the eight modifier keys, matching the USB HID keyboard report
/// modifier byte bit-for-bit (bit0=LCtrl .. bit7=RGui).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub struct Modifier(pub u8);

impl Modifier {
    pub const NONE: Modifier = Modifier(0);
    pub const LCTRL: Modifier = Modifier(0b0000_0001);
    pub const LSHIFT: Modifier = Modifier(0b0000_0010);
    pub const LALT: Modifier = Modifier(0b0000_0100);
    pub const LGUI: Modifier = Modifier(0b0000_1000);
    pub const RCTRL: Modifier = Modifier(0b0001_0000);
    pub const RSHIFT: Modifier = Modifier(0b0010_0000);
    pub const RALT: Modifier = Modifier(0b0100_0000);
    pub const RGUI: Modifier = Modifier(0b1000_0000);

    pub fn union(self, other: Modifier) -> Modifier {
        Modifier(self.0 | other.0)
    }

    pub fn without(self, other: Modifier) -> Modifier {
        Modifier(self.0 & !other.0)
    }

    pub fn contains(self, other: Modifier) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl core::ops::BitOr for Modifier {
    type Output = Modifier;
    fn bitor(self, rhs: Modifier) -> Modifier {
        self.union(rhs)
    }
}

impl core::ops::BitXor for Modifier {
    type Output = Modifier;
    fn bitxor(self, rhs: Modifier) -> Modifier {
        Modifier(self.0 ^ rhs.0)
    }
}

/// Mouse button bitmap, matching the first five bits of a standard HID
/// mouse report's button byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub struct Buttons(pub u8);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);
    pub const LEFT: Buttons = Buttons(0b0000_0001);
    pub const RIGHT: Buttons = Buttons(0b0000_0010);
    pub const MIDDLE: Buttons = Buttons(0b0000_0100);
    pub const BACKWARD: Buttons = Buttons(0b0000_1000);
    pub const FORWARD: Buttons = Buttons(0b0001_0000);

    pub fn union(self, other: Buttons) -> Buttons {
        Buttons(self.0 | other.0)
    }

    pub fn without(self, other: Buttons) -> Buttons {
        Buttons(self.0 & !other.0)
    }
}

/// `(modifier, keycode)` pair used by the ASCII→keycode table, ported from
/// `mod_key`/`ascii_to_mod_key` in `original_source`.
#[derive(Debug, Clone, Copy)]
pub struct ModKey {
    pub modifier: Modifier,
    pub key: KeyCode,
}

const fn mk(modifier: Modifier, key: KeyCode) -> ModKey {
    ModKey { modifier, key }
}

const NO_KEY: ModKey = mk(Modifier::NONE, KeyCode::NONE);

/// US-layout ASCII (0..128) to `(modifier, keycode)` table. Must be changed
/// if the host OS keyboard layout is not US — same caveat the source's
/// `ascii_to_mod_key` carries.
pub static ASCII_TO_MOD_KEY: [ModKey; 128] = {
    let mut table = [NO_KEY; 128];
    table[0x08] = mk(Modifier::NONE, KeyCode::BACKSPACE);
    table[0x09] = mk(Modifier::NONE, KeyCode::TAB);
    table[0x0a] = mk(Modifier::NONE, KeyCode::ENTER);
    table[0x1b] = mk(Modifier::NONE, KeyCode::ESCAPE);
    table[b' ' as usize] = mk(Modifier::NONE, KeyCode::SPACE);
    table[b'!' as usize] = mk(Modifier::LSHIFT, KeyCode::N1);
    table[b'"' as usize] = mk(Modifier::LSHIFT, KeyCode::APOSTROPHE);
    table[b'#' as usize] = mk(Modifier::LSHIFT, KeyCode::N3);
    table[b'$' as usize] = mk(Modifier::LSHIFT, KeyCode::N4);
    table[b'%' as usize] = mk(Modifier::LSHIFT, KeyCode::N5);
    table[b'&' as usize] = mk(Modifier::LSHIFT, KeyCode::N7);
    table[b'\'' as usize] = mk(Modifier::NONE, KeyCode::APOSTROPHE);
    table[b'(' as usize] = mk(Modifier::LSHIFT, KeyCode::N9);
    table[b')' as usize] = mk(Modifier::LSHIFT, KeyCode::N0);
    table[b'*' as usize] = mk(Modifier::LSHIFT, KeyCode::N8);
    table[b'+' as usize] = mk(Modifier::LSHIFT, KeyCode::EQUAL);
    table[b',' as usize] = mk(Modifier::NONE, KeyCode::COMMA);
    table[b'-' as usize] = mk(Modifier::NONE, KeyCode::MINUS);
    table[b'.' as usize] = mk(Modifier::NONE, KeyCode::DOT);
    table[b'/' as usize] = mk(Modifier::NONE, KeyCode::SLASH);
    table[b'0' as usize] = mk(Modifier::NONE, KeyCode::N0);
    table[b'1' as usize] = mk(Modifier::NONE, KeyCode::N1);
    table[b'2' as usize] = mk(Modifier::NONE, KeyCode::N2);
    table[b'3' as usize] = mk(Modifier::NONE, KeyCode::N3);
    table[b'4' as usize] = mk(Modifier::NONE, KeyCode::N4);
    table[b'5' as usize] = mk(Modifier::NONE, KeyCode::N5);
    table[b'6' as usize] = mk(Modifier::NONE, KeyCode::N6);
    table[b'7' as usize] = mk(Modifier::NONE, KeyCode::N7);
    table[b'8' as usize] = mk(Modifier::NONE, KeyCode::N8);
    table[b'9' as usize] = mk(Modifier::NONE, KeyCode::N9);
    table[b':' as usize] = mk(Modifier::LSHIFT, KeyCode::SEMICOLON);
    table[b';' as usize] = mk(Modifier::NONE, KeyCode::SEMICOLON);
    table[b'<' as usize] = mk(Modifier::LSHIFT, KeyCode::COMMA);
    table[b'=' as usize] = mk(Modifier::NONE, KeyCode::EQUAL);
    table[b'>' as usize] = mk(Modifier::LSHIFT, KeyCode::DOT);
    table[b'?' as usize] = mk(Modifier::LSHIFT, KeyCode::SLASH);
    table[b'@' as usize] = mk(Modifier::LSHIFT, KeyCode::N2);

    let mut c = b'A';
    while c <= b'Z' {
        table[c as usize] = mk(Modifier::LSHIFT, KeyCode(KeyCode::A.0 + (c - b'A')));
        c += 1;
    }

    table[b'[' as usize] = mk(Modifier::NONE, KeyCode::LBRACKET);
    table[b'\\' as usize] = mk(Modifier::NONE, KeyCode::BACKSLASH);
    table[b']' as usize] = mk(Modifier::NONE, KeyCode::RBRACKET);
    table[b'^' as usize] = mk(Modifier::LSHIFT, KeyCode::N6);
    table[b'_' as usize] = mk(Modifier::LSHIFT, KeyCode::MINUS);
    table[b'`' as usize] = mk(Modifier::NONE, KeyCode::GRAVE);

    let mut c = b'a';
    while c <= b'z' {
        table[c as usize] = mk(Modifier::NONE, KeyCode(KeyCode::A.0 + (c - b'a')));
        c += 1;
    }

    table[b'{' as usize] = mk(Modifier::LSHIFT, KeyCode::LBRACKET);
    table[b'|' as usize] = mk(Modifier::LSHIFT, KeyCode::BACKSLASH);
    table[b'}' as usize] = mk(Modifier::LSHIFT, KeyCode::RBRACKET);
    table[b'~' as usize] = mk(Modifier::LSHIFT, KeyCode::GRAVE);
    table[0x7f] = mk(Modifier::NONE, KeyCode::DELETE);
    table
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_bit_roundtrips() {
        assert_eq!(KeyCode::LCTRL.to_modifier(), Modifier::LCTRL);
        assert_eq!(KeyCode::RGUI.to_modifier(), Modifier::RGUI);
        assert!(KeyCode::LALT.is_modifier());
        assert!(!KeyCode::A.is_modifier());
    }

    #[test]
    fn ascii_table_covers_letters_and_digits() {
        assert_eq!(ASCII_TO_MOD_KEY[b'a' as usize].key, KeyCode::A);
        assert_eq!(ASCII_TO_MOD_KEY[b'A' as usize].modifier, Modifier::LSHIFT);
        assert_eq!(ASCII_TO_MOD_KEY[b'5' as usize].key, KeyCode::N5);
    }
}
