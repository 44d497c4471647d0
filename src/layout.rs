//! The layer table: which [`Action`] fires for each logical key, per layer.
//!
//! Ported key-for-key from the `layer[][N_KEYS]` table in
//! `original_source/pico/teclado.c`. Each row below is one physical row of
//! the split board (5 left keys, then 5 right keys for the three finger
//! rows; 3 left thumb keys then 3 right thumb keys for the thumb cluster),
//! exactly as the source lays them out, so this table can be diffed against
//! it key by key.

use crate::action::{Action, Command, MouseMove};
use crate::config::N_KEYS;
use crate::keycode::{Buttons, KeyCode, Modifier};

/// Identifies one full row of [`Action`] in [`LAYERS`].
///
/// `QweAcc` from the source's `layer_id_t` enum is omitted: it was never
/// given a row in the source's layer table and nothing referenced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LayerId {
    Colemak,
    Acc,
    Qwerty,
    Rat,
    Nav,
    Num,
    Sym,
    Fun,
    Num2,
}

pub const N_LAYERS: usize = 9;

impl LayerId {
    pub const fn index(self) -> usize {
        match self {
            LayerId::Colemak => 0,
            LayerId::Acc => 1,
            LayerId::Qwerty => 2,
            LayerId::Rat => 3,
            LayerId::Nav => 4,
            LayerId::Num => 5,
            LayerId::Sym => 6,
            LayerId::Fun => 7,
            LayerId::Num2 => 8,
        }
    }

    pub const fn from_index(i: usize) -> Option<LayerId> {
        match i {
            0 => Some(LayerId::Colemak),
            1 => Some(LayerId::Acc),
            2 => Some(LayerId::Qwerty),
            3 => Some(LayerId::Rat),
            4 => Some(LayerId::Nav),
            5 => Some(LayerId::Num),
            6 => Some(LayerId::Sym),
            7 => Some(LayerId::Fun),
            8 => Some(LayerId::Num2),
            _ => None,
        }
    }
}

const NO: Action = Action::NoAction;

const fn key(k: KeyCode) -> Action {
    Action::Key(k)
}
const fn asc(unshifted: u8, shifted: u8) -> Action {
    Action::Ascii { unshifted, shifted }
}
const fn kom(k: KeyCode, m: Modifier) -> Action {
    Action::KeyOrMod { key: k, modifier: m }
}
const fn som(text: &'static str, m: Modifier) -> Action {
    Action::StrOrMod { text, modifier: m }
}
const fn kol(k: KeyCode, l: LayerId) -> Action {
    Action::KeyOrLayer { key: k, layer: l }
}
const fn la1(l: LayerId) -> Action {
    Action::OnceLayer(l)
}
const fn lck(l: LayerId) -> Action {
    Action::LockLayer(l)
}
const fn bas(l: LayerId) -> Action {
    Action::BaseLayer(l)
}
const fn modact(m: Modifier) -> Action {
    Action::Mod(m)
}
const fn com(c: Command) -> Action {
    Action::Command(c)
}
const fn mou(m: MouseMove) -> Action {
    Action::MouseMove(m)
}
const fn but(b: Buttons) -> Action {
    Action::MouseButton(b)
}

/// `[layer][key_id]`. `key_id` runs 0..36: fingers left-to-right, top row
/// to bottom row, left half then right half, followed by the 3 left and
/// then 3 right thumb keys. Physical-pin-to-`key_id` wiring lives in
/// `scanner.rs`.
pub static LAYERS: [[Action; N_KEYS]; N_LAYERS] = {
    let mut layers = [[NO; N_KEYS]; N_LAYERS];

    layers[LayerId::Colemak.index()] = [
        key(KeyCode::Q), key(KeyCode::W), key(KeyCode::F), key(KeyCode::P), key(KeyCode::B),
        kom(KeyCode::A, Modifier::LGUI), kom(KeyCode::R, Modifier::LALT), kom(KeyCode::S, Modifier::LCTRL), kom(KeyCode::T, Modifier::LSHIFT), key(KeyCode::G),
        key(KeyCode::Z), kom(KeyCode::X, Modifier::RALT), key(KeyCode::C), key(KeyCode::D), key(KeyCode::V),
        kol(KeyCode::ESCAPE, LayerId::Rat), kol(KeyCode::SPACE, LayerId::Nav), kol(KeyCode::TAB, LayerId::Num),
        key(KeyCode::J), key(KeyCode::L), key(KeyCode::U), key(KeyCode::Y), la1(LayerId::Acc),
        key(KeyCode::M), kom(KeyCode::N, Modifier::LSHIFT), kom(KeyCode::E, Modifier::LCTRL), kom(KeyCode::I, Modifier::LALT), kom(KeyCode::O, Modifier::LGUI),
        key(KeyCode::K), key(KeyCode::H), key(KeyCode::COMMA), kom(KeyCode::DOT, Modifier::RALT), key(KeyCode::SLASH),
        kol(KeyCode::ENTER, LayerId::Acc), kol(KeyCode::BACKSPACE, LayerId::Sym), kol(KeyCode::DELETE, LayerId::Fun),
    ];

    layers[LayerId::Acc.index()] = [
        asc(b'\'', b'`'), asc(b'"', b'~'), Action::Str("\u{ab}"), Action::Str("\u{bb}"), Action::Str("\u{aa}"),
        Action::Str("\u{e1}"), Action::Str("\u{e0}"), key(KeyCode::S), kom(KeyCode::T, Modifier::LSHIFT), key(KeyCode::G),
        Action::Str("\u{e2}"), Action::Str("\u{e3}"), Action::Str("\u{e7}"), key(KeyCode::D), key(KeyCode::V),
        kol(KeyCode::ESCAPE, LayerId::Rat), kol(KeyCode::SPACE, LayerId::Nav), kol(KeyCode::TAB, LayerId::Num),
        Action::Str("\u{ba}"), Action::Str("\u{20ac}"), Action::Str("\u{fa}"), key(KeyCode::Y), key(KeyCode::COMPOSE),
        key(KeyCode::M), som("\u{f1}", Modifier::LSHIFT), Action::Str("\u{e9}"), Action::Str("\u{ed}"), Action::Str("\u{f3}"),
        key(KeyCode::K), key(KeyCode::H), Action::Str("\u{ea}"), Action::Str("\u{f5}"), Action::Str("\u{f4}"),
        kol(KeyCode::ENTER, LayerId::Num2), kol(KeyCode::BACKSPACE, LayerId::Sym), kol(KeyCode::DELETE, LayerId::Fun),
    ];

    layers[LayerId::Qwerty.index()] = [
        key(KeyCode::Q), key(KeyCode::W), key(KeyCode::E), key(KeyCode::R), key(KeyCode::T),
        kom(KeyCode::A, Modifier::LGUI), kom(KeyCode::S, Modifier::LALT), kom(KeyCode::D, Modifier::LCTRL), kom(KeyCode::F, Modifier::LSHIFT), key(KeyCode::G),
        key(KeyCode::Z), kom(KeyCode::X, Modifier::RALT), key(KeyCode::C), key(KeyCode::V), key(KeyCode::B),
        kol(KeyCode::ESCAPE, LayerId::Rat), kol(KeyCode::SPACE, LayerId::Nav), kol(KeyCode::TAB, LayerId::Num),
        key(KeyCode::Y), key(KeyCode::U), key(KeyCode::I), key(KeyCode::O), key(KeyCode::P),
        key(KeyCode::H), kom(KeyCode::J, Modifier::LSHIFT), kom(KeyCode::K, Modifier::LCTRL), kom(KeyCode::L, Modifier::LALT), kom(KeyCode::SEMICOLON, Modifier::LGUI),
        key(KeyCode::N), key(KeyCode::M), key(KeyCode::COMMA), kom(KeyCode::DOT, Modifier::RALT), key(KeyCode::SLASH),
        kol(KeyCode::ENTER, LayerId::Num2), kol(KeyCode::BACKSPACE, LayerId::Sym), kol(KeyCode::DELETE, LayerId::Fun),
    ];

    layers[LayerId::Rat.index()] = [
        com(Command::Reset), NO, bas(LayerId::Qwerty), bas(LayerId::Colemak), NO,
        modact(Modifier::LGUI), modact(Modifier::LALT), modact(Modifier::LCTRL), modact(Modifier::LSHIFT), NO,
        NO, modact(Modifier::RALT), lck(LayerId::Fun), lck(LayerId::Rat), NO,
        NO, NO, NO,
        key(KeyCode::VOLUME_UP), mou(MouseMove::WheelLeft), mou(MouseMove::Up), mou(MouseMove::WheelRight), mou(MouseMove::WheelUp),
        key(KeyCode::VOLUME_DOWN), mou(MouseMove::Left), mou(MouseMove::Down), mou(MouseMove::Right), mou(MouseMove::WheelDown),
        key(KeyCode::MUTE), NO, NO, NO, NO,
        but(Buttons::RIGHT), but(Buttons::LEFT), but(Buttons::MIDDLE),
    ];

    layers[LayerId::Nav.index()] = [
        com(Command::UsbSide), NO, bas(LayerId::Qwerty), bas(LayerId::Colemak), NO,
        modact(Modifier::LGUI), modact(Modifier::LALT), modact(Modifier::LCTRL), modact(Modifier::LSHIFT), NO,
        NO, modact(Modifier::RALT), lck(LayerId::Sym), lck(LayerId::Nav), NO,
        NO, NO, NO,
        key(KeyCode::INSERT), key(KeyCode::HOME), key(KeyCode::UP), key(KeyCode::END), key(KeyCode::PAGE_UP),
        com(Command::WordLock), key(KeyCode::LEFT), key(KeyCode::DOWN), key(KeyCode::RIGHT), key(KeyCode::PAGE_DOWN),
        NO, NO, NO, NO, NO,
        key(KeyCode::ENTER), key(KeyCode::BACKSPACE), key(KeyCode::DELETE),
    ];

    layers[LayerId::Num.index()] = [
        NO, NO, bas(LayerId::Qwerty), bas(LayerId::Colemak), NO,
        modact(Modifier::LGUI), modact(Modifier::LALT), modact(Modifier::LCTRL), modact(Modifier::LSHIFT), NO,
        NO, modact(Modifier::RALT), lck(LayerId::Num2), lck(LayerId::Num), NO,
        NO, NO, NO,
        asc(b'*', b'|'), key(KeyCode::N7), key(KeyCode::N8), key(KeyCode::N9), asc(b'+', b'='),
        asc(b'/', b'\\'), key(KeyCode::N4), key(KeyCode::N5), key(KeyCode::N6), key(KeyCode::N0),
        asc(b'-', b'_'), key(KeyCode::N1), key(KeyCode::N2), key(KeyCode::N3), asc(b'.', b','),
        key(KeyCode::ENTER), key(KeyCode::BACKSPACE), key(KeyCode::DELETE),
    ];

    layers[LayerId::Sym.index()] = [
        asc(b'\'', b'/'), asc(b'"', b'?'), asc(b'[', b'{'), asc(b']', b'}'), asc(b'-', b'_'),
        asc(b';', b':'), asc(b'*', b'^'), asc(b'(', b'<'), asc(b')', b'>'), asc(b'=', b'+'),
        asc(b'`', b'~'), asc(b'!', b'$'), asc(b'@', b'%'), asc(b'#', b'&'), asc(b'\\', b'|'),
        key(KeyCode::ESCAPE), key(KeyCode::SPACE), key(KeyCode::TAB),
        NO, bas(LayerId::Colemak), bas(LayerId::Qwerty), NO, com(Command::UsbSide),
        NO, modact(Modifier::LSHIFT), modact(Modifier::LCTRL), modact(Modifier::LALT), modact(Modifier::LGUI),
        NO, lck(LayerId::Sym), lck(LayerId::Nav), modact(Modifier::RALT), NO,
        NO, NO, NO,
    ];

    layers[LayerId::Fun.index()] = [
        key(KeyCode::F12), key(KeyCode::F7), key(KeyCode::F8), key(KeyCode::F9), key(KeyCode::PRINT_SCREEN),
        key(KeyCode::F11), key(KeyCode::F4), key(KeyCode::F5), key(KeyCode::F6), key(KeyCode::SCROLL_LOCK),
        key(KeyCode::F10), key(KeyCode::F1), key(KeyCode::F2), key(KeyCode::F3), key(KeyCode::PAUSE),
        key(KeyCode::APPLICATION), key(KeyCode::SPACE), key(KeyCode::TAB),
        NO, bas(LayerId::Colemak), bas(LayerId::Qwerty), NO, NO,
        NO, modact(Modifier::LSHIFT), modact(Modifier::LCTRL), modact(Modifier::LALT), modact(Modifier::LGUI),
        NO, lck(LayerId::Fun), lck(LayerId::Rat), modact(Modifier::RALT), NO,
        NO, NO, NO,
    ];

    layers[LayerId::Num2.index()] = [
        key(KeyCode::LBRACKET), key(KeyCode::N7), key(KeyCode::N8), key(KeyCode::N9), key(KeyCode::RBRACKET),
        key(KeyCode::SEMICOLON), key(KeyCode::N4), key(KeyCode::N5), key(KeyCode::N6), key(KeyCode::EQUAL),
        key(KeyCode::GRAVE), key(KeyCode::N1), key(KeyCode::N2), key(KeyCode::N3), key(KeyCode::BACKSLASH),
        key(KeyCode::DOT), key(KeyCode::N0), key(KeyCode::MINUS),
        NO, bas(LayerId::Colemak), bas(LayerId::Qwerty), NO, NO,
        NO, modact(Modifier::LSHIFT), modact(Modifier::LCTRL), modact(Modifier::LALT), modact(Modifier::LGUI),
        NO, lck(LayerId::Num2), lck(LayerId::Num), modact(Modifier::RALT), NO,
        NO, NO, NO,
    ];

    layers
};

/// Whether any key in `layer_id` pumps mouse movement, used to decide if
/// the controller's mouse-report tick needs to stay armed while that layer
/// is active.
pub fn layer_has_mouse_movement_action(layer_id: LayerId) -> bool {
    LAYERS[layer_id.index()].iter().any(|a| a.is_mouse_movement_action())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layer_is_fully_populated() {
        for layer in LAYERS.iter() {
            assert_eq!(layer.len(), N_KEYS);
        }
    }

    #[test]
    fn rat_and_nav_layers_carry_mouse_actions() {
        assert!(layer_has_mouse_movement_action(LayerId::Rat));
        assert!(!layer_has_mouse_movement_action(LayerId::Colemak));
    }

    #[test]
    fn colemak_home_row_has_gui_alt_ctrl_shift_mods() {
        let row = LAYERS[LayerId::Colemak.index()];
        assert_eq!(row[5], Action::KeyOrMod { key: KeyCode::A, modifier: Modifier::LGUI });
        assert_eq!(row[8], Action::KeyOrMod { key: KeyCode::T, modifier: Modifier::LSHIFT });
    }
}
