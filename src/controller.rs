//! Turns key press/release edges into HID output: layer switching, the
//! tap/hold and two-tap lock-layer gestures, word-lock typing, and the
//! unicode/compose/hex character pipeline.
//!
//! Ported from `struct controller` and its `controller_*`/`controller__*`
//! functions in `original_source/pico/teclado.c`. Two structural changes
//! from the source, both forced by not having a `Key *` pointer to carry
//! state on:
//!
//! - Each key's pending release action (`key_releaseAction`/
//!   `key_setReleaseAction` in the source) lives in `release_actions` here,
//!   indexed by key id, rather than on the `Key` itself (`key.rs` knows
//!   nothing about `Action`).
//! - `Key_keyWithId`/`Key_processKeyChanges` dispatch is replaced by the
//!   driving loop calling [`Controller::notify_key_edge`] once per key per
//!   tick with whatever [`crate::key::Key::take_press_changed`] returned,
//!   and [`Controller::task`] taking the current key values by reference
//!   for the mouse-movement scan.
//!
//! `self->holdType` in the source's struct is never read after being
//! zeroed in `controller_init`; it is not carried forward here.

use crate::action::{Action, Command, HoldType, MouseMove};
use crate::clock::{Instant, Timer};
use crate::config::{HOLD_DELAY_MS, LOCK_DELAY_MS, MOUSE_PERIOD_MS, N_KEYS};
use crate::hid_queue::HidOutput;
use crate::key::{side_of, Key, Side};
use crate::keycode::{ASCII_TO_MOD_KEY, KeyCode, Modifier};
use crate::keylist::KeyList;
use crate::layout::{layer_has_mouse_movement_action, LayerId, LAYERS};

/// Centi-mickeys of movement per analog value 0..=9, ported from the
/// `move`/`wheel` tables in `mouse_move_actuate`.
const MOVE_TABLE: [i32; 10] = [0, 85, 170, 260, 360, 480, 640, 880, 1280, 2000];
const WHEEL_TABLE: [i32; 10] = [0, 11, 22, 34, 48, 66, 92, 134, 208, 346];

/// Two-character (occasionally three, see below) mnemonic compose
/// sequences for the Latin-1 supplement block (0xA0..=0xFF), ported
/// verbatim from `compose_table` in the source. A handful of entries
/// ("^_a", "-- ", "^_o") are genuinely three characters; the source's
/// `char[3]` array relied on C silently dropping the null terminator when
/// a string literal exactly fills its array, a trick that doesn't survive
/// translation, so those are just three-character `&str`s here.
const COMPOSE_TABLE: [&str; 96] = [
    "  ", "!!", "|c", "-L", "ox", "=Y", "!^", "so", // A0 ¡¢£¤¥¦§
    "\" ", "OC", "^_a", "<<", "-,", "-- ", "OR", "-^", // A8 ¨©ª«¬­®¯
    "oo", "+-", "^2", "^3", "''", "mu", "P!", "^.", // B0 °±²³´µ¶·
    ",,", "^1", "^_o", ">>", "14", "12", "34", "??", // B8 ¸¹º»¼½¾¿
    "`A", "'A", "^A", "~A", "\"A", "*A", "AE", ",C", // C0 ÀÁÂÃÄÅÆÇ
    "`E", "'E", "^E", "\"E", "`I", "'I", "^I", "\"I", // C8 ÈÉÊËÌÍÎÏ
    "DH", "~N", "`O", "'O", "^O", "~O", "\"O", "xx", // D0 ÐÑÒÓÔÕÖ×
    "/O", "`U", "'U", "^U", "\"U", "'Y", "TH", "ss", // D8 ØÙÚÛÜÝÞß
    "`a", "'a", "^a", "~a", "\"a", "*a", "ae", ",c", // E0 àáâãäåæç
    "`e", "'e", "^e", "\"e", "`i", "'i", "^i", "\"i", // E8 èéêëìíîï
    "dh", "~n", "`o", "'o", "^o", "~o", "\"o", ":-", // F0 ðñòóôõö÷
    "/o", "`u", "'u", "^u", "\"u", "'y", "th", "\"y", // F8 øùúûüýþÿ
];

fn compose_for(uni: u32) -> Option<&'static str> {
    if !(0xA0..=0xFF).contains(&uni) {
        return None;
    }
    Some(COMPOSE_TABLE[(uni - 0xA0) as usize])
}

/// Very basic `á`→`Á` style uppercasing over the Latin-1 and Latin
/// Extended-A ranges. Ported from `unicode_to_upper`; the source's own
/// comment admits missing cases, left as-is.
fn unicode_to_upper(lower: u32) -> u32 {
    if (b'a' as u32..=b'z' as u32).contains(&lower) {
        return lower - 0x20;
    }
    if (0xe0..=0xfe).contains(&lower) && lower != 0xf7 {
        return lower - 0x20;
    }
    if lower == 0xff {
        return 0x178;
    }
    if (0x100..=0x137).contains(&lower) && lower & 1 == 1 {
        return lower - 1;
    }
    if (0x139..=0x148).contains(&lower) && lower & 1 == 0 {
        return lower - 1;
    }
    if (0x14a..=0x177).contains(&lower) && lower & 1 == 1 {
        return lower - 1;
    }
    if (0x179..=0x17e).contains(&lower) && lower & 1 == 0 {
        return lower - 1;
    }
    lower
}

fn uni_in_word(uni: u32) -> bool {
    if uni == '_' as u32 {
        return true;
    }
    if (b'0' as u32..=b'9' as u32).contains(&uni) {
        return true;
    }
    if (b'a' as u32..=b'z' as u32).contains(&uni) {
        return true;
    }
    if (b'A' as u32..=b'Z' as u32).contains(&uni) {
        return true;
    }
    uni != unicode_to_upper(uni)
}

fn keycode_in_word(keycode: KeyCode, shifted: bool) -> bool {
    if keycode == KeyCode::MINUS && shifted {
        return true;
    }
    if keycode == KeyCode::N0 && !shifted {
        return true;
    }
    if keycode.0 >= KeyCode::N1.0 && keycode.0 <= KeyCode::N9.0 && !shifted {
        return true;
    }
    if keycode.0 >= KeyCode::A.0 && keycode.0 <= KeyCode::Z.0 {
        return true;
    }
    keycode == KeyCode::BACKSPACE || keycode == KeyCode::DELETE
}

fn keycode_in_word_invert_shift(keycode: KeyCode) -> bool {
    keycode.0 >= KeyCode::A.0 && keycode.0 <= KeyCode::Z.0
}

/// All state needed to turn key edges into HID output: the active/base/
/// locked layer, the tap/hold and lock-layer gesture timers, accumulated
/// mouse movement, and the modifier/word-lock/caps-lock typing state.
pub struct Controller {
    current_layer: LayerId,
    base_layer: LayerId,
    lock_layer: Option<LayerId>,
    release_actions: [Action; N_KEYS],
    waiting_keys: KeyList,
    keys_being_held: KeyList,
    waiting_key_timer: Timer,
    hold_side: Option<Side>,
    move_mouse_timer: Timer,
    mouse_pos_v: i32,
    mouse_pos_h: i32,
    mouse_pos_wv: i32,
    mouse_pos_wh: i32,
    delayed_release_action: Action,
    modifiers: Modifier,
    word_locked: bool,
    caps_locked: bool,
    change_to_layer: Option<LayerId>,
    change_layer_timer: Timer,
    reset_requested: bool,
    usb_side_toggle_requested: bool,
}

impl Controller {
    pub fn new() -> Self {
        let mut c = Controller {
            current_layer: LayerId::Colemak,
            base_layer: LayerId::Colemak,
            lock_layer: None,
            release_actions: [Action::NoAction; N_KEYS],
            waiting_keys: KeyList::new(),
            keys_being_held: KeyList::new(),
            waiting_key_timer: Timer::new(),
            hold_side: None,
            move_mouse_timer: Timer::new(),
            mouse_pos_v: 0,
            mouse_pos_h: 0,
            mouse_pos_wv: 0,
            mouse_pos_wh: 0,
            delayed_release_action: Action::NoAction,
            modifiers: Modifier::NONE,
            word_locked: false,
            caps_locked: false,
            change_to_layer: None,
            change_layer_timer: Timer::new(),
            reset_requested: false,
            usb_side_toggle_requested: false,
        };
        c.set_current_layer(LayerId::Colemak, Instant::ZERO);
        c
    }

    pub fn current_layer(&self) -> LayerId {
        self.current_layer
    }

    pub fn base_layer(&self) -> LayerId {
        self.base_layer
    }

    pub fn word_locked(&self) -> bool {
        self.word_locked
    }

    pub fn caps_locked(&self) -> bool {
        self.caps_locked
    }

    /// Driven by the USB output-report callback for the Caps Lock LED bit.
    pub fn set_caps_lock(&mut self, val: bool) {
        self.caps_locked = val;
    }

    /// Clears and returns a reboot-into-bootloader request raised by a
    /// [`Command::Reset`] action.
    pub fn take_reset_requested(&mut self) -> bool {
        core::mem::replace(&mut self.reset_requested, false)
    }

    /// Clears and returns a USB-side toggle request raised by a
    /// [`Command::UsbSide`] action, for the driving loop to forward into
    /// `link::LinkStatus::toggle_usb`.
    pub fn take_usb_side_toggle_requested(&mut self) -> bool {
        core::mem::replace(&mut self.usb_side_toggle_requested, false)
    }

    fn is_shifted(&self) -> bool {
        self.modifiers.contains(Modifier::LSHIFT) || self.modifiers.contains(Modifier::RSHIFT)
    }

    fn set_word_lock(&mut self, new_val: bool) {
        self.word_locked = new_val;
    }

    fn set_current_layer(&mut self, layer: LayerId, now: Instant) {
        self.current_layer = layer;
        if layer_has_mouse_movement_action(layer) {
            self.move_mouse_timer.enable_ms(now, MOUSE_PERIOD_MS);
        } else {
            self.move_mouse_timer.disable();
        }
    }

    pub fn change_layer(&mut self, layer: LayerId, now: Instant) {
        if self.lock_layer.is_none() {
            self.set_current_layer(layer, now);
        }
    }

    /// Two-tap lock-layer gesture: the first tap within `LOCK_DELAY_MS`
    /// just marks intent; a second tap of the same layer within the
    /// window commits the lock. Tapping the already-locked layer again
    /// unlocks it and falls back to the base layer.
    pub fn lock_layer_action(&mut self, layer: LayerId, now: Instant) {
        if self.lock_layer == Some(layer) {
            self.lock_layer = None;
            self.set_current_layer(self.base_layer, now);
        } else if self.change_to_layer != Some(layer) {
            self.change_to_layer = Some(layer);
            self.change_layer_timer.enable_ms(now, LOCK_DELAY_MS);
        } else {
            self.lock_layer = Some(layer);
            self.set_current_layer(layer, now);
            self.change_layer_timer.disable();
        }
    }

    /// Same two-tap gesture, but committing changes the base layer instead
    /// of locking the current one.
    pub fn change_base_layer(&mut self, layer: LayerId, now: Instant) {
        if self.change_to_layer != Some(layer) {
            self.change_to_layer = Some(layer);
            self.change_layer_timer.enable_ms(now, LOCK_DELAY_MS);
        } else {
            self.base_layer = layer;
            self.change_layer_timer.disable();
        }
    }

    fn set_modifiers(&mut self, new_modifiers: Modifier, hid: &mut HidOutput) {
        self.modifiers = new_modifiers;
        hid.set_modifiers(new_modifiers);
    }

    fn add_modifiers(&mut self, m: Modifier, hid: &mut HidOutput) {
        self.set_modifiers(self.modifiers.union(m), hid);
    }

    fn remove_modifiers(&mut self, m: Modifier, hid: &mut HidOutput) {
        self.set_modifiers(self.modifiers.without(m), hid);
    }

    fn send_press_keycode(&mut self, keycode: KeyCode, hid: &mut HidOutput) {
        if self.word_locked && !keycode_in_word(keycode, self.is_shifted()) {
            self.set_word_lock(false);
        }
        if self.word_locked && keycode_in_word_invert_shift(keycode) {
            hid.set_modifiers(Modifier(self.modifiers.bits() ^ Modifier::LSHIFT.bits()));
        } else {
            hid.set_modifiers(self.modifiers);
        }
        hid.press_keycode(keycode);
        hid.set_modifiers(self.modifiers);
    }

    fn send_release_keycode(&mut self, keycode: KeyCode, hid: &mut HidOutput) {
        hid.set_modifiers(self.modifiers);
        hid.release_keycode(keycode);
    }

    pub fn press_keycode(&mut self, keycode: KeyCode, hid: &mut HidOutput) {
        if keycode.is_modifier() {
            self.add_modifiers(keycode.to_modifier(), hid);
        } else {
            self.send_press_keycode(keycode, hid);
        }
    }

    pub fn release_keycode(&mut self, keycode: KeyCode, hid: &mut HidOutput) {
        if keycode.is_modifier() {
            self.remove_modifiers(keycode.to_modifier(), hid);
        } else {
            self.send_release_keycode(keycode, hid);
        }
    }

    fn send_usb_press_ascii_char(&mut self, ch: u8, hid: &mut HidOutput) {
        let mk = ASCII_TO_MOD_KEY[ch as usize];
        if mk.key == KeyCode::NONE {
            return;
        }
        let mod_ = self.modifiers.without(Modifier::LSHIFT.union(Modifier::RSHIFT)).union(mk.modifier);
        hid.set_modifiers(mod_);
        hid.press_keycode(mk.key);
    }

    fn send_usb_release_ascii_char(&mut self, ch: u8, hid: &mut HidOutput) {
        let mk = ASCII_TO_MOD_KEY[ch as usize];
        if mk.key == KeyCode::NONE {
            return;
        }
        let mod_ = self.modifiers.without(Modifier::LSHIFT.union(Modifier::RSHIFT)).union(mk.modifier);
        hid.set_modifiers(mod_);
        hid.release_keycode(mk.key);
    }

    fn send_usb_hex_nibble(&mut self, h: u8, hid: &mut HidOutput) {
        let mut ch = h + b'0';
        if ch > b'9' {
            ch += b'a' - (b'9' + 1);
        }
        self.send_usb_press_ascii_char(ch, hid);
        self.send_usb_release_ascii_char(ch, hid);
    }

    fn send_usb_hex(&mut self, hex: u32, hid: &mut HidOutput) {
        let mut sent = false;
        for n in (0..8).rev() {
            let nib = ((hex >> (n * 4)) & 0b1111) as u8;
            if nib != 0 || sent || n == 0 {
                self.send_usb_hex_nibble(nib, hid);
                sent = true;
            }
        }
    }

    /// Sends one unicode codepoint: plain ASCII goes straight through the
    /// table, Latin-1 supplement goes through a Compose-key mnemonic, and
    /// anything else falls back to an IBus-style Ctrl-Shift-U hex entry.
    fn send_usb_unicode_char(&mut self, uni: u32, hid: &mut HidOutput) {
        if uni < 128 {
            self.send_usb_press_ascii_char(uni as u8, hid);
            self.send_usb_release_ascii_char(uni as u8, hid);
        } else if let Some(compose) = compose_for(uni) {
            hid.press_keycode(KeyCode::COMPOSE);
            hid.release_keycode(KeyCode::COMPOSE);
            for ch in compose.bytes() {
                self.send_usb_press_ascii_char(ch, hid);
                self.send_usb_release_ascii_char(ch, hid);
            }
        } else {
            self.set_modifiers(Modifier::RCTRL.union(Modifier::RSHIFT), hid);
            hid.press_keycode(KeyCode::U);
            hid.release_keycode(KeyCode::U);
            self.set_modifiers(Modifier::NONE, hid);
            self.send_usb_hex(uni, hid);
            self.send_usb_press_ascii_char(b'\n', hid);
            self.send_usb_release_ascii_char(b'\n', hid);
        }
    }

    /// Types a literal string one codepoint at a time, ported from
    /// `controller__sendUtf8Str`. The source walks raw UTF-8 bytes by
    /// hand; a `&str`'s `.chars()` already gives decoded codepoints, so
    /// that part of the port is just plain Rust.
    fn press_string(&mut self, s: &str, hid: &mut HidOutput) {
        let save_modifiers = self.modifiers;
        let caps_locked = self.caps_locked;
        let shifted = self.is_shifted();
        if caps_locked {
            hid.press_keycode(KeyCode::CAPS_LOCK);
            hid.release_keycode(KeyCode::CAPS_LOCK);
        }
        for ch in s.chars() {
            let mut uni = ch as u32;
            if self.word_locked && !uni_in_word(uni) {
                self.set_word_lock(false);
            }
            if shifted ^ caps_locked ^ self.word_locked {
                uni = unicode_to_upper(uni);
            }
            self.send_usb_unicode_char(uni, hid);
        }
        if caps_locked {
            hid.press_keycode(KeyCode::CAPS_LOCK);
            hid.release_keycode(KeyCode::CAPS_LOCK);
        }
        self.set_modifiers(save_modifiers, hid);
    }

    fn send_press_ascii_char(&mut self, mut ch: u8, hid: &mut HidOutput) -> u8 {
        if self.word_locked && !uni_in_word(ch as u32) {
            self.set_word_lock(false);
        }
        if self.word_locked {
            ch = unicode_to_upper(ch as u32) as u8;
        }
        self.send_usb_press_ascii_char(ch, hid);
        hid.set_modifiers(self.modifiers);
        ch
    }

    fn send_release_ascii_char(&mut self, ch: u8, hid: &mut HidOutput) {
        self.send_usb_release_ascii_char(ch, hid);
        hid.set_modifiers(self.modifiers);
    }

    fn press_ascii(&mut self, unshifted: u8, shifted: u8, hid: &mut HidOutput) -> u8 {
        let pressed_char = if self.is_shifted() { shifted } else { unshifted };
        self.send_press_ascii_char(pressed_char, hid)
    }

    fn release_ascii(&mut self, pressed: u8, hid: &mut HidOutput) {
        self.send_release_ascii_char(pressed, hid);
    }

    fn mouse_move_actuate(&mut self, val: i8, movement: MouseMove) {
        let val = val.clamp(0, 9) as usize;
        if val == 0 {
            return;
        }
        let (mut v, mut h, mut wv, mut wh) = (0i32, 0i32, 0i32, 0i32);
        match movement {
            MouseMove::Up => v = -MOVE_TABLE[val],
            MouseMove::Down => v = MOVE_TABLE[val],
            MouseMove::Right => h = MOVE_TABLE[val],
            MouseMove::Left => h = -MOVE_TABLE[val],
            MouseMove::WheelUp => wv = WHEEL_TABLE[val],
            MouseMove::WheelDown => wv = -WHEEL_TABLE[val],
            MouseMove::WheelRight => wh = WHEEL_TABLE[val],
            MouseMove::WheelLeft => wh = -WHEEL_TABLE[val],
        }
        self.move_mouse(v, h, wv, wh);
    }

    /// Accumulates mouse/wheel movement in centi-mickeys. Ported from
    /// `controller_moveMouse`.
    fn move_mouse(&mut self, v: i32, h: i32, wv: i32, wh: i32) {
        self.mouse_pos_v += v;
        self.mouse_pos_h += h;
        self.mouse_pos_wv += wv;
        self.mouse_pos_wh += wh;
    }

    /// Flushes whole mickeys out of the centi-mickey accumulators into one
    /// HID mouse report, keeping the remainder for the next tick. Ported
    /// from `controller__sendMouseMovement`.
    fn send_mouse_movement(&mut self, hid: &mut HidOutput) {
        let v = self.mouse_pos_v / 100;
        let h = self.mouse_pos_h / 100;
        let wv = self.mouse_pos_wv / 100;
        let wh = self.mouse_pos_wh / 100;
        if v != 0 || h != 0 || wv != 0 || wh != 0 {
            self.mouse_pos_v -= v * 100;
            self.mouse_pos_h -= h * 100;
            self.mouse_pos_wv -= wv * 100;
            self.mouse_pos_wh -= wh * 100;
            hid.move_mouse(v as i8, h as i8, wv as i8, wh as i8);
        }
    }

    /// Scans the current layer for mouse-movement actions, actuating each
    /// against the key's current analog value, then flushes the result.
    /// Ported from `controller__timedMoveMouse`.
    fn timed_move_mouse(&mut self, now: Instant, keys: &[Key; N_KEYS], hid: &mut HidOutput) {
        for key_id in 0..N_KEYS as u8 {
            if let Action::MouseMove(m) = LAYERS[self.current_layer.index()][key_id as usize] {
                self.mouse_move_actuate(keys[key_id as usize].val(), m);
            }
        }
        self.send_mouse_movement(hid);
        self.move_mouse_timer.enable_ms(now, MOUSE_PERIOD_MS);
    }

    fn do_command(&mut self, command: Command) {
        match command {
            Command::WordLock => {
                let new_val = !self.word_locked;
                self.set_word_lock(new_val);
            }
            Command::Reset => self.reset_requested = true,
            Command::UsbSide => self.usb_side_toggle_requested = true,
        }
    }

    /// Dispatches one resolved action (already past `tap_action`/
    /// `hold_action`), installing whatever release action it implies.
    /// Ported from `action_actuate` and the per-type `*_actuate`
    /// functions it dispatches to.
    fn actuate(&mut self, now: Instant, key_id: u8, action: Action, hid: &mut HidOutput) {
        match action {
            Action::NoAction => {}
            Action::Key(kc) => {
                self.press_keycode(kc, hid);
                self.release_actions[key_id as usize] = Action::RelKey(kc);
            }
            Action::Ascii { unshifted, shifted } => {
                let pressed = self.press_ascii(unshifted, shifted, hid);
                self.release_actions[key_id as usize] = Action::RelAscii(pressed);
            }
            Action::Str(s) => self.press_string(s, hid),
            Action::Mod(m) => {
                self.add_modifiers(m, hid);
                self.release_actions[key_id as usize] = Action::RelMod(m);
            }
            Action::Layer(l) => self.change_layer(l, now),
            Action::HoldLayer(l) => {
                self.change_layer(l, now);
                self.release_actions[key_id as usize] = Action::RelLayer;
            }
            Action::OnceLayer(l) => {
                self.change_layer(l, now);
                self.release_actions[key_id as usize] = Action::RelOnceLayer;
            }
            Action::LockLayer(l) => self.lock_layer_action(l, now),
            Action::BaseLayer(l) => self.change_base_layer(l, now),
            Action::Command(c) => self.do_command(c),
            Action::MouseButton(b) => {
                hid.press_mouse_button(b);
                self.release_actions[key_id as usize] = Action::RelButton(b);
            }
            Action::MouseMove(_) => {
                // Never actuated here: press_key skips mouse-movement
                // actions and timed_move_mouse drives them directly.
            }
            Action::RelKey(kc) => self.release_keycode(kc, hid),
            Action::RelAscii(ch) => self.release_ascii(ch, hid),
            Action::RelMod(m) => self.remove_modifiers(m, hid),
            Action::RelLayer => self.change_layer(self.base_layer, now),
            Action::RelOnceLayer => self.delayed_release_action = Action::RelLayer,
            Action::RelButton(b) => hid.release_mouse_button(b),
            Action::KeyOrMod { .. } | Action::StrOrMod { .. } | Action::KeyOrLayer { .. } | Action::StrOrLayer { .. } => {
                defmt::warn!("dual action reached actuate without being tap/hold resolved");
            }
        }
    }

    fn press_key(&mut self, now: Instant, key_id: u8, hid: &mut HidOutput) {
        let mut action = LAYERS[self.current_layer.index()][key_id as usize];
        if action.is_mouse_movement_action() {
            return;
        }
        self.release_actions[key_id as usize] = Action::NoAction;
        let side = side_of(key_id);
        if self.hold_side == Some(side) {
            if action.is_typing_action() {
                return;
            }
            let _ = self.keys_being_held.insert(key_id);
            action = action.hold_action();
        } else {
            action = action.tap_action();
        }
        self.actuate(now, key_id, action, hid);
    }

    fn release_key(&mut self, now: Instant, key_id: u8, hid: &mut HidOutput) {
        let action = self.release_actions[key_id as usize];
        if self.hold_side.is_some() {
            self.keys_being_held.remove(key_id);
            if self.keys_being_held.is_empty() {
                self.hold_side = None;
            }
        }
        self.actuate(now, key_id, action, hid);
        self.release_actions[key_id as usize] = Action::NoAction;
    }

    fn reset_waiting_key_timeout(&mut self, now: Instant) {
        if !self.waiting_keys.is_empty() {
            self.waiting_key_timer.enable_ms(now, HOLD_DELAY_MS);
        } else {
            self.waiting_key_timer.disable();
        }
    }

    /// Resolves every currently waiting key as a hold, in FIFO order, up to
    /// and including `last_key` if given (or the whole queue if `None`,
    /// the hold-timeout case).
    fn hold_waiting_keys_until_key(&mut self, now: Instant, last_key: Option<u8>, hid: &mut HidOutput) {
        if self.waiting_keys.is_empty() {
            return;
        }
        self.hold_side = self.waiting_keys.first().map(side_of);
        while let Some(key_id) = self.waiting_keys.pop_first() {
            self.press_key(now, key_id, hid);
            if Some(key_id) == last_key {
                break;
            }
        }
    }

    /// Resolves every currently waiting key as a tap, in FIFO order, up to
    /// and including `last_key`.
    fn tap_waiting_keys_until_key(&mut self, now: Instant, last_key: Option<u8>, hid: &mut HidOutput) {
        if self.waiting_keys.is_empty() {
            return;
        }
        while let Some(key_id) = self.waiting_keys.pop_first() {
            self.press_key(now, key_id, hid);
            if Some(key_id) == last_key {
                break;
            }
        }
    }

    fn key_pressed(&mut self, now: Instant, key_id: u8, hid: &mut HidOutput) {
        if self.waiting_keys.is_empty() {
            let action = LAYERS[self.current_layer.index()][key_id as usize];
            if action.hold_type() == HoldType::None {
                self.press_key(now, key_id, hid);
                return;
            }
        }
        let _ = self.waiting_keys.insert(key_id);
        self.reset_waiting_key_timeout(now);
    }

    /// A key released while a different-side key is still waiting on a
    /// tap/hold decision resolves the whole waiting queue as a hold (up to
    /// this key); released on the same side (or itself), it resolves as a
    /// tap. Ported from `controller_keyReleased`.
    fn key_released(&mut self, now: Instant, key_id: u8, hid: &mut HidOutput) {
        let delayed_action = core::mem::replace(&mut self.delayed_release_action, Action::NoAction);
        if self.waiting_keys.contains(key_id) {
            let first_key = self.waiting_keys.first().expect("just checked contains");
            if first_key == key_id || side_of(first_key) == side_of(key_id) {
                self.tap_waiting_keys_until_key(now, Some(key_id), hid);
            } else {
                self.hold_waiting_keys_until_key(now, Some(key_id), hid);
            }
            self.reset_waiting_key_timeout(now);
        }
        self.release_key(now, key_id, hid);
        self.actuate(now, key_id, delayed_action, hid);
    }

    /// Feeds one key's press/release edge into the controller. Call once
    /// per key per tick with whatever `Key::take_press_changed` returned.
    pub fn notify_key_edge(&mut self, now: Instant, key_id: u8, pressed: bool, hid: &mut HidOutput) {
        if pressed {
            self.key_pressed(now, key_id, hid);
        } else {
            self.key_released(now, key_id, hid);
        }
    }

    /// Per-tick housekeeping: expires the lock-layer gesture window,
    /// drives the periodic mouse-movement flush, and resolves the
    /// tap/hold timeout. Ported from `controller_task` (minus
    /// `Key_processKeyChanges`, which is `notify_key_edge` here).
    pub fn task(&mut self, now: Instant, keys: &[Key; N_KEYS], hid: &mut HidOutput) {
        if self.change_layer_timer.elapsed(now) {
            self.change_to_layer = None;
        }
        if self.move_mouse_timer.elapsed(now) {
            self.timed_move_mouse(now, keys, hid);
        }
        if self.waiting_key_timer.elapsed(now) {
            self.hold_waiting_keys_until_key(now, None, hid);
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycode::Buttons;

    fn t(ms: u32) -> Instant {
        Instant::from_micros(ms * 1000)
    }

    #[test]
    fn plain_key_press_sends_keycode_and_release_undoes_it() {
        let mut c = Controller::new();
        let mut hid = HidOutput::new();
        // key 14 on the Colemak layer is a plain KeyCode::V.
        c.notify_key_edge(t(0), 14, true, &mut hid);
        let report = hid.pump().unwrap();
        assert!(report.keycodes.contains(&KeyCode::V));
        c.notify_key_edge(t(10), 14, false, &mut hid);
        let report = hid.pump().unwrap();
        assert!(!report.keycodes.contains(&KeyCode::V));
    }

    #[test]
    fn releasing_a_different_side_key_while_waiting_resolves_a_hold() {
        let mut c = Controller::new();
        let mut hid = HidOutput::new();
        // key 15 (left thumb) carries a dual key-or-layer action on the
        // Colemak layer; key 20 is a plain key on the right side.
        c.notify_key_edge(t(0), 15, true, &mut hid);
        assert!(c.waiting_keys.contains(15));
        c.notify_key_edge(t(5), 20, true, &mut hid);
        // releasing the right-side key while 15 still waits resolves 15 as
        // a hold (different side from its own).
        c.notify_key_edge(t(10), 20, false, &mut hid);
        assert!(c.hold_side.is_some());
    }

    #[test]
    fn waiting_key_resolves_as_hold_after_timeout() {
        let mut c = Controller::new();
        let mut hid = HidOutput::new();
        c.notify_key_edge(t(0), 15, true, &mut hid);
        assert!(!c.waiting_keys.is_empty());
        let mut keys = [Key::new_digital(0); N_KEYS];
        for (i, k) in keys.iter_mut().enumerate() {
            *k = Key::new_digital(i as u8);
        }
        c.task(t(HOLD_DELAY_MS + 1), &keys, &mut hid);
        assert!(c.waiting_keys.is_empty());
    }

    #[test]
    fn lock_layer_needs_two_taps_within_window() {
        let mut c = Controller::new();
        c.lock_layer_action(LayerId::Num, t(0));
        assert_eq!(c.current_layer(), LayerId::Colemak);
        c.lock_layer_action(LayerId::Num, t(50));
        assert_eq!(c.current_layer(), LayerId::Num);

        // tapping the locked layer again unlocks it.
        c.lock_layer_action(LayerId::Num, t(60));
        assert_eq!(c.current_layer(), LayerId::Colemak);
    }

    #[test]
    fn lock_layer_gesture_expires_if_second_tap_is_late() {
        let mut c = Controller::new();
        let mut hid = HidOutput::new();
        c.lock_layer_action(LayerId::Num, t(0));
        let keys = core::array::from_fn(|i| Key::new_digital(i as u8));
        c.task(t(LOCK_DELAY_MS + 1), &keys, &mut hid);
        c.lock_layer_action(LayerId::Num, t(LOCK_DELAY_MS + 2));
        // treated as a fresh first tap, not a commit.
        assert_eq!(c.current_layer(), LayerId::Colemak);
    }

    #[test]
    fn word_lock_breaks_on_non_word_keycode() {
        let mut c = Controller::new();
        let mut hid = HidOutput::new();
        c.do_command(Command::WordLock);
        assert!(c.word_locked());
        c.send_press_keycode(KeyCode::SPACE, &mut hid);
        assert!(!c.word_locked());
    }

    #[test]
    fn usb_side_command_sets_a_pollable_flag() {
        let mut c = Controller::new();
        c.do_command(Command::UsbSide);
        assert!(c.take_usb_side_toggle_requested());
        assert!(!c.take_usb_side_toggle_requested());
    }

    #[test]
    fn reset_command_sets_a_pollable_flag() {
        let mut c = Controller::new();
        c.do_command(Command::Reset);
        assert!(c.take_reset_requested());
    }

    #[test]
    fn mouse_movement_accumulates_until_a_whole_mickey_is_ready() {
        let mut c = Controller::new();
        let mut hid = HidOutput::new();
        c.mouse_move_actuate(1, MouseMove::Right); // 85 centi-mickeys
        c.send_mouse_movement(&mut hid);
        assert!(hid.take_mouse_report().is_none());
        c.mouse_move_actuate(1, MouseMove::Right); // 170 total -> 1 mickey
        c.send_mouse_movement(&mut hid);
        let report = hid.take_mouse_report().unwrap();
        assert_eq!(report.h, 1);
    }

    #[test]
    fn mouse_button_press_and_release_round_trip() {
        let mut c = Controller::new();
        let mut hid = HidOutput::new();
        c.actuate(t(0), 0, Action::MouseButton(Buttons::LEFT), &mut hid);
        let report = hid.take_mouse_report().unwrap();
        assert_eq!(report.buttons, Buttons::LEFT);
        c.actuate(t(1), 0, Action::RelButton(Buttons::LEFT), &mut hid);
        let report = hid.take_mouse_report().unwrap();
        assert_eq!(report.buttons, Buttons::NONE);
    }
}
