//! Status LED color policy.
//!
//! Ported from `led_updateColor` in `original_source/pico/teclado.c`. The
//! source drives a WS2812 through PIO; this module only computes the
//! color, leaving the actual pixel push to the board-specific driver in
//! `main.rs`.

/// An RGB triple in the same 0..=255 scale `led_set_rgb` expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Everything `led_updateColor` reads from global state, collected into
/// one argument so this function stays pure.
#[derive(Debug, Clone, Copy)]
pub struct LedInputs {
    pub usb_active: bool,
    pub other_side_usb_active: bool,
    pub caps_lock: bool,
    pub word_lock: bool,
}

pub fn color_for(inputs: LedInputs) -> Rgb {
    if !inputs.usb_active && !inputs.other_side_usb_active {
        return Rgb { r: 50, g: 0, b: 0 };
    }
    if inputs.usb_active {
        if inputs.caps_lock {
            return Rgb { r: 0, g: 0, b: 10 };
        }
        if inputs.word_lock {
            return Rgb { r: 0, g: 0, b: 1 };
        }
        return Rgb { r: 0, g: 1, b: 0 };
    }
    Rgb { r: 0, g: 0, b: 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neither_side_connected_is_dim_red() {
        let c = color_for(LedInputs { usb_active: false, other_side_usb_active: false, caps_lock: false, word_lock: false });
        assert_eq!(c, Rgb { r: 50, g: 0, b: 0 });
    }

    #[test]
    fn active_with_caps_lock_is_blue() {
        let c = color_for(LedInputs { usb_active: true, other_side_usb_active: false, caps_lock: true, word_lock: false });
        assert_eq!(c, Rgb { r: 0, g: 0, b: 10 });
    }

    #[test]
    fn active_plain_is_dim_green() {
        let c = color_for(LedInputs { usb_active: true, other_side_usb_active: false, caps_lock: false, word_lock: false });
        assert_eq!(c, Rgb { r: 0, g: 1, b: 0 });
    }

    #[test]
    fn inactive_with_peer_active_is_off() {
        let c = color_for(LedInputs { usb_active: false, other_side_usb_active: true, caps_lock: false, word_lock: false });
        assert_eq!(c, Rgb { r: 0, g: 0, b: 0 });
    }
}
