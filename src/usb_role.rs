//! Decides which half of the board currently owns the USB connection.
//!
//! Ported from `synchronizeAndDecideUsbSide` in
//! `original_source/pico/teclado.c`. Only one half plugs into the host at
//! a time in the common case, but either half's USB port can be the one
//! actually connected, so both run this same arbitration every tick and
//! agree on a winner using the periodic status beacon in `link.rs`.

use crate::clock::Instant;
use crate::config::COMM_STATUS_DELAY_MS;
use crate::key::Side;
use crate::link::LinkStatus;

/// Runs one tick of the arbitration state machine against `status`,
/// folding in whether the link layer already wants to send a beacon this
/// tick (`send_due`). Returns whether a status beacon should go out this
/// tick (the caller owns actually sending it and calling
/// `LinkStatus::mark_sent`).
pub fn decide(status: &mut LinkStatus, now: Instant, send_due: bool) -> bool {
    let mut should_send = send_due;

    if status.usb_active && !status.usb_ready {
        status.toggle_usb = true;
    }
    if status.usb_active && status.toggle_usb {
        status.usb_active = false;
    }
    if status.other_toggle_usb {
        if status.usb_ready {
            status.usb_active = true;
        }
        status.other_toggle_usb = false;
        should_send = true;
    }
    if status.other_usb_active {
        status.usb_active = false;
    }
    if status.toggle_usb {
        should_send = true;
    }
    if status.usb_active || status.other_usb_active {
        status.last_active = now;
    }
    if status.usb_ready && !status.usb_active && !status.other_usb_active {
        if status.comm_ok
            && status.my_side == Side::Left
            && now.micros_since(status.last_active) >= COMM_STATUS_DELAY_MS * 3 * 1000
        {
            status.usb_active = true;
        }
        if now.micros_since(status.last_active) >= COMM_STATUS_DELAY_MS * 6 * 1000 {
            status.usb_active = true;
        }
        if status.usb_active {
            should_send = true;
        }
    }
    status.toggle_usb = false;
    should_send
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_claims_usb_when_link_is_healthy_and_idle_long_enough() {
        let mut status = LinkStatus::new(Side::Left, Instant::ZERO);
        status.usb_ready = true;
        status.toggle_usb = false;
        status.comm_ok = true;
        status.other_usb_active = false;
        let later = Instant::from_micros((COMM_STATUS_DELAY_MS * 3 + 1) * 1000);
        decide(&mut status, later, false);
        assert!(status.usb_active);
    }

    #[test]
    fn right_falls_back_after_a_longer_silence_even_without_comm() {
        let mut status = LinkStatus::new(Side::Right, Instant::ZERO);
        status.usb_ready = true;
        status.toggle_usb = false;
        status.comm_ok = false;
        let later = Instant::from_micros((COMM_STATUS_DELAY_MS * 6 + 1) * 1000);
        decide(&mut status, later, false);
        assert!(status.usb_active);
    }

    #[test]
    fn other_side_active_forces_this_side_inactive() {
        let mut status = LinkStatus::new(Side::Left, Instant::ZERO);
        status.usb_active = true;
        status.other_usb_active = true;
        decide(&mut status, Instant::from_micros(10), false);
        assert!(!status.usb_active);
    }

    #[test]
    fn active_side_relinquishes_when_not_usb_ready() {
        let mut status = LinkStatus::new(Side::Left, Instant::ZERO);
        status.usb_active = true;
        status.usb_ready = false;
        decide(&mut status, Instant::from_micros(10), false);
        assert!(!status.usb_active);
    }
}
