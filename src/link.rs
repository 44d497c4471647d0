//! Inter-half UART link: a self-synchronizing 2-byte framing with a built
//! in checksum, plus the periodic half-status message the two halves use
//! to find each other and negotiate USB ownership.
//!
//! Ported from `comm__encode_key_val`/`comm_sendMessage`/
//! `comm_receiveMessage`/`comm_sendStatus`/`comm_task` in
//! `original_source/pico/teclado.c`. The wire format is unchanged: each
//! message is one `(key_id, val)` pair id 0..61 for key value updates, or
//! id 62 for a status beacon, packed into two bytes where the first byte
//! never sets its top bit and the second always does, and `val`/`key_id`
//! are byte-swizzled into each other so a corrupted byte almost always
//! fails to re-derive the frame it was taken from.

use crate::clock::{Instant, Timer};
use crate::config::COMM_STATUS_DELAY_MS;
use crate::error::LinkError;
use crate::key::Side;

pub const STATUS_MESSAGE_ID: u8 = 62;

fn encode(key_id: u8, val: u8) -> [u8; 2] {
    let x = val.wrapping_mul(3).wrapping_add(key_id);
    let y = (x >> 3) ^ x;
    let b0 = ((y & 0b0111) << 4) | val;
    let b1 = ((y & 0b1000) << 3) | 0b1000_0000 | key_id;
    [b0, b1]
}

/// Decoder for the 2-byte frame stream, one byte at a time. Mirrors the
/// `static uint8_t buf[2]; static uint8_t count` state `comm_receiveMessage`
/// keeps across calls.
#[derive(Debug, Default)]
pub struct Framer {
    buf: [u8; 2],
    count: u8,
}

impl Framer {
    pub const fn new() -> Self {
        Framer { buf: [0, 0], count: 0 }
    }

    /// Feeds one received byte in. Returns `Ok(Some((key_id, val)))` when a
    /// complete, checksum-valid frame lands; `Ok(None)` while still waiting
    /// on the second byte; `Err` on a framing or checksum failure (the
    /// framer resyncs itself either way, same as the source silently
    /// dropping the byte and continuing).
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<(u8, u8)>, LinkError> {
        if self.count == 0 && byte > 127 {
            return Err(LinkError::BadChecksum);
        }
        self.buf[self.count as usize] = byte;
        self.count += 1;
        if self.count < 2 {
            return Ok(None);
        }
        self.count = 0;

        let val = self.buf[0] & 0b1000_1111;
        let key_id = self.buf[1] & 0b0011_1111;
        if encode(key_id, val) != self.buf {
            return Err(LinkError::BadChecksum);
        }
        Ok(Some((key_id, val)))
    }
}

/// Encodes one key-value update frame ready to push onto the UART.
pub fn encode_key_value(key_id: u8, val: u8) -> [u8; 2] {
    encode(key_id, val)
}

/// This half's view of itself and its peer, refreshed by periodic status
/// beacons over the link. Ported from the `status` struct's comm-related
/// fields plus `comm_sendStatus`/the status half of `comm_task`.
#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct LinkStatus {
    pub my_side: Side,
    pub usb_ready: bool,
    pub usb_active: bool,
    pub toggle_usb: bool,

    pub other_side: Side,
    pub other_usb_ready: bool,
    pub other_usb_active: bool,
    pub other_toggle_usb: bool,

    pub comm_ok: bool,
    /// Last time either side was USB-active, used by the arbiter in
    /// `usb_role.rs` to decide when to claim an orphaned connection.
    pub last_active: Instant,
    send_timer: Timer,
    recv_timer: Timer,
}

impl LinkStatus {
    pub fn new(my_side: Side, now: Instant) -> Self {
        let other_side = match my_side {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        };
        LinkStatus {
            my_side,
            usb_ready: false,
            usb_active: false,
            toggle_usb: true,
            other_side,
            other_usb_ready: false,
            other_usb_active: false,
            other_toggle_usb: false,
            comm_ok: false,
            last_active: now,
            send_timer: Timer::new(),
            recv_timer: Timer::new(),
        }
    }

    /// Whether a status beacon is due; if so, the caller should push the
    /// frame from `status_frame()` and call `mark_sent`.
    pub fn should_send(&self, now: Instant) -> bool {
        !self.send_timer.is_enabled() || self.send_timer.elapsed(now)
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.send_timer.enable_ms(now, COMM_STATUS_DELAY_MS);
    }

    pub fn status_frame(&self) -> [u8; 2] {
        let mut val = 0u8;
        if self.my_side == Side::Right {
            val |= 0b0001;
        }
        if self.usb_ready {
            val |= 0b0010;
        }
        if self.usb_active {
            val |= 0b0100;
        }
        if self.toggle_usb {
            val |= 0b1000;
        }
        encode_key_value(STATUS_MESSAGE_ID, val)
    }

    /// Applies a received frame, if it is the status message, and (re)arms
    /// the receive watchdog. Returns `true` if the frame was consumed.
    pub fn receive(&mut self, now: Instant, key_id: u8, val: u8) -> bool {
        if key_id != STATUS_MESSAGE_ID {
            return false;
        }
        self.comm_ok = true;
        self.recv_timer.enable_ms(now, COMM_STATUS_DELAY_MS * 2);
        self.other_side = if val & 0b0001 == 0 { Side::Left } else { Side::Right };
        self.other_usb_ready = val & 0b0010 != 0;
        self.other_usb_active = val & 0b0100 != 0;
        self.other_toggle_usb = val & 0b1000 != 0;
        true
    }

    /// Call once per tick: declares the link down if a status beacon
    /// hasn't arrived within the watchdog window.
    pub fn poll_watchdog(&mut self, now: Instant) {
        if self.comm_ok && self.recv_timer.elapsed(now) {
            self.comm_ok = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips_for_every_key_and_val() {
        let mut framer = Framer::new();
        for key_id in 0u8..63 {
            for val in 0u8..16 {
                let frame = encode_key_value(key_id, val);
                assert_eq!(framer.push_byte(frame[0]).unwrap(), None);
                assert_eq!(framer.push_byte(frame[1]).unwrap(), Some((key_id, val)));
            }
        }
    }

    #[test]
    fn corrupted_second_byte_is_rejected() {
        let mut framer = Framer::new();
        let frame = encode_key_value(5, 7);
        assert_eq!(framer.push_byte(frame[0]).unwrap(), None);
        assert!(framer.push_byte(frame[1] ^ 0b0000_0001).is_err());
    }

    #[test]
    fn status_roundtrips_through_the_wire_format() {
        let mut left = LinkStatus::new(Side::Left, Instant::ZERO);
        left.usb_ready = true;
        left.usb_active = true;
        let frame = left.status_frame();

        let mut right = LinkStatus::new(Side::Right, Instant::ZERO);
        let mut framer = Framer::new();
        framer.push_byte(frame[0]).unwrap();
        let (key_id, val) = framer.push_byte(frame[1]).unwrap().unwrap();
        let now = Instant::from_micros(1_000);
        assert!(right.receive(now, key_id, val));
        assert!(right.comm_ok);
        assert_eq!(right.other_side, Side::Left);
        assert!(right.other_usb_ready);
        assert!(right.other_usb_active);
    }

    #[test]
    fn watchdog_trips_comm_not_ok_after_silence() {
        let mut status = LinkStatus::new(Side::Left, Instant::from_micros(1_000));
        let t0 = Instant::from_micros(1_000);
        status.receive(t0, STATUS_MESSAGE_ID, 0b0010);
        assert!(status.comm_ok);
        let much_later = Instant::from_micros(1_000 + (COMM_STATUS_DELAY_MS * 2 + 10) * 1000);
        status.poll_watchdog(much_later);
        assert!(!status.comm_ok);
    }
}
