#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

#[defmt_test::tests]
mod tests {
    use duet_firmware::clock::Instant;
    use duet_firmware::controller::Controller;
    use duet_firmware::hid_queue::HidOutput;
    use duet_firmware::key::Key;
    use duet_firmware::keycode::KeyCode;
    use duet_firmware::link::{Framer, LinkStatus};
    use duet_firmware::key::Side;

    /// Smoke test: the firmware crate links against a real target and the
    /// panic handler is wired, same role the teacher's own `testsuite`
    /// plays for its build.
    #[test]
    fn crate_links_and_basic_types_construct() {
        let _ = Controller::new();
        let _ = HidOutput::new();
        let _ = Key::new_digital(0);
    }

    /// End-to-end tap/hold timeout (property E1/E2), exercised here because
    /// it is the one path `controller.rs`'s host tests drive with a
    /// synthetic clock but that ultimately depends on `main.rs` polling
    /// `Controller::task` often enough in real time for the hold timeout to
    /// fire; this pins the same scenario through the crate's public API as
    /// it is actually called from the firmware binary.
    #[test]
    fn unresolved_hold_times_out_via_task() {
        let mut controller = Controller::new();
        let mut hid = HidOutput::new();
        let keys = [Key::new_digital(0); 36];
        let t0 = Instant::from_micros(1);
        // key 15 carries a dual key-or-layer action on the default layer.
        controller.notify_key_edge(t0, 15, true, &mut hid);
        let past_hold_delay = Instant::from_micros(1 + 400_000);
        controller.task(past_hold_delay, &keys, &mut hid);
        controller.notify_key_edge(past_hold_delay, 15, false, &mut hid);
    }

    /// The inter-half link's checksummed frame round-trips on real hardware
    /// UART buffers the same way it does in `link.rs`'s host unit tests.
    #[test]
    fn link_status_frame_round_trips() {
        let mut left = LinkStatus::new(Side::Left, Instant::ZERO);
        left.usb_ready = true;
        let frame = left.status_frame();
        let mut framer = Framer::new();
        assert_eq!(framer.push_byte(frame[0]).unwrap(), None);
        let (key_id, _val) = framer.push_byte(frame[1]).unwrap().unwrap();
        assert_eq!(key_id, duet_firmware::link::STATUS_MESSAGE_ID);
    }

    #[test]
    fn keycode_v_is_not_a_modifier() {
        assert!(!KeyCode::V.is_modifier());
    }
}
