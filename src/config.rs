//! Compile-time tunables, ported from the `#define` block at the top of
//! `original_source/pico/teclado.c`.

/// Hysteresis band (in filtered-raw units) a key's value must cross past its
/// running min/max before a press or release edge fires. See `key.rs`.
pub const SENSITIVITY: u32 = 6;

/// How often accumulated mouse movement is flushed into a HID report.
pub const MOUSE_PERIOD_MS: u32 = 30;

/// How long a key must be held before `tap_action` turns into `hold_action`.
pub const HOLD_DELAY_MS: u32 = 333;

/// Window in which a second tap of a `lock_layer` action must land to be
/// recognized as the "lock" gesture rather than two independent taps.
pub const LOCK_DELAY_MS: u32 = 200;

/// Digital (GPIO) key debounce window.
pub const DEBOUNCING_DELAY_MS: u32 = 20;

/// How often a half reports its liveness/role status to its peer over the
/// inter-half link.
pub const COMM_STATUS_DELAY_MS: u32 = 20;

/// Inter-half UART baud rate.
pub const BAUD_RATE: u32 = 500_000;

/// Number of analog multiplexer select lines.
pub const N_SEL_PINS: usize = 5;
/// Number of analog input pins feeding the multiplexer tree.
pub const N_ANA_PINS: usize = 4;
/// Total analog hardware key slots: `N_SEL_PINS * N_ANA_PINS`.
pub const N_ANALOG_HW_KEYS: usize = N_SEL_PINS * N_ANA_PINS;
/// Total digital (direct GPIO) hardware key slots.
pub const N_DIGITAL_HW_KEYS: usize = 32;

/// Number of logical keys in the layout, across both halves.
pub const N_KEYS: usize = 36;

/// Capacity of the outgoing HID keycode event queue (`hid_queue.rs`).
pub const KCQ_CAPACITY: usize = 200;

/// Maximum simultaneously active (non-modifier) keycodes reportable in one
/// HID keyboard report, per the USB HID boot/NKRO-lite report layout.
pub const MAX_ACTIVE_KEYCODES: usize = 6;
