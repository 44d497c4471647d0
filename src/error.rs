//! Error types shared across modules. Kept as plain `defmt::Format` enums
//! rather than pulling in `thiserror`: the firmware never formats an error
//! for a human reader other than through `defmt`'s logger, matching how the
//! teacher crate reports its own errors.

/// Failure decoding a frame off the inter-half UART link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LinkError {
    /// The checksum byte did not match the payload.
    BadChecksum,
    /// A frame did not arrive before the receive watchdog expired.
    Timeout,
    /// The receive buffer filled up before a complete frame was seen.
    Overrun,
}

/// Failure inside the controller's action/layer state machine. These are
/// all recoverable: the controller logs and drops the offending event
/// rather than halting, since a malformed layer table entry must never
/// take down a live keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ControllerError {
    /// A key id was out of range for the layer table.
    KeyOutOfRange,
    /// A layer id named by an action was out of range for the layer table.
    LayerOutOfRange,
    /// The held-key or waiting-key list ran out of capacity.
    KeyListFull,
    /// The outgoing HID event queue ran out of capacity.
    QueueFull,
}
