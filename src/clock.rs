//! Monotonic microsecond clock and one-shot/periodic timers.
//!
//! `now = 0` is reserved to mean "timer disabled", mirroring
//! `original_source/pico/teclado.c`'s `status.now`/`Timer` pair: the firmware
//! there never lets `time_us_32()` settle on exactly zero (`update_now`
//! bumps it to 1), so a zeroed `Timer` struct reads as disabled without an
//! extra bool. We keep that trick since it's what makes `Timer` a plain
//! `Copy` struct with no enum tag.

/// A monotonic timestamp in microseconds. Wraps around after ~71.6 minutes;
/// all comparisons use wrapping subtraction so a single wraparound is
/// harmless as long as delays stay far below `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, defmt::Format)]
pub struct Instant(u32);

impl Instant {
    pub const ZERO: Instant = Instant(0);

    /// Builds an `Instant` from a raw microsecond counter reading. Like the
    /// source's `update_now`, a reading of exactly 0 is nudged to 1 so it is
    /// never confused with "timer disabled".
    pub fn from_micros(raw: u32) -> Self {
        Instant(if raw == 0 { 1 } else { raw })
    }

    fn elapsed_since(self, earlier: Instant) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Microseconds elapsed between `earlier` and `self`, saturating
    /// toward zero rather than wrapping negative if `earlier` is actually
    /// later (defensive against call-site bugs, never relied upon in
    /// normal operation since all instants here only move forward).
    pub fn micros_since(self, earlier: Instant) -> u32 {
        self.elapsed_since(earlier)
    }
}

/// A one-shot timer armed with a delay in microseconds. Polled, never
/// interrupt-driven, per the cooperative main-loop model.
#[derive(Debug, Clone, Copy, Default, defmt::Format)]
pub struct Timer {
    timestamp: u32,
    delay: u32,
    enabled: bool,
}

impl Timer {
    pub const fn new() -> Self {
        Timer { timestamp: 0, delay: 0, enabled: false }
    }

    /// Arms the timer: it will be considered elapsed once `delay_us` has
    /// passed since `now`.
    pub fn enable_us(&mut self, now: Instant, delay_us: u32) {
        self.timestamp = now.0;
        self.delay = delay_us;
        self.enabled = true;
    }

    pub fn enable_ms(&mut self, now: Instant, delay_ms: u32) {
        self.enable_us(now, delay_ms * 1000);
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Non-destructive: calling this repeatedly after the delay has passed
    /// keeps returning `true` until the timer is re-armed or disabled.
    pub fn elapsed(&self, now: Instant) -> bool {
        self.enabled && now.elapsed_since(Instant(self.timestamp)) > self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_timer_never_elapses() {
        let t = Timer::new();
        assert!(!t.elapsed(Instant::from_micros(1_000_000)));
    }

    #[test]
    fn elapses_after_delay_and_stays_elapsed() {
        let mut t = Timer::new();
        let t0 = Instant::from_micros(100);
        t.enable_us(t0, 50);
        assert!(!t.elapsed(Instant::from_micros(140)));
        assert!(t.elapsed(Instant::from_micros(151)));
        // non-destructive
        assert!(t.elapsed(Instant::from_micros(200)));
    }

    #[test]
    fn disable_clears_elapsed() {
        let mut t = Timer::new();
        let t0 = Instant::from_micros(10);
        t.enable_us(t0, 5);
        t.disable();
        assert!(!t.elapsed(Instant::from_micros(1_000)));
    }

    #[test]
    fn survives_one_wraparound() {
        let mut t = Timer::new();
        let near_wrap = Instant::from_micros(u32::MAX - 10);
        t.enable_us(near_wrap, 50);
        let after_wrap = Instant::from_micros(45); // wrapped past u32::MAX
        assert!(t.elapsed(after_wrap));
    }
}
