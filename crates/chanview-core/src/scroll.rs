//! Scroll position → "load the next batch" edge detector.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::ScrollConfig;

/// Fractions run from 1.0 (top) to 0.0 (bottom). A trigger fires when the
/// viewer moves *down* into the bottom band and no cooldown is active.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: f64,
    cooldown: Duration,
    prev_fraction: f64,
    quiet_until: Option<Instant>,
}

impl ScrollTrigger {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            threshold: config.threshold,
            cooldown: config.cooldown(),
            prev_fraction: 1.0,
            quiet_until: None,
        }
    }

    /// Feed one scroll observation. Returns `true` when the caller should
    /// request the next batch.
    pub fn observe(&mut self, fraction: f64, now: Instant) -> bool {
        let fraction = if fraction.is_nan() { 1.0 } else { fraction.clamp(0.0, 1.0) };
        let moving_down = fraction < self.prev_fraction;
        self.prev_fraction = fraction;

        if !moving_down || fraction > self.threshold {
            return false;
        }
        if matches!(self.quiet_until, Some(until) if now < until) {
            return false;
        }

        self.quiet_until = Some(now + self.cooldown);
        true
    }

    /// Forget the previous position; the next view starts at the top.
    pub fn reset(&mut self) {
        self.prev_fraction = 1.0;
        self.quiet_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> ScrollTrigger {
        ScrollTrigger::new(&ScrollConfig::default())
    }

    #[test]
    fn test_fires_when_moving_into_bottom_band() {
        let mut t = trigger();
        let now = Instant::now();
        assert!(!t.observe(0.5, now));
        assert!(t.observe(0.15, now));
    }

    #[test]
    fn test_moving_up_never_fires() {
        let mut t = trigger();
        let now = Instant::now();
        t.observe(0.0, now);
        assert!(!t.observe(0.1, now + Duration::from_secs(5)));
    }

    #[test]
    fn test_cooldown_suppresses_repeat() {
        let mut t = trigger();
        let now = Instant::now();
        assert!(t.observe(0.2, now));
        assert!(!t.observe(0.1, now + Duration::from_millis(500)));
        // Previous fraction still tracked while quiet.
        assert!(!t.observe(0.1, now + Duration::from_millis(1500)));
        assert!(t.observe(0.05, now + Duration::from_millis(1500)));
    }

    #[test]
    fn test_reset_forgets_position() {
        let mut t = trigger();
        let now = Instant::now();
        assert!(t.observe(0.1, now));
        t.reset();
        assert!(t.observe(0.1, now));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut t = trigger();
        let now = Instant::now();
        assert!(t.observe(-3.0, now));
        assert!(!t.observe(f64::NAN, now));
    }
}
