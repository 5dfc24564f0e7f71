//! Inference rate limiting.
//!
//! Cameras deliver 15-60 fps; the detector only needs a handful of results per
//! second. `FrameThrottler` admits a frame for inference only once the minimum
//! interval has elapsed since the last admitted frame.
//!
//! The throttler touches nothing but its own `ThrottleState`, so it is safe to
//! drive from the media-delivery thread.

/// Default minimum time between accepted inference invocations.
pub const DEFAULT_MIN_INTERVAL_MS: f64 = 200.0;

/// Timestamp of the last frame admitted for inference.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThrottleState {
    /// Milliseconds; `f64::NEG_INFINITY` until the first acceptance.
    pub last_accepted_ms: f64,
}

impl ThrottleState {
    pub fn never_accepted() -> Self {
        Self {
            last_accepted_ms: f64::NEG_INFINITY,
        }
    }

    pub fn has_accepted(&self) -> bool {
        self.last_accepted_ms.is_finite()
    }
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self::never_accepted()
    }
}

#[derive(Clone, Debug)]
pub struct FrameThrottler {
    min_interval_ms: f64,
    state: ThrottleState,
}

impl FrameThrottler {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            min_interval_ms,
            state: ThrottleState::never_accepted(),
        }
    }

    pub fn min_interval_ms(&self) -> f64 {
        self.min_interval_ms
    }

    pub fn state(&self) -> ThrottleState {
        self.state
    }

    /// Admit the frame observed at `now_ms` if at least the minimum interval
    /// has passed since the last admitted frame. Rejection leaves state untouched.
    pub fn accept(&mut self, now_ms: f64) -> bool {
        if now_ms - self.state.last_accepted_ms >= self.min_interval_ms {
            self.state.last_accepted_ms = now_ms;
            true
        } else {
            false
        }
    }

    /// Forget the last acceptance so the next frame is admitted immediately.
    pub fn reset(&mut self) {
        self.state = ThrottleState::never_accepted();
    }
}

impl Default for FrameThrottler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_is_always_accepted() {
        let mut throttler = FrameThrottler::default();
        assert!(!throttler.state().has_accepted());
        assert!(throttler.accept(0.0));
        assert_eq!(throttler.state().last_accepted_ms, 0.0);
    }

    #[test]
    fn frames_inside_interval_are_rejected_without_mutation() {
        let mut throttler = FrameThrottler::new(200.0);
        assert!(throttler.accept(1_000.0));
        for now in [1_000.0, 1_001.0, 1_100.0, 1_199.999] {
            assert!(!throttler.accept(now));
            assert_eq!(throttler.state().last_accepted_ms, 1_000.0);
        }
    }

    #[test]
    fn frame_at_exact_interval_is_accepted() {
        let mut throttler = FrameThrottler::new(200.0);
        assert!(throttler.accept(1_000.0));
        assert!(throttler.accept(1_200.0));
        assert_eq!(throttler.state().last_accepted_ms, 1_200.0);
        assert!(throttler.accept(5_000.0));
        assert_eq!(throttler.state().last_accepted_ms, 5_000.0);
    }

    #[test]
    fn interval_is_measured_from_last_accepted_not_last_seen() {
        // 60 fps delivery: one acceptance per ~200ms window
        let mut throttler = FrameThrottler::new(200.0);
        let accepted = (0..60)
            .map(|i| i as f64 * (1_000.0 / 60.0))
            .filter(|&now| throttler.accept(now))
            .count();
        assert_eq!(accepted, 5);
    }

    #[test]
    fn reset_readmits_immediately() {
        let mut throttler = FrameThrottler::new(200.0);
        assert!(throttler.accept(10.0));
        assert!(!throttler.accept(20.0));
        throttler.reset();
        assert!(throttler.accept(20.0));
    }
}
