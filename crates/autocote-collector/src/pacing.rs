//! Randomized pauses between marketplace requests.

use rand::Rng;
use std::time::Duration;

/// Bounds of a randomized pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    /// Pause uniformly drawn from `[min_ms, max_ms]`. Bounds are swapped if reversed.
    #[must_use]
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        let (lo, hi) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self {
            min: Duration::from_millis(lo),
            max: Duration::from_millis(hi),
        }
    }

    /// No pause at all.
    #[must_use]
    pub fn none() -> Self {
        Self::from_millis(0, 0)
    }

    /// Draw one pause length.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleep for one sampled pause; zero-length pauses return immediately.
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis(), "pacing pause");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        let pacing = Pacing::from_millis(1_500, 4_000);
        for _ in 0..50 {
            let d = pacing.sample();
            assert!(d >= Duration::from_millis(1_500) && d <= Duration::from_millis(4_000));
        }
    }

    #[test]
    fn test_reversed_bounds() {
        let pacing = Pacing::from_millis(900, 100);
        assert!(pacing.sample() <= Duration::from_millis(900));
        assert_eq!(Pacing::none().sample(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps() {
        let start = tokio::time::Instant::now();
        Pacing::from_millis(2_000, 2_000).pause().await;
        assert!(start.elapsed() >= Duration::from_millis(2_000));
    }
}
