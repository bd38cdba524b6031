//! Page-Hinkley test for a sustained upward shift in the mean of a stream.

/// Detector parameters. The detector holds no stream state: every call
/// replays the full series, O(n).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageHinkley {
    /// Slack subtracted from each deviation (δ).
    pub delta: f64,
    /// Detection threshold on the cumulative deviation above its minimum (λ).
    pub lambda: f64,
    /// Decay of the exponentially weighted running mean.
    pub alpha: f64,
}

impl Default for PageHinkley {
    fn default() -> Self {
        Self::new(0.005, 50.0, 0.99)
    }
}

impl PageHinkley {
    pub fn new(delta: f64, lambda: f64, alpha: f64) -> Self {
        Self { delta, lambda, alpha }
    }

    /// Default λ and α with the given slack.
    pub fn with_delta(delta: f64) -> Self {
        Self {
            delta,
            ..Self::default()
        }
    }

    /// Index of the first observation at which the shift is detected.
    /// Non-finite observations are ignored.
    pub fn first_detection(&self, series: &[f64]) -> Option<usize> {
        let mut mean: Option<f64> = None;
        let mut cum = 0.0_f64;
        let mut cum_min = 0.0_f64;

        for (i, &x) in series.iter().enumerate() {
            if !x.is_finite() {
                continue;
            }
            // Seeded with the first observation so a flat stream never drifts.
            let m = match mean {
                None => x,
                Some(prev) => self.alpha * prev + (1.0 - self.alpha) * x,
            };
            mean = Some(m);

            cum += x - m - self.delta;
            cum_min = cum_min.min(cum);
            if cum - cum_min > self.lambda {
                return Some(i);
            }
        }
        None
    }

    pub fn detect(&self, series: &[f64]) -> bool {
        self.first_detection(series).is_some()
    }
}
