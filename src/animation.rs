//! Threshold drift for animated sorting.
//!
//! The band widens and narrows around 0.5: high climbs while low falls until
//! high leaves `[0.5, 1.0]`, then both turn around.

/// Threshold change per second of host time.
pub const DRIFT_PER_SECOND: f32 = 0.15;

const PIVOT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    pub low: f32,
    pub high: f32,
    /// `+1.0` while the band widens, `-1.0` while it narrows.
    pub direction: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            low: PIVOT,
            high: PIVOT,
            direction: 1.0,
        }
    }
}

impl AnimationState {
    /// Move both thresholds one step of `delta_seconds`.
    ///
    /// At an edge the direction is set to point back into `[0.5, 1.0]`
    /// rather than negated. A negation flips again on the next step while
    /// `high` is still outside the range after a short tick, and the band
    /// then runs away. Setting it keeps the turnaround to one flip.
    pub fn advance(self, delta_seconds: f32) -> Self {
        let step = DRIFT_PER_SECOND * delta_seconds.max(0.0) * self.direction;
        let high = self.high + step;
        let low = self.low - step;
        // Point back into [PIVOT, 1.0]; never a plain negation.
        let direction = if high > 1.0 {
            -1.0
        } else if high < PIVOT {
            1.0
        } else {
            self.direction
        };
        Self {
            low,
            high,
            direction,
        }
    }

    pub fn thresholds(&self) -> (f32, f32) {
        (self.low, self.high)
    }
}
