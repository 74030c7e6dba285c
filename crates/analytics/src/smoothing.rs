//! Exponential moving average of count and density.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothedState {
    pub count: f64,
    pub density: f64,
}

/// Stateful EMA filter, strictly sequential per session.
///
/// The state is `None` until the first update, which seeds the filter with
/// the raw inputs directly; a legitimate zero reading on frame one therefore
/// seeds as zero instead of being mistaken for "uninitialized".
#[derive(Debug)]
pub struct Smoother {
    alpha: f64,
    state: Option<SmoothedState>,
}

impl Smoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    pub fn update(&mut self, raw_count: f64, raw_density: f64) -> SmoothedState {
        let next = match self.state {
            None => SmoothedState {
                count: raw_count,
                density: raw_density,
            },
            Some(prev) => SmoothedState {
                count: self.alpha * raw_count + (1.0 - self.alpha) * prev.count,
                density: self.alpha * raw_density + (1.0 - self.alpha) * prev.density,
            },
        };
        self.state = Some(next);
        next
    }

    pub fn current(&self) -> Option<SmoothedState> {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_seeds_with_raw_values() {
        let mut smoother = Smoother::new(0.3);
        assert_eq!(smoother.current(), None);

        let state = smoother.update(10.0, 0.4);
        assert_eq!(state.count, 10.0);
        assert_eq!(state.density, 0.4);
    }

    #[test]
    fn test_second_update_applies_ema() {
        let mut smoother = Smoother::new(0.3);
        smoother.update(10.0, 0.0);
        let state = smoother.update(20.0, 1.0);
        assert!((state.count - 13.0).abs() < 1e-9);
        assert!((state.density - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_zero_first_frame_is_a_real_seed() {
        let mut smoother = Smoother::new(0.5);
        smoother.update(0.0, 0.0);
        // A zero seed must not be treated as uninitialized on the next frame.
        let state = smoother.update(10.0, 0.2);
        assert!((state.count - 5.0).abs() < 1e-9);
        assert!((state.density - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_reset_reseeds() {
        let mut smoother = Smoother::new(0.3);
        smoother.update(10.0, 0.5);
        smoother.reset();
        let state = smoother.update(40.0, 0.8);
        assert_eq!(state.count, 40.0);
        assert_eq!(state.density, 0.8);
    }
}
