use serde::{Deserialize, Serialize};

/// Configuration of [`PlateauScheduler`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PlateauConfig {
    /// Factor applied to the learning rate on a plateau.
    pub factor: f64,

    /// Number of epochs without improvement tolerated before reducing.
    pub patience: usize,

    /// Minimum increase of the metric counted as an improvement.
    pub min_delta: f32,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            factor: 0.1,
            patience: 5,
            min_delta: 0.0,
        }
    }
}

/// Reduces the learning rate when a maximized metric stops improving.
pub struct PlateauScheduler {
    config: PlateauConfig,
    best: Option<f32>,
    n_bad_epochs: usize,
}

impl PlateauScheduler {
    /// Creates a scheduler.
    pub fn new(config: PlateauConfig) -> Self {
        Self {
            config,
            best: None,
            n_bad_epochs: 0,
        }
    }

    /// Takes the metric of an epoch and returns the new learning rate if it was reduced.
    pub fn step(&mut self, metric: f32, lr: f64) -> Option<f64> {
        match self.best {
            Some(best) if metric <= best + self.config.min_delta => {
                self.n_bad_epochs += 1;
                if self.n_bad_epochs > self.config.patience {
                    self.n_bad_epochs = 0;
                    return Some(lr * self.config.factor);
                }
            }
            _ => {
                self.best = Some(metric);
                self.n_bad_epochs = 0;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_after_patience() {
        let mut s = PlateauScheduler::new(PlateauConfig {
            factor: 0.1,
            patience: 2,
            min_delta: 0.0,
        });
        assert_eq!(s.step(0.1, 1.0), None);
        assert_eq!(s.step(0.2, 1.0), None);
        assert_eq!(s.step(0.2, 1.0), None);
        assert_eq!(s.step(0.15, 1.0), None);
        assert_eq!(s.step(0.2, 1.0), Some(0.1));
        // Counter restarts after a reduction.
        assert_eq!(s.step(0.2, 0.1), None);
        assert_eq!(s.step(0.3, 0.1), None);
    }
}
