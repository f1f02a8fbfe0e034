use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// source of uniform samples in [0, 1) for jitter, progress, speed,
/// failure injection and id suffixes
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;

    /// uniform sample in [low, high)
    fn range(&self, low: f64, high: f64) -> f64 {
        low + self.next_f64() * (high - low)
    }

    fn chance(&self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

/// `StdRng` behind a lock; seed it for reproducible runs
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        rng.gen::<f64>()
    }
}

/// replays a fixed script of samples, cycling when exhausted
pub struct ScriptedRandom {
    samples: Vec<f64>,
    cursor: Mutex<usize>,
}

impl ScriptedRandom {
    pub fn new(samples: Vec<f64>) -> Self {
        // an empty script would have nothing to replay
        let samples = if samples.is_empty() { vec![0.0] } else { samples };
        Self {
            samples: samples
                .into_iter()
                .map(|s| s.clamp(0.0, 0.999_999_999))
                .collect(),
            cursor: Mutex::new(0),
        }
    }

    pub fn constant(sample: f64) -> Self {
        Self::new(vec![sample])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        let mut cursor = self.cursor.lock().unwrap_or_else(|p| p.into_inner());
        let sample = self.samples[*cursor % self.samples.len()];
        *cursor += 1;
        sample
    }
}
