use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::random::RandomSource;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// produces `file-<millis>-<suffix>` and `session-<millis>-<suffix>` ids.
///
/// the suffix is random draws offset digit by digit with a per-generator
/// counter, so one generator (and its clones) never repeats an id within a
/// millisecond even when the random source is scripted.
#[derive(Clone)]
pub struct IdGenerator {
    random: Arc<dyn RandomSource>,
    counter: Arc<AtomicU64>,
}

impl IdGenerator {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self {
            random,
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn file_id(&self) -> String {
        self.prefixed("file")
    }

    pub fn session_id(&self) -> String {
        self.prefixed("session")
    }

    fn prefixed(&self, prefix: &str) -> String {
        format!(
            "{}-{}-{}",
            prefix,
            chrono::Utc::now().timestamp_millis(),
            self.suffix()
        )
    }

    fn suffix(&self) -> String {
        let radix = BASE36.len() as u64;
        let mut count = self.counter.fetch_add(1, Ordering::Relaxed);

        let mut chars = [0u8; SUFFIX_LEN];
        // least significant counter digit goes last
        for slot in chars.iter_mut().rev() {
            let drawn = ((self.random.next_f64() * radix as f64) as u64).min(radix - 1);
            *slot = BASE36[((drawn + count % radix) % radix) as usize];
            count /= radix;
        }
        chars.iter().map(|&c| c as char).collect()
    }
}
