//! Memoization of the current code per time step.
//!
//! Displays that refresh every second only need a new code once per period. The
//! cache keeps the last `(time step, code)` pair of a single engine and hands it
//! out until the clock moves into the next step.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::{
    totp::{now, CodeSnapshot},
    OtpCode, OtpError, Totp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheEntry {
    time_step: u64,
    code: OtpCode,
}

/// How often the cache answered from memory versus recomputed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    stats: CacheStats,
}

#[derive(Debug)]
pub struct TimeStepCache {
    engine: Totp,
    state: Mutex<CacheState>,
}

impl TimeStepCache {
    pub fn new(engine: Totp) -> Self {
        Self {
            engine,
            state: Mutex::default(),
        }
    }

    pub fn engine(&self) -> &Totp {
        &self.engine
    }

    /// Returns the code for the time step of `seconds_since_epoch`, computing it
    /// only when that step differs from the cached one.
    ///
    /// Always equal to [`Totp::generate`] for the same instant.
    pub fn current_code(&self, seconds_since_epoch: u64) -> OtpCode {
        let time_step = self.engine.time_step(seconds_since_epoch);
        let mut state = self.lock();

        if let Some(entry) = state.entry.filter(|e| e.time_step == time_step) {
            state.stats.hits += 1;
            trace!(time_step, "using cached code");
            return entry.code;
        }

        // Computed while holding the lock, callers racing across a boundary wait
        // for this result instead of repeating the work.
        let code = self.engine.generate_at_step(time_step);
        state.entry = Some(CacheEntry { time_step, code });
        state.stats.misses += 1;
        debug!(time_step, "recalculated code");

        code
    }

    pub fn snapshot(&self, seconds_since_epoch: u64) -> CodeSnapshot {
        CodeSnapshot {
            code: self.current_code(seconds_since_epoch),
            remaining_seconds: self.engine.remaining_seconds(seconds_since_epoch),
            period: self.engine.config().period(),
        }
    }

    pub fn current_code_now(&self) -> Result<OtpCode, OtpError> {
        Ok(self.current_code(now()?))
    }

    pub fn snapshot_now(&self) -> Result<CodeSnapshot, OtpError> {
        Ok(self.snapshot(now()?))
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    // The state is only ever replaced whole, a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use crate::{
        cache::{CacheStats, TimeStepCache},
        hotp::COMPUTATIONS,
        Config, Totp,
    };

    #[fixture]
    fn cache() -> TimeStepCache {
        let engine = Totp::new(
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
            Config::default().with_digits(8),
        )
        .unwrap();

        TimeStepCache::new(engine)
    }

    fn computations() -> usize {
        COMPUTATIONS.with(|c| c.get())
    }

    #[rstest]
    fn one_computation_per_step(cache: TimeStepCache) {
        let before = computations();

        for t in 30..60 {
            assert_eq!("94287082", cache.current_code(t).to_string());
        }

        assert_eq!(1, computations() - before);
        assert_eq!(CacheStats { hits: 29, misses: 1 }, cache.stats());
    }

    #[rstest]
    fn matches_engine_across_steps(cache: TimeStepCache) {
        let timestamps = [59, 60, 61, 1111111109, 1111111111, 59, 20000000000];

        for t in timestamps {
            assert_eq!(cache.engine().generate(t), cache.current_code(t));
        }

        assert_eq!(CacheStats { hits: 1, misses: 6 }, cache.stats());
    }

    #[rstest]
    fn snapshot_uses_cached_code(cache: TimeStepCache) {
        let first = cache.snapshot(31);
        let second = cache.snapshot(58);

        assert_eq!(first.code, second.code);
        assert_eq!(29, first.remaining_seconds);
        assert_eq!(2, second.remaining_seconds);
        assert_eq!(1, cache.stats().misses);
    }

    #[rstest]
    fn concurrent_callers_share_one_computation(cache: TimeStepCache) {
        let cache = Arc::new(cache);
        let expected = cache.engine().generate(1111111109);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.current_code(1111111109))
            })
            .collect();

        for handle in handles {
            assert_eq!(expected, handle.join().unwrap());
        }

        assert_eq!(CacheStats { hits: 7, misses: 1 }, cache.stats());
    }
}
