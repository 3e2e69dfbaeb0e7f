//! A percentile-smoothed estimate of the stream clock, derived from a histogram of
//! `observed_ts - wall_now` deltas across two decaying time windows.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::clock::Clock;

const NUM_VALUE_BUCKETS: usize = 100;
const NUM_TIME_SLOTS: usize = 100;

/// Which rolling window to read a percentile estimate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Short window, default 60s: reacts quickly to clock skew changes.
    Fast,
    /// Long window, default 600s: smooths out short bursts of jitter.
    Slow,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    count: u64,
    sum: i64,
}

/// One time-slice of a window's ring: an independent value histogram covering
/// `window_duration / NUM_TIME_SLOTS` of wall time. Slices are identified by `epoch`, the
/// slice-duration-sized period index they belong to; observing a new epoch for a slot clears it,
/// which is how the ring decays old data without a background sweep.
struct TimeSlot {
    epoch: i64,
    buckets: [Bucket; NUM_VALUE_BUCKETS],
}

impl Default for TimeSlot {
    fn default() -> Self {
        TimeSlot {
            epoch: i64::MIN,
            buckets: [Bucket::default(); NUM_VALUE_BUCKETS],
        }
    }
}

struct LevelHistogram {
    slot_duration_ms: i64,
    slots: Vec<TimeSlot>,
}

impl LevelHistogram {
    fn new(window: Duration) -> Self {
        let window_ms = (window.as_millis() as i64).max(NUM_TIME_SLOTS as i64);
        let slot_duration_ms = (window_ms / NUM_TIME_SLOTS as i64).max(1);
        LevelHistogram {
            slot_duration_ms,
            slots: (0..NUM_TIME_SLOTS).map(|_| TimeSlot::default()).collect(),
        }
    }

    fn slot_index(&self, now_ms: i64) -> usize {
        let epoch = now_ms.div_euclid(self.slot_duration_ms);
        (epoch.rem_euclid(NUM_TIME_SLOTS as i64)) as usize
    }

    fn epoch_of(&self, now_ms: i64) -> i64 {
        now_ms.div_euclid(self.slot_duration_ms)
    }

    fn add(&mut self, now_ms: i64, bucket_index: usize, delta: i64) {
        let idx = self.slot_index(now_ms);
        let epoch = self.epoch_of(now_ms);
        let slot = &mut self.slots[idx];
        if slot.epoch != epoch {
            *slot = TimeSlot {
                epoch,
                buckets: [Bucket::default(); NUM_VALUE_BUCKETS],
            };
        }
        let bucket = &mut slot.buckets[bucket_index];
        bucket.count += 1;
        bucket.sum += delta;
    }

    /// Merges all slots within `NUM_TIME_SLOTS` periods of `now_ms` (i.e. not yet rotated out)
    /// into one set of value buckets.
    fn merged_live_buckets(&self, now_ms: i64) -> [Bucket; NUM_VALUE_BUCKETS] {
        let current_epoch = self.epoch_of(now_ms);
        let mut merged = [Bucket::default(); NUM_VALUE_BUCKETS];
        for slot in &self.slots {
            if slot.epoch == i64::MIN {
                continue;
            }
            let age = current_epoch - slot.epoch;
            if age < 0 || age as usize >= NUM_TIME_SLOTS {
                continue; // rotated out
            }
            for (m, b) in merged.iter_mut().zip(slot.buckets.iter()) {
                m.count += b.count;
                m.sum += b.sum;
            }
        }
        merged
    }
}

struct Histogram {
    max_delta_ms: i64,
    bucket_width_ms: f64,
    fast: LevelHistogram,
    slow: LevelHistogram,
    ref_now_ms: i64,
}

impl Histogram {
    fn bucket_index(&self, clamped_delta: i64) -> usize {
        let offset = (clamped_delta + self.max_delta_ms) as f64;
        let idx = (offset / self.bucket_width_ms) as usize;
        idx.min(NUM_VALUE_BUCKETS - 1)
    }

    fn add_observation(&mut self, now_ms: i64, delta: i64) {
        self.ref_now_ms = now_ms;
        let clamped = delta.clamp(-self.max_delta_ms, self.max_delta_ms);
        let idx = self.bucket_index(clamped);
        self.fast.add(now_ms, idx, clamped);
        self.slow.add(now_ms, idx, clamped);
    }

    fn percentile(&self, pct: f64, window: Window) -> i64 {
        let level = match window {
            Window::Fast => &self.fast,
            Window::Slow => &self.slow,
        };
        let buckets = level.merged_live_buckets(self.ref_now_ms);
        let total: u64 = buckets.iter().map(|b| b.count).sum();
        if total == 0 {
            return 0;
        }
        let target_rank = ((pct / 100.0) * total as f64).ceil() as u64;
        let mut cumulative = 0u64;
        for bucket in buckets.iter() {
            if bucket.count == 0 {
                continue;
            }
            cumulative += bucket.count;
            if cumulative >= target_rank.max(1) {
                return bucket.sum / bucket.count as i64;
            }
        }
        // All observations clamped above the target rank (shouldn't happen with a valid
        // histogram); fall back to the highest occupied bucket's mean.
        buckets
            .iter()
            .rev()
            .find(|b| b.count > 0)
            .map(|b| b.sum / b.count as i64)
            .unwrap_or(0)
    }
}

/// Estimates the current stream clock from a histogram of `(observed_ts - wall_now)` deltas.
///
/// Never blocks readers: `add_observation` and `stream_now` share a single short-held mutex, per
/// the design's "single-threaded access assumed; wrap in a mutex if readers share it with
/// writers" note.
pub struct StreamTime {
    clock: Arc<dyn Clock>,
    pct: f64,
    inner: Mutex<Histogram>,
}

impl StreamTime {
    pub fn new(clock: Arc<dyn Clock>, max_delta: Duration, pct: f64) -> Self {
        Self::with_windows(
            clock,
            max_delta,
            pct,
            Duration::from_secs(60),
            Duration::from_secs(600),
        )
    }

    pub fn with_windows(
        clock: Arc<dyn Clock>,
        max_delta: Duration,
        pct: f64,
        fast_window: Duration,
        slow_window: Duration,
    ) -> Self {
        assert!(pct > 0.0 && pct < 100.0, "percentile must be in (0, 100)");
        let max_delta_ms = max_delta.as_millis() as i64;
        StreamTime {
            clock,
            pct,
            inner: Mutex::new(Histogram {
                max_delta_ms,
                bucket_width_ms: (2 * max_delta_ms) as f64 / NUM_VALUE_BUCKETS as f64,
                fast: LevelHistogram::new(fast_window),
                slow: LevelHistogram::new(slow_window),
                ref_now_ms: 0,
            }),
        }
    }

    /// Records an observed row timestamp against the current wall clock.
    pub fn add_observation(&self, ts_ms: i64) {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        inner.add_observation(now, ts_ms - now);
    }

    /// `ref_now + percentile_estimate(pct, window)`: the estimated current position of the
    /// stream clock.
    pub fn stream_now(&self, window: Window) -> i64 {
        let inner = self.inner.lock();
        inner.ref_now_ms + inner.percentile(self.pct, window)
    }

    pub fn current_delta(&self, window: Window) -> i64 {
        self.inner.lock().percentile(self.pct, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    // Scenario: StreamTime single sample
    #[test]
    fn single_sample_yields_exact_stream_now() {
        let clock = Arc::new(TestClock::new(1_000_000));
        let st = StreamTime::new(clock.clone(), Duration::from_secs(5), 95.0);
        st.add_observation(1_000_000);
        assert_eq!(st.stream_now(Window::Fast), 1_000_000);
        assert_eq!(st.stream_now(Window::Slow), 1_000_000);
    }

    #[test]
    fn positive_skew_is_reflected_in_the_estimate() {
        let clock = Arc::new(TestClock::new(0));
        let st = StreamTime::new(clock.clone(), Duration::from_secs(5), 50.0);
        // Every observed ts arrives 200ms "ahead" of wall clock.
        for t in 0..20 {
            clock.set(t * 100);
            st.add_observation(t * 100 + 200);
        }
        let delta = st.current_delta(Window::Fast);
        assert_eq!(delta, 200);
    }

    #[test]
    fn add_observation_never_blocks_a_concurrent_reader_for_long() {
        let clock = Arc::new(TestClock::new(0));
        let st = Arc::new(StreamTime::new(clock, Duration::from_secs(1), 90.0));
        st.add_observation(10);
        // stream_now must return promptly without deadlocking against future writers.
        let _ = st.stream_now(Window::Fast);
        st.add_observation(20);
        let _ = st.stream_now(Window::Slow);
    }
}
