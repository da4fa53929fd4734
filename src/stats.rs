use super::*;

/// Shared per-job counters. Workers add in [`NUM_ITERATIONS`] batches to
/// amortize the atomic traffic; the progress ticker is the only reader.
///
/// [`NUM_ITERATIONS`]: crate::algorithm::NUM_ITERATIONS
#[derive(Debug, Default)]
pub struct Stats {
    iterations: AtomicU64,
    total_hashes: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.iterations.store(0, Ordering::Relaxed);
        self.total_hashes.store(0, Ordering::Relaxed);
    }

    pub fn add_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_hashes(&self, count: u64) {
        self.total_hashes.fetch_add(count, Ordering::Relaxed);
    }

    /// Eventually consistent `(iterations, total_hashes)` snapshot.
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.iterations.load(Ordering::Relaxed),
            self.total_hashes.load(Ordering::Relaxed),
        )
    }

    /// One progress line per tick. The caller owns `previous_total`, so
    /// the delta bookkeeping never races with the workers.
    pub fn report_progress(
        &self,
        height: i64,
        start: Instant,
        total_nonces: u32,
        previous_total: &mut u64,
    ) {
        let (iterations, total_hashes) = self.snapshot();

        let hashes = total_hashes.saturating_sub(*previous_total);
        *previous_total = total_hashes;

        let elapsed = start.elapsed().as_secs_f64().max(1e-6);
        let megahashes_per_second = total_hashes as f64 / elapsed / 1_000_000.0;
        let progress = total_hashes as f64 / f64::from(total_nonces) * 100.0;

        debug!(
            "b[{height}] {iterations} iterations | hashrate: {megahashes_per_second:.5} MH/s | \
             hashes: {hashes} | total: {total_hashes} | progress: {progress:.2}%"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new();

        stats.add_hashes(1000);
        stats.add_hashes(1000);
        stats.add_iteration();

        assert_eq!(stats.snapshot(), (1, 2000));
    }

    #[test]
    fn reset_clears_counters() {
        let stats = Stats::new();

        stats.add_hashes(5000);
        stats.add_iteration();
        stats.reset();

        assert_eq!(stats.snapshot(), (0, 0));
    }

    #[test]
    fn report_updates_previous_total() {
        let stats = Stats::new();
        let start = Instant::now();
        let mut previous_total = 0;

        stats.add_hashes(3000);
        stats.report_progress(1, start, u32::MAX, &mut previous_total);
        assert_eq!(previous_total, 3000);

        stats.add_hashes(1000);
        stats.report_progress(1, start, u32::MAX, &mut previous_total);
        assert_eq!(previous_total, 4000);
    }
}
