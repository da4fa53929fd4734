use super::*;

/// Inclusive range of nonces assigned to a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    pub min: u32,
    pub max: u32,
}

/// Splits `[start, total]` into one inclusive range per thread. Ranges
/// are disjoint and the last one absorbs the division remainder.
pub fn partition(total: u32, start: u32, threads: u8) -> BTreeMap<u8, NonceRange> {
    assert!(threads >= 1, "threads must be at least 1");

    let per = (total - start) / u32::from(threads);

    let mut ranges = BTreeMap::new();

    for i in 0..threads {
        let min = start + u32::from(i) * per;
        let max = if i == threads - 1 {
            total
        } else {
            min + per - 1
        };

        ranges.insert(i, NonceRange { min, max });
    }

    ranges
}
