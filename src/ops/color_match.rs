use std::collections::HashMap;

use image::Rgba;

#[inline(always)]
fn pack(c: Rgba<u8>) -> u32 {
    u32::from_le_bytes(c.0)
}

/// Memo of tolerance checks for one reference colour.
///
/// The cache remembers the `(reference, squared_tolerance)` pair it was filled
/// for and starts over when asked about a different one, so a stale cache can
/// only cost time, never correctness.
#[derive(Debug, Default)]
pub struct ComparisonCache {
    key: Option<(u32, u32)>,
    results: HashMap<u32, bool>,
}

impl ComparisonCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.results.clear();
    }

    #[inline]
    fn bind(&mut self, reference: Rgba<u8>, squared_tolerance: u32) {
        let key = (pack(reference), squared_tolerance);
        if self.key != Some(key) {
            self.results.clear();
            self.key = Some(key);
        }
    }
}

/// Sum of squared per-channel differences over R, G, B and A.
#[inline]
pub fn squared_distance(a: Rgba<u8>, b: Rgba<u8>) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(&x, &y)| {
            let d = x as i32 - y as i32;
            (d * d) as u32
        })
        .sum()
}

/// Is `candidate` within `squared_tolerance` of `reference`?
///
/// Bit-identical colours short-circuit without touching the cache. Otherwise
/// results are memoized per candidate colour.
#[inline]
pub fn colors_match(
    candidate: Rgba<u8>,
    reference: Rgba<u8>,
    squared_tolerance: u32,
    cache: &mut ComparisonCache,
) -> bool {
    if candidate == reference {
        return true;
    }
    cache.bind(reference, squared_tolerance);
    *cache
        .results
        .entry(pack(candidate))
        .or_insert_with(|| squared_distance(candidate, reference) <= squared_tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tolerance_needs_exact_match() {
        let mut cache = ComparisonCache::new();
        let white = Rgba([255, 255, 255, 255]);
        assert!(colors_match(white, white, 0, &mut cache));
        assert!(cache.is_empty());
        assert!(!colors_match(Rgba([254, 255, 255, 255]), white, 0, &mut cache));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn tolerance_is_inclusive_and_squared() {
        let mut cache = ComparisonCache::new();
        let base = Rgba([100, 100, 100, 255]);
        // distance² = 3² + 4² = 25
        let near = Rgba([103, 104, 100, 255]);
        assert_eq!(squared_distance(near, base), 25);
        assert!(colors_match(near, base, 25, &mut cache));
        assert!(!colors_match(near, base, 24, &mut cache));
    }

    #[test]
    fn alpha_channel_counts() {
        let mut cache = ComparisonCache::new();
        let opaque = Rgba([0, 0, 0, 255]);
        let faint = Rgba([0, 0, 0, 250]);
        assert!(!colors_match(faint, opaque, 16, &mut cache));
        assert!(colors_match(faint, opaque, 25, &mut cache));
    }

    #[test]
    fn cache_rebinds_on_new_reference() {
        let mut cache = ComparisonCache::new();
        let candidate = Rgba([10, 10, 10, 255]);
        assert!(!colors_match(candidate, Rgba([200, 200, 200, 255]), 100, &mut cache));
        // Same candidate, different reference: the old verdict must not leak.
        assert!(colors_match(candidate, Rgba([12, 10, 10, 255]), 100, &mut cache));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn matching_is_symmetric() {
        let samples = [
            Rgba([0, 0, 0, 0]),
            Rgba([255, 255, 255, 255]),
            Rgba([128, 0, 64, 200]),
            Rgba([120, 8, 60, 190]),
            Rgba([3, 250, 9, 255]),
        ];
        for tol in [0u32, 1, 100, 1000, 300_000] {
            for &a in &samples {
                for &b in &samples {
                    let ab = colors_match(a, b, tol, &mut ComparisonCache::new());
                    let ba = colors_match(b, a, tol, &mut ComparisonCache::new());
                    assert_eq!(ab, ba, "{a:?} vs {b:?} at {tol}");
                }
            }
        }
    }
}
