// src/utils/iter.rs

//! Iterator helpers for unbounded record streams.

/// Partition an iterator into consecutive chunks of `size` items (the last
/// chunk may be shorter). Only one chunk is materialized at a time, so the
/// input can be arbitrarily large.
pub fn chunks<I>(iter: I, size: usize) -> Chunks<I::IntoIter>
where
    I: IntoIterator,
{
    assert!(size > 0, "chunk size must be > 0");
    Chunks {
        iter: iter.into_iter(),
        size,
    }
}

pub struct Chunks<I> {
    iter: I,
    size: usize,
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<I::Item> = self.iter.by_ref().take(self.size).collect();
        if chunk.is_empty() { None } else { Some(chunk) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_exact_chunks_with_remainder() {
        let sizes: Vec<usize> = chunks(0..10_003, 10_000).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![10_000, 3]);
    }

    #[test]
    fn preserves_order() {
        let flat: Vec<i32> = chunks(0..7, 3).flatten().collect();
        assert_eq!(flat, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert_eq!(chunks(std::iter::empty::<i32>(), 5).count(), 0);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let sizes: Vec<usize> = chunks(0..6, 3).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![3, 3]);
    }
}
