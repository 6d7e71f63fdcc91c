//! Split a sequence into fixed-size batches.
//!
//! Handy for building queries over long ID lists, e.g. `where id in [...]`
//! with at most a few hundred IDs per query.
//!
//! ```
//! use dimensions_client::chunks_of;
//!
//! let batches: Vec<Vec<u32>> = chunks_of(1..=5, 2).collect();
//! assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
//! ```

/// Iterator returned by [`chunks_of`].
#[derive(Debug, Clone)]
pub struct ChunksOf<I> {
    iter: I,
    size: usize,
}

/// Yield consecutive `Vec`s of at most `size` items, in order.
///
/// A `size` of zero yields nothing.
pub fn chunks_of<I: IntoIterator>(items: I, size: usize) -> ChunksOf<I::IntoIter> {
    ChunksOf {
        iter: items.into_iter(),
        size,
    }
}

impl<I: Iterator> Iterator for ChunksOf<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<I::Item> = self.iter.by_ref().take(self.size).collect();
        (!chunk.is_empty()).then_some(chunk)
    }
}
