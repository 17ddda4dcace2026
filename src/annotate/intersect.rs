//! Interval intersection backends.
//!
//! The resolver only needs two set operations from an intersection backend:
//! the overlapping pairs of A and B, and the members of A that overlap
//! nothing in B. Both are expressed over indices into the caller's slices
//! so results can be mapped back without copying intervals.

use ahash::AHashMap;
use anyhow::Result;
use rayon::prelude::*;

use crate::types::{GenomicInterval, Strand};

/// A backend that intersects two interval sets.
///
/// Overlap is closed-interval and requires equal chromosome and strand.
pub trait IntersectEngine {
    /// All `(a_index, b_index)` pairs of overlapping intervals, ordered by
    /// `a_index` then `b_index`.
    fn overlap<A, B>(&self, a: &[A], b: &[B]) -> Result<Vec<(usize, usize)>>
    where
        A: GenomicInterval + Sync,
        B: GenomicInterval + Sync;

    /// Indices of `a` that overlap nothing in `b`, ascending.
    fn subtract<A, B>(&self, a: &[A], b: &[B]) -> Result<Vec<usize>>
    where
        A: GenomicInterval + Sync,
        B: GenomicInterval + Sync;
}

/// In-process intersection over a per-chromosome, per-strand sorted index.
///
/// Queries for one call run on the rayon pool; results are collected in
/// input order so output is deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexedIntersect;

impl IndexedIntersect {
    pub fn new() -> Self {
        IndexedIntersect
    }
}

impl IntersectEngine for IndexedIntersect {
    fn overlap<A, B>(&self, a: &[A], b: &[B]) -> Result<Vec<(usize, usize)>>
    where
        A: GenomicInterval + Sync,
        B: GenomicInterval + Sync,
    {
        let index = IntervalIndex::new(b);
        let per_query: Vec<Vec<usize>> = a.par_iter().map(|q| index.hits(q)).collect();

        Ok(per_query
            .into_iter()
            .enumerate()
            .flat_map(|(ai, hits)| hits.into_iter().map(move |bi| (ai, bi)))
            .collect())
    }

    fn subtract<A, B>(&self, a: &[A], b: &[B]) -> Result<Vec<usize>>
    where
        A: GenomicInterval + Sync,
        B: GenomicInterval + Sync,
    {
        let index = IntervalIndex::new(b);
        let hit: Vec<bool> = a.par_iter().map(|q| index.any_hit(q)).collect();

        Ok(hit
            .into_iter()
            .enumerate()
            .filter_map(|(ai, h)| (!h).then_some(ai))
            .collect())
    }
}

/// Intervals of one chromosome and strand, sorted by start.
#[derive(Debug, Default)]
struct Bucket {
    order: Vec<usize>,
    /// Longest interval span in the bucket, bounds the backwards search.
    max_span: i64,
}

/// Sorted lookup structure over a borrowed interval slice.
struct IntervalIndex<'a, B> {
    items: &'a [B],
    buckets: AHashMap<&'a str, [Bucket; 2]>,
}

fn strand_slot(strand: Strand) -> usize {
    match strand {
        Strand::Positive => 0,
        Strand::Negative => 1,
    }
}

impl<'a, B: GenomicInterval> IntervalIndex<'a, B> {
    fn new(items: &'a [B]) -> Self {
        let mut buckets: AHashMap<&'a str, [Bucket; 2]> = AHashMap::new();

        for (i, item) in items.iter().enumerate() {
            let bucket = &mut buckets.entry(item.chrom()).or_default()[strand_slot(item.strand())];
            bucket.order.push(i);
            bucket.max_span = bucket.max_span.max(item.end() - item.start());
        }

        for pair in buckets.values_mut() {
            for bucket in pair.iter_mut() {
                bucket.order.sort_by_key(|&i| (items[i].start(), i));
            }
        }

        IntervalIndex { items, buckets }
    }

    /// Candidates whose start lies in `[query.start - max_span, query.end]`.
    fn candidates<'s, Q: GenomicInterval>(
        &'s self,
        query: &'s Q,
    ) -> impl Iterator<Item = usize> + 's {
        let bucket = self
            .buckets
            .get(query.chrom())
            .map(|pair| &pair[strand_slot(query.strand())]);

        let order: &[usize] = match bucket {
            Some(b) => {
                let search_start = query.start().saturating_sub(b.max_span);
                let first = b
                    .order
                    .partition_point(|&i| self.items[i].start() < search_start);
                &b.order[first..]
            }
            None => &[],
        };

        order
            .iter()
            .copied()
            .take_while(move |&i| self.items[i].start() <= query.end())
            .filter(move |&i| self.items[i].end() >= query.start())
    }

    /// Overlapping item indices, ascending.
    fn hits<Q: GenomicInterval>(&self, query: &Q) -> Vec<usize> {
        let mut hits: Vec<usize> = self.candidates(query).collect();
        hits.sort_unstable();
        hits
    }

    fn any_hit<Q: GenomicInterval>(&self, query: &Q) -> bool {
        self.candidates(query).next().is_some()
    }
}
