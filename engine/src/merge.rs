//! Id-keyed merge, the write half of the push protocol.
//!
//! Incoming documents replace the held copy with the same id wholesale,
//! or append when the id is new. Positions of replaced documents are
//! kept, so repeated pushes leave the sequence stable.

use crate::collection::Document;

/// Outcome counts for one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub replaced: usize,
    pub appended: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.replaced + self.appended
    }
}

/// Merge `incoming` into `existing` by id. Within `incoming`, later
/// duplicates win, mirroring arrival order.
pub fn merge_by_id<T: Document>(existing: &mut Vec<T>, incoming: Vec<T>) -> MergeStats {
    let mut stats = MergeStats::default();
    for doc in incoming {
        match existing.iter().position(|held| held.id() == doc.id()) {
            Some(idx) => {
                existing[idx] = doc;
                stats.replaced += 1;
            }
            None => {
                existing.push(doc);
                stats.appended += 1;
            }
        }
    }
    stats
}
