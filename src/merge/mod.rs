//! Collapse per-thread statistics that belong to the same correspondent.
//!
//! The pass is pure: raw records in, a full replacement list out.
//! - [`handle`]: canonical keys for phone numbers and emails
//! - [`key`]: the merge key deciding which records describe one person
//! - [`stats`]: field-by-field combination of a bucket
//! - [`id`]: stable negative ids for merged records
//! - [`label`]: display label selection

pub mod handle;
pub mod id;
pub mod key;
pub mod label;
pub mod stats;

use std::collections::HashMap;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::debug_log;
use crate::types::ChatStats;

pub use key::merge_key;
pub use stats::{combine_response_stats, merge_group};

/// Records sharing one merge key, in input order.
#[derive(Debug)]
pub struct Bucket<'a> {
    pub key: String,
    pub members: Vec<&'a ChatStats>,
}

/// Records that take part in grouping: one-to-one threads straight from the
/// extractor. Group threads and records produced by an earlier pass are not
/// regrouped.
fn is_mergeable(chat: &ChatStats) -> bool {
    !chat.is_group && !chat.is_merged()
}

/// Partition the mergeable records by merge key.
///
/// Buckets are returned in order of their first member's position in the
/// input.
pub fn group_by_identity(chats: &[ChatStats]) -> Vec<Bucket<'_>> {
    let mut buckets: Vec<Bucket<'_>> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for chat in chats.iter().filter(|chat| is_mergeable(chat)) {
        let key = merge_key(chat);
        match index_by_key.get(&key) {
            Some(&index) => buckets[index].members.push(chat),
            None => {
                index_by_key.insert(key.clone(), buckets.len());
                buckets.push(Bucket {
                    key,
                    members: vec![chat],
                });
            }
        }
    }

    buckets
}

/// Run one merge pass.
///
/// Output is every group record (and any record merged by an earlier pass)
/// unchanged in input order, followed by one merged record per bucket in
/// first-appearance order.
pub fn merge_chats(chats: &[ChatStats]) -> Vec<ChatStats> {
    let _timer = debug_log::PassTimer::start("merge_chats");
    let buckets = group_by_identity(chats);
    debug_log::log(
        "MERGE",
        "GROUPED",
        &format!("{} records into {} buckets", chats.len(), buckets.len()),
    );

    let merged: Vec<ChatStats> = buckets
        .into_par_iter()
        .filter_map(|bucket| merge_group(&bucket.key, &bucket.members))
        .collect();

    chats
        .iter()
        .filter(|chat| !is_mergeable(chat))
        .cloned()
        .chain(merged)
        .collect()
}

#[cfg(test)]
mod tests;
