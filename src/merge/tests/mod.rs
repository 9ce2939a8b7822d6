//! Tests for the merge pass.
//!
//! - grouping: partitioning, group passthrough, output ordering
//! - fields: each field combination rule
//! - properties: sums, determinism, idempotence boundary


use crate::types::{ChatStats, FrequencyEntry, ResponseStat, Totals};

// ============================================================================
// Test Helpers
// ============================================================================

/// A one-to-one thread with the given handles and message totals.
pub fn make_chat(id: i64, label: &str, handles: &[&str], sent: u64, received: u64) -> ChatStats {
    ChatStats {
        chat_id: id,
        chat_identifier: handles.first().map(|h| h.to_string()).unwrap_or_default(),
        label: label.to_string(),
        handles: handles.iter().map(|h| h.to_string()).collect(),
        participant_count: 2,
        totals: Totals {
            sent,
            received,
            total: sent + received,
        },
        ..Default::default()
    }
}

pub fn make_group_chat(id: i64, label: &str, handles: &[&str]) -> ChatStats {
    ChatStats {
        is_group: true,
        participant_count: handles.len() as u32 + 1,
        ..make_chat(id, label, handles, 10, 20)
    }
}

pub fn response(count: u64, avg: Option<f64>) -> ResponseStat {
    ResponseStat {
        count,
        avg_minutes: avg,
        median_minutes: avg,
        p90_minutes: avg.map(|a| a * 2.0),
    }
}

pub fn entries(pairs: &[(&str, u64)]) -> Vec<FrequencyEntry> {
    pairs
        .iter()
        .map(|(key, count)| FrequencyEntry::new(*key, *count))
        .collect()
}

/// Merge exactly these records as one bucket.
pub fn merge_all(chats: &[ChatStats]) -> ChatStats {
    let refs: Vec<&ChatStats> = chats.iter().collect();
    super::merge_group("test-key", &refs).expect("non-empty group")
}
