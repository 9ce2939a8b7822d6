//! Merge key resolution: decides which raw records describe the same person.

use std::collections::BTreeSet;

use crate::types::ChatStats;

use super::handle::normalize_handle;

pub const HANDLE_KEY_PREFIX: &str = "handles:";
pub const LABEL_KEY_PREFIX: &str = "name:";
pub const CHAT_KEY_PREFIX: &str = "chat:";
const HANDLE_KEY_DELIMITER: &str = "|";

/// Label the extractor uses when it could not name a thread.
const PLACEHOLDER_LABEL: &str = "unknown";

/// Resolve the grouping key for a non-group record.
///
/// Priority: directory contact key, then normalized handles, then a usable
/// label, then the record's own id (which always yields a singleton group).
pub fn merge_key(chat: &ChatStats) -> String {
    if let Some(contact_key) = chat.contact_key.as_deref()
        && !contact_key.is_empty()
    {
        return contact_key.to_string();
    }

    let handle_keys: BTreeSet<String> = chat
        .handles
        .iter()
        .flat_map(|handle| normalize_handle(handle))
        .filter(|key| !key.is_empty())
        .collect();
    if !handle_keys.is_empty() {
        let joined = handle_keys
            .into_iter()
            .collect::<Vec<_>>()
            .join(HANDLE_KEY_DELIMITER);
        return format!("{HANDLE_KEY_PREFIX}{joined}");
    }

    let label = chat.label.trim();
    if is_meaningful_label(label) {
        return format!("{LABEL_KEY_PREFIX}{}", label.to_lowercase());
    }

    format!("{CHAT_KEY_PREFIX}{}", chat.chat_id)
}

/// True when the text reads like a phone number or email rather than a name.
pub fn looks_like_handle(text: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.contains('@') {
        return true;
    }
    let has_digit = lower.chars().any(|c| c.is_ascii_digit());
    let has_letter = lower.chars().any(char::is_alphabetic);
    has_digit && !has_letter
}

pub fn is_placeholder_label(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(PLACEHOLDER_LABEL)
}

/// A label worth showing (and grouping by): non-empty, not a raw handle and
/// not the extractor's placeholder.
pub fn is_meaningful_label(text: &str) -> bool {
    !text.trim().is_empty() && !looks_like_handle(text) && !is_placeholder_label(text)
}
