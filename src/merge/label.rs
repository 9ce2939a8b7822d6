use crate::types::ChatStats;

use super::key::is_meaningful_label;

/// Pick the display label for a merged group.
///
/// The first meaningful label in input order wins; otherwise the label of the
/// most recently active constituent is used as-is.
pub fn resolve_label(group: &[&ChatStats], most_recent: &ChatStats) -> String {
    group
        .iter()
        .find(|chat| is_meaningful_label(chat.label.trim()))
        .map(|chat| chat.label.clone())
        .unwrap_or_else(|| most_recent.label.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(label: &str) -> ChatStats {
        ChatStats {
            label: label.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn prefers_first_name_over_handle_labels() {
        let number = chat("5551234567");
        let name = chat("Jane Doe");
        assert_eq!(resolve_label(&[&number, &name], &number), "Jane Doe");
        assert_eq!(resolve_label(&[&name, &number], &number), "Jane Doe");
    }

    #[test]
    fn skips_placeholder_labels() {
        let unknown = chat("UNKNOWN");
        let name = chat("Jane");
        assert_eq!(resolve_label(&[&unknown, &name], &unknown), "Jane");
    }

    #[test]
    fn qualifying_label_is_returned_verbatim() {
        let padded = chat("  Jane Doe ");
        let number = chat("5551234567");
        assert_eq!(resolve_label(&[&number, &padded], &number), "  Jane Doe ");
    }

    #[test]
    fn falls_back_to_most_recent_label() {
        let a = chat("5551234567");
        let b = chat("jane@example.com");
        assert_eq!(resolve_label(&[&a, &b], &b), "jane@example.com");
    }
}
