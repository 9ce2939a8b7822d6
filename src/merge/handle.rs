//! Canonical comparison keys for raw contact handles.

/// Protocol markers that may precede a handle, matched case-insensitively.
const HANDLE_PREFIXES: &[&str] = &["imessage:", "sms:", "mailto:", "tel:", "p:", "e:"];

/// Number of trailing digits that identify a phone number regardless of
/// country code.
const NATIONAL_DIGITS: usize = 10;

/// Normalize a raw handle into zero or more keys usable for equality checks.
///
/// Emails collapse to their lowercased form. Phone numbers collapse to their
/// digits; numbers longer than ten digits also yield their last ten digits so
/// that `+15551234567` and `5551234567` share a key.
pub fn normalize_handle(raw: &str) -> Vec<String> {
    let cleaned = strip_protocol_prefix(raw.trim()).trim();
    if cleaned.is_empty() {
        return Vec::new();
    }

    if cleaned.contains('@') {
        return vec![cleaned.to_lowercase()];
    }

    let digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return vec![cleaned.to_string()];
    }

    if digits.len() > NATIONAL_DIGITS {
        let suffix = digits[digits.len() - NATIONAL_DIGITS..].to_string();
        vec![digits, suffix]
    } else {
        vec![digits]
    }
}

fn strip_protocol_prefix(handle: &str) -> &str {
    for prefix in HANDLE_PREFIXES {
        if let Some(head) = handle.get(..prefix.len())
            && head.eq_ignore_ascii_case(prefix)
        {
            return &handle[prefix.len()..];
        }
    }
    handle
}
