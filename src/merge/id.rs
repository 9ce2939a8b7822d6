//! Synthetic ids for merged records.
//!
//! Extractor ids are never negative, so every id produced here is forced
//! negative to keep the two spaces disjoint.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the UTF-8 bytes of `text`.
fn fnv1a_64(text: &str) -> u64 {
    text.as_bytes().iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Map a merge key to a stable, strictly negative identifier.
pub fn merged_chat_id(merge_key: &str) -> i64 {
    negative_id(fnv1a_64(merge_key))
}

/// Reinterpret a hash as `i64` and force it strictly negative. Zero maps to
/// 1 and `i64::MIN` to `i64::MAX` before negation.
fn negative_id(hash: u64) -> i64 {
    let id = match hash as i64 {
        0 => 1,
        i64::MIN => i64::MAX,
        other => other,
    };
    if id > 0 { -id } else { id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a_64(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64("foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn same_key_same_id() {
        let key = "handles:5551234567";
        assert_eq!(merged_chat_id(key), merged_chat_id(key));
        assert_ne!(merged_chat_id(key), merged_chat_id("handles:5551234568"));
    }

    #[test]
    fn sign_mapping_edge_cases() {
        assert_eq!(negative_id(0), -1);
        assert_eq!(negative_id(1 << 63), -i64::MAX);
        assert_eq!(negative_id(42), -42);
        assert_eq!(negative_id(i64::MAX as u64), -i64::MAX);
        assert_eq!(negative_id(-7i64 as u64), -7);
        assert_eq!(negative_id(u64::MAX), -1);
    }

    #[test]
    fn ids_are_always_negative() {
        for key in ["", "a", "foobar", "chat:0", "name:jane doe", "ABC:ABPerson"] {
            let id = merged_chat_id(key);
            assert!(id < 0, "{key} -> {id}");
        }
    }
}
