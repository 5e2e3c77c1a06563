//! Single-string encoding of string arrays.
//!
//! Flat maps only carry strings, so arrays of text travel as one value:
//! a prefix sentinel followed by the items joined with a separator sentinel.
//! Both sentinels are assumed never to occur in source text.
//!
//! ```
//! use record_lens_core::{decode_list, encode_list};
//!
//! let encoded = encode_list(["a", "b", "c"]);
//! assert_eq!(encoded, "[LA_F]a[LA_N_F]b[LA_N_F]c");
//! assert_eq!(decode_list(&encoded), Some(vec!["a".to_string(), "b".into(), "c".into()]));
//! ```

/// Prefix marking a list-encoded value.
pub const LIST_PREFIX: &str = "[LA_F]";

/// Separator between list-encoded items.
pub const LIST_SEPARATOR: &str = "[LA_N_F]";

/// Encodes string items into a single list-encoded value.
pub fn encode_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from(LIST_PREFIX);
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            out.push_str(LIST_SEPARATOR);
        }
        out.push_str(item.as_ref());
    }
    out
}

/// Decodes a list-encoded value.
///
/// Returns `None` when `value` does not carry the list prefix. An empty
/// body decodes to a single empty item, which is indistinguishable from an
/// encoded empty array; callers resolve that per field.
///
/// ```
/// use record_lens_core::{decode_list, encode_list};
///
/// assert_eq!(decode_list(&encode_list(Vec::<String>::new())), Some(vec![String::new()]));
/// assert_eq!(decode_list("plain text"), None);
/// ```
pub fn decode_list(value: &str) -> Option<Vec<String>> {
    let body = value.strip_prefix(LIST_PREFIX)?;
    Some(body.split(LIST_SEPARATOR).map(str::to_string).collect())
}
