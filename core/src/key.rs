//! Composite record identity and flat entry keys.
//!
//! A record's composite key joins the values found at its schema's primary
//! key paths with `|`. A flat entry key appends the field path of one
//! translatable value: `CompositeKey|PathSpec`.

use crate::{PathSpec, Tree};

/// Separator between composite key parts and before the field path.
pub const KEY_SEPARATOR: char = '|';

/// Builds the composite key of `record` from its primary-key paths.
///
/// Bare field names are read directly from the record. `top.sub` paths read
/// `sub` from `top` when it is an object, or from its first element when it
/// is a non-empty array of objects. Anything else contributes an empty part.
/// Values containing `|` are not escaped.
///
/// # Examples
///
/// ```
/// use record_lens_core::{PathSpec, composite_key};
/// use serde_json::json;
///
/// let record = json!({
///     "id": "p_card-01",
///     "upgradeCount": 2,
///     "produceDescriptions": [
///         {"produceDescriptionType": "Text", "targetId": ""},
///         {"produceDescriptionType": "Other"},
///     ],
/// });
/// let keys = [
///     PathSpec::parse("id"),
///     PathSpec::parse("upgradeCount"),
///     PathSpec::parse("produceDescriptions.produceDescriptionType"),
///     PathSpec::parse("missing"),
/// ];
/// assert_eq!(composite_key(&record, &keys), "p_card-01|2|Text|");
/// ```
pub fn composite_key(record: &Tree, primary_keys: &[PathSpec]) -> String {
    primary_keys
        .iter()
        .map(|path| key_part(record, path))
        .collect::<Vec<_>>()
        .join("|")
}

fn key_part(record: &Tree, path: &PathSpec) -> String {
    let Some((top, sub)) = path.split_first() else {
        return String::new();
    };
    let Some(top_value) = record.get(top) else {
        return String::new();
    };

    let Some(sub) = sub else {
        return stringify_key_value(top_value);
    };

    let holder = match top_value {
        Tree::Array(items) => match items.first() {
            Some(first @ Tree::Object(_)) => first,
            _ => return String::new(),
        },
        Tree::Object(_) => top_value,
        _ => return String::new(),
    };

    holder
        .get(sub)
        .map(stringify_key_value)
        .unwrap_or_default()
}

/// Renders a primary-key value as it appears inside composite keys.
///
/// Strings are verbatim and numbers use their JSON form. Booleans and an
/// explicit `null` render as `True`, `False` and `None`, the spelling used by
/// existing translation files. Nested values render as compact JSON.
///
/// # Examples
///
/// ```
/// use record_lens_core::stringify_key_value;
/// use serde_json::json;
///
/// assert_eq!(stringify_key_value(&json!("abc")), "abc");
/// assert_eq!(stringify_key_value(&json!(12)), "12");
/// assert_eq!(stringify_key_value(&json!(true)), "True");
/// assert_eq!(stringify_key_value(&json!(null)), "None");
/// ```
pub fn stringify_key_value(value: &Tree) -> String {
    match value {
        Tree::String(text) => text.clone(),
        Tree::Number(number) => number.to_string(),
        Tree::Bool(true) => "True".to_string(),
        Tree::Bool(false) => "False".to_string(),
        Tree::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Joins a composite key and a field path into a flat entry key.
///
/// # Examples
///
/// ```
/// use record_lens_core::{PathSpec, flat_key};
///
/// assert_eq!(flat_key("42|3", &PathSpec::parse("items.text")), "42|3|items.text");
/// ```
pub fn flat_key(composite: &str, path: &PathSpec) -> String {
    format!("{composite}{KEY_SEPARATOR}{path}")
}

/// Splits a flat entry key into its composite key and field path.
///
/// Field paths never contain `|`, so the split happens at the last
/// separator. Returns `None` when the key has no separator.
///
/// # Examples
///
/// ```
/// use record_lens_core::split_flat_key;
///
/// let (composite, path) = split_flat_key("p_card-01|2|Text|name").unwrap();
/// assert_eq!(composite, "p_card-01|2|Text");
/// assert_eq!(path.as_str(), "name");
/// assert!(split_flat_key("no-separator").is_none());
/// ```
pub fn split_flat_key(key: &str) -> Option<(&str, PathSpec)> {
    key.rsplit_once(KEY_SEPARATOR)
        .map(|(composite, path)| (composite, PathSpec::parse(path)))
}
