//! Pre-translation helpers over flat maps.
//!
//! Translators usually work on source text rather than on flat keys. These
//! helpers turn a flat map into a `source → translation` dictionary, apply a
//! filled dictionary back onto the keys, and compute what changed between
//! two exports so only new text is sent out.

use crate::FlatMap;

/// Returns a dictionary with every distinct source text mapped to `""`.
///
/// # Examples
///
/// ```
/// use record_lens_core::{FlatMap, source_dictionary};
///
/// let mut flat = FlatMap::new();
/// flat.insert("1|name".into(), "剣".into());
/// flat.insert("2|name".into(), "剣".into());
/// flat.insert("3|name".into(), "盾".into());
///
/// let dict = source_dictionary(&flat);
/// assert_eq!(dict.len(), 2);
/// assert_eq!(dict["剣"], "");
/// ```
pub fn source_dictionary(entries: &FlatMap) -> FlatMap {
    entries
        .values()
        .map(|value| (value.clone(), String::new()))
        .collect()
}

/// Replaces each value by its dictionary translation when one exists.
///
/// Values missing from the dictionary, or mapped to `""` (not translated
/// yet), keep their source text.
///
/// # Examples
///
/// ```
/// use record_lens_core::{FlatMap, apply_dictionary};
///
/// let mut flat = FlatMap::new();
/// flat.insert("1|name".into(), "剣".into());
/// flat.insert("2|name".into(), "盾".into());
/// let mut dict = FlatMap::new();
/// dict.insert("剣".into(), "Sword".into());
///
/// let applied = apply_dictionary(&flat, &dict);
/// assert_eq!(applied["1|name"], "Sword");
/// assert_eq!(applied["2|name"], "盾");
/// ```
pub fn apply_dictionary(entries: &FlatMap, dictionary: &FlatMap) -> FlatMap {
    entries
        .iter()
        .map(|(key, value)| {
            let translated = dictionary
                .get(value)
                .filter(|translated| !translated.is_empty())
                .unwrap_or(value);
            (key.clone(), translated.clone())
        })
        .collect()
}

/// Returns a dictionary of the source text whose keys are new in `current`.
///
/// An entry counts as pending when its flat key does not exist in
/// `previous` (the export the existing translations were made from).
///
/// # Examples
///
/// ```
/// use record_lens_core::{FlatMap, pending_entries};
///
/// let mut previous = FlatMap::new();
/// previous.insert("1|name".into(), "Sword".into());
/// let mut current = FlatMap::new();
/// current.insert("1|name".into(), "剣".into());
/// current.insert("2|name".into(), "盾".into());
///
/// let todo = pending_entries(&current, &previous);
/// assert_eq!(todo.keys().collect::<Vec<_>>(), vec!["盾"]);
/// ```
pub fn pending_entries(current: &FlatMap, previous: &FlatMap) -> FlatMap {
    current
        .iter()
        .filter(|(key, _)| !previous.contains_key(*key))
        .map(|(_, value)| (value.clone(), String::new()))
        .collect()
}

/// Returns `base` with every entry of `top` written over it.
pub fn overlay(base: &FlatMap, top: &FlatMap) -> FlatMap {
    let mut merged = base.clone();
    merged.extend(top.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
