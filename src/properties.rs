use std::collections::BTreeMap;

/// Ordered mapping of attribute name to chosen value (e.g. color -> red).
///
/// A `BTreeMap` keeps the serialization canonical: two property-sets with
/// the same pairs serialize identically regardless of insertion order, so
/// they can be used directly as grouping keys.
pub type PropertySet = BTreeMap<String, String>;

/// Deterministic grouping key for a property-set.
pub fn canonical_key(properties: &PropertySet) -> String {
    serde_json::to_string(properties).unwrap_or_default()
}

/// True iff the variant's property-set contains every requested pair.
pub fn matches(variant: &PropertySet, requested: &PropertySet) -> bool {
    requested
        .iter()
        .all(|(name, value)| variant.get(name).map(String::as_str) == Some(value.as_str()))
}

/// Human-readable `name: value` join, e.g. for payment line descriptions
/// (separator `", "`) and stock shortfall messages (separator `" - "`).
pub fn describe(properties: &PropertySet, separator: &str) -> String {
    properties
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join(separator)
}
