//! Object Type Derivation
//!
//! Maps a batch label (usually a file name) to the object type used as the
//! node label and the schema lookup key.

use std::path::Path;

/// Derive an object type name from a batch label.
///
/// `pilot-cards.js` -> `PilotCard`, `upgrades` -> `Upgrade`,
/// `damage-deck-core` -> `DamageDeckCore`.
pub fn derive_type(label: &str) -> String {
    let stem = Path::new(label)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| label.to_string());

    let mut titled = stem
        .split('-')
        .map(title_case)
        .collect::<Vec<_>>()
        .join("-");

    if titled.ends_with('s') {
        titled.pop();
    }

    titled.replace('-', "")
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_hyphenated_label() {
        assert_eq!(derive_type("pilot-cards"), "PilotCard");
    }

    #[test]
    fn test_plural_single_segment() {
        assert_eq!(derive_type("upgrades"), "Upgrade");
    }

    #[test]
    fn test_label_without_plural() {
        assert_eq!(derive_type("damage-deck-core"), "DamageDeckCore");
    }

    #[test]
    fn test_extension_is_stripped() {
        assert_eq!(derive_type("pilot-cards.js"), "PilotCard");
        assert_eq!(derive_type("ships.json"), "Ship");
    }

    #[test]
    fn test_segments_are_lowercased_after_first_char() {
        assert_eq!(derive_type("SHIP-PARTS"), "ShipPart");
    }

    #[test]
    fn test_non_plural_trailing_s_follows_same_rule() {
        // Fixed rule, no dictionary: "status" loses its final "s" too.
        assert_eq!(derive_type("status"), "Statu");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        assert_eq!(derive_type("conditions"), derive_type("conditions"));
    }

    #[test]
    fn test_empty_label_is_total() {
        assert_eq!(derive_type(""), "");
    }
}
