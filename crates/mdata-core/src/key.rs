//! Group and entry keys, and the orderings that drive emission

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Category that sorts ahead of every other category in a language block
const MODULE_CATEGORY: &str = "module";

/// The fine-grained identifier that decides override collisions
///
/// Variant order matters: every `Id` sorts before every `Label`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryKey {
    /// Numeric identifier (e.g. a PV id or a string-array index)
    Id(u64),
    /// Anything that is not a plain non-negative integer
    Label(String),
}

impl EntryKey {
    /// Parse a key segment, detecting integer ids
    ///
    /// Only plain ASCII digits count; a digit run too large for `u64`
    /// stays a label rather than being truncated.
    pub fn parse(segment: &str) -> Self {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = segment.parse::<u64>() {
                return EntryKey::Id(id);
            }
        }
        EntryKey::Label(segment.to_string())
    }

    /// The integer value, if this is an id
    pub fn as_id(&self) -> Option<u64> {
        match self {
            EntryKey::Id(id) => Some(*id),
            EntryKey::Label(_) => None,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Id(id) => write!(f, "{}", id),
            EntryKey::Label(label) => write!(f, "{}", label),
        }
    }
}

/// Dotted prefix that buckets entries for emission
///
/// Ordering follows the curated layout: unprefixed groups first, then by
/// language, with `module` ahead of other categories inside a language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Create a group key from a dotted prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// The top-level group (keys without any dotted prefix)
    pub fn root() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Language segment: the first segment of a multi-segment prefix
    pub fn language(&self) -> &str {
        match self.0.split_once('.') {
            Some((lang, _)) => lang,
            None => "",
        }
    }

    /// Category segment: the last segment of the prefix
    pub fn category(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or("")
    }

    /// Composite sort key: (has language, language, not module, category)
    ///
    /// The root group has no category and ranks with the module groups.
    pub fn sort_key(&self) -> (u8, &str, u8, &str) {
        if self.is_root() {
            return (0, "", 0, "");
        }
        let lang = self.language();
        let cat = self.category();
        let lang_weight = u8::from(!lang.is_empty());
        let cat_weight = u8::from(cat != MODULE_CATEGORY);
        (lang_weight, lang, cat_weight, cat)
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Full prefix breaks ties like "jp.module" vs "jp.x.module"
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a full dotted key into its group and entry parts
///
/// Examples:
/// - "ui.title" -> ("ui", Label("title"))
/// - "jp.module.12" -> ("jp.module", Id(12))
/// - "042" -> ("", Id(42))
pub fn split_full_key(full_key: &str) -> (GroupKey, EntryKey) {
    match full_key.rsplit_once('.') {
        Some((prefix, last)) => (GroupKey::new(prefix), EntryKey::parse(last)),
        None => (GroupKey::root(), EntryKey::parse(full_key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_parse() {
        assert_eq!(EntryKey::parse("42"), EntryKey::Id(42));
        assert_eq!(EntryKey::parse("007"), EntryKey::Id(7));
        assert_eq!(EntryKey::parse("title"), EntryKey::Label("title".to_string()));
        assert_eq!(EntryKey::parse("-1"), EntryKey::Label("-1".to_string()));
        assert_eq!(EntryKey::parse(""), EntryKey::Label(String::new()));
    }

    #[test]
    fn test_entry_key_overflow_stays_label() {
        let huge = "99999999999999999999999";
        assert_eq!(EntryKey::parse(huge), EntryKey::Label(huge.to_string()));
    }

    #[test]
    fn test_entry_key_ordering() {
        let mut keys = vec![
            EntryKey::parse("alpha"),
            EntryKey::parse("10"),
            EntryKey::parse("2"),
            EntryKey::parse("Zed"),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, vec!["2", "10", "Zed", "alpha"]);
    }

    #[test]
    fn test_split_full_key() {
        assert_eq!(
            split_full_key("foo.bar"),
            (GroupKey::new("foo"), EntryKey::Label("bar".to_string()))
        );
        assert_eq!(
            split_full_key("jp.module.12"),
            (GroupKey::new("jp.module"), EntryKey::Id(12))
        );
        assert_eq!(split_full_key("042"), (GroupKey::root(), EntryKey::Id(42)));
    }

    #[test]
    fn test_group_segments() {
        let group = GroupKey::new("jp.cstm_item");
        assert_eq!(group.language(), "jp");
        assert_eq!(group.category(), "cstm_item");

        let single = GroupKey::new("module");
        assert_eq!(single.language(), "");
        assert_eq!(single.category(), "module");

        assert_eq!(GroupKey::root().sort_key(), (0, "", 0, ""));
    }

    #[test]
    fn test_group_ordering() {
        let mut groups: Vec<GroupKey> = [
            "kr.module",
            "cstm_item",
            "jp.cstm_item",
            "module",
            "",
            "jp.module",
            "jp.x.module",
        ]
        .iter()
        .map(|s| GroupKey::new(*s))
        .collect();
        groups.sort();

        let order: Vec<&str> = groups.iter().map(|g| g.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "",
                "module",
                "cstm_item",
                "jp.module",
                "jp.x.module",
                "jp.cstm_item",
                "kr.module",
            ]
        );
    }

    #[test]
    fn test_root_sorts_before_module() {
        let mut groups = vec![GroupKey::new("module"), GroupKey::root()];
        groups.sort();
        assert!(groups[0].is_root());
        assert!(GroupKey::root() < GroupKey::new("cstm_item"));
    }
}
