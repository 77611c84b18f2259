//! Merge store: keyed entry bodies with last-file-wins override
//!
//! The store is fed classified lines one file at a time. Pending lines are
//! held until the next key line, which takes them into its entry body.
//! Emission order comes from the key orderings in [`crate::key`], never from
//! insertion order, so the output depends only on the final contents.

use crate::classifier::{ClassifiedLine, KeyLine, SameFilePolicy};
use crate::key::{split_full_key, EntryKey, GroupKey};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::mem;
use tracing::debug;

/// Line terminator written after every emitted line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// A (group, entry) position in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub group: GroupKey,
    pub entry: EntryKey,
}

/// Pending lines followed by the key line(s) that own them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryBody {
    lines: Vec<String>,
    /// Sequence number of the file that wrote this body
    generation: u64,
}

impl EntryBody {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Ordered group -> entry -> body mapping built over one run
#[derive(Debug, Clone)]
pub struct MergeStore {
    groups: BTreeMap<GroupKey, BTreeMap<EntryKey, EntryBody>>,
    pending: Vec<String>,
    orphans: Vec<String>,
    policy: SameFilePolicy,
    generation: u64,
}

impl MergeStore {
    /// Create an empty store with the given same-file collision policy
    pub fn new(policy: SameFilePolicy) -> Self {
        Self {
            groups: BTreeMap::new(),
            pending: Vec::new(),
            orphans: Vec::new(),
            policy,
            generation: 0,
        }
    }

    /// Start a new source file
    ///
    /// Lines still pending from a file that was never closed go to the
    /// orphan bucket, so nothing is dropped.
    pub fn begin_file(&mut self) {
        if !self.pending.is_empty() {
            debug!(
                lines = self.pending.len(),
                "previous file was not closed, moving its pending lines to orphans"
            );
            self.orphans.append(&mut self.pending);
        }
        self.generation += 1;
    }

    /// Feed one classified line; returns the slot written by a key line
    pub fn feed(&mut self, line: ClassifiedLine) -> Option<Slot> {
        match line {
            ClassifiedLine::Pending(text) => {
                self.pending.push(text);
                None
            }
            ClassifiedLine::Key(key) => Some(self.insert(key)),
        }
    }

    fn insert(&mut self, key: KeyLine) -> Slot {
        let (group, entry) = split_full_key(&key.full_key);

        let mut lines = mem::take(&mut self.pending);
        lines.push(key.payload);

        let generation = self.generation;
        let entries = self.groups.entry(group.clone()).or_default();

        match entries.entry(entry.clone()) {
            Entry::Occupied(mut slot) => {
                let body = slot.get_mut();
                if self.policy == SameFilePolicy::AppendRecord && body.generation == generation {
                    body.lines.extend(lines);
                } else {
                    debug!(group = %group, entry = %entry, "overriding earlier entry");
                    *body = EntryBody { lines, generation };
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(EntryBody { lines, generation });
            }
        }

        Slot { group, entry }
    }

    /// Finish the current file, keeping unattached pending lines as orphans
    pub fn end_file(&mut self) {
        self.orphans.append(&mut self.pending);
    }

    /// All output lines in emission order, without terminators
    pub fn emit(&self) -> Vec<&str> {
        self.groups
            .values()
            .flat_map(|entries| entries.values())
            .flat_map(|body| body.lines.iter())
            .chain(self.orphans.iter())
            .map(String::as_str)
            .collect()
    }

    /// Emitted lines joined into file contents, each line terminated
    pub fn render(&self, ending: LineEnding) -> String {
        let terminator = ending.as_str();
        let mut out = String::new();
        for line in self.emit() {
            out.push_str(line);
            out.push_str(terminator);
        }
        out
    }

    /// Look up the body stored at a slot
    pub fn get(&self, group: &GroupKey, entry: &EntryKey) -> Option<&EntryBody> {
        self.groups.get(group).and_then(|entries| entries.get(entry))
    }

    /// Entry keys of one group in emission order
    pub fn entries(&self, group: &GroupKey) -> Vec<&EntryKey> {
        self.groups
            .get(group)
            .map(|entries| entries.keys().collect())
            .unwrap_or_default()
    }

    /// Number of distinct (group, entry) slots
    pub fn entry_count(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn orphan_lines(&self) -> &[String] {
        &self.orphans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, LineShape, DEFAULT_LANGUAGE};

    fn feed_file(store: &mut MergeStore, classifier: &Classifier, content: &str) {
        store.begin_file();
        for line in content.lines() {
            store.feed(classifier.classify(line));
        }
        store.end_file();
    }

    fn str_array() -> (MergeStore, Classifier) {
        let shape = LineShape::StrArray;
        (
            MergeStore::new(shape.same_file_policy()),
            Classifier::new(shape, DEFAULT_LANGUAGE).unwrap(),
        )
    }

    fn body<'a>(store: &'a MergeStore, group: &str, entry: &str) -> Vec<&'a str> {
        store
            .get(&GroupKey::new(group), &EntryKey::parse(entry))
            .map(|b| b.lines().iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_pending_lines_attach_to_next_key() {
        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "# comment\nfoo.bar = 1\n");

        assert_eq!(body(&store, "foo", "bar"), vec!["# comment", "foo.bar = 1"]);
        assert!(store.orphan_lines().is_empty());
        assert_eq!(store.emit(), vec!["# comment", "foo.bar = 1"]);
    }

    #[test]
    fn test_last_file_wins() {
        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "# old\nfoo.bar = 1\n");
        feed_file(&mut store, &c, "foo.bar = 2\n");

        assert_eq!(body(&store, "foo", "bar"), vec!["foo.bar = 2"]);
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_replace_within_same_file() {
        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "foo.bar = 1\n# second\nfoo.bar = 2\n");

        assert_eq!(body(&store, "foo", "bar"), vec!["# second", "foo.bar = 2"]);
    }

    #[test]
    fn test_record_append_within_file_replace_across_files() {
        let shape = LineShape::PvRecord;
        let c = Classifier::new(shape, DEFAULT_LANGUAGE).unwrap();
        let mut store = MergeStore::new(shape.same_file_policy());

        feed_file(
            &mut store,
            &c,
            "pv_001.song_name=A\n# bpm\npv_001.bpm=120\npv_002.song_name=B\n",
        );
        assert_eq!(
            body(&store, "", "1"),
            vec!["pv_001.song_name=A", "# bpm", "pv_001.bpm=120"]
        );

        feed_file(&mut store, &c, "pv_001.song_name=A2\n");
        assert_eq!(body(&store, "", "1"), vec!["pv_001.song_name=A2"]);
        assert_eq!(body(&store, "", "2"), vec!["pv_002.song_name=B"]);
    }

    #[test]
    fn test_orphans_emitted_last_in_file_order() {
        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "zz.a = 1\n# tail one\n");
        feed_file(&mut store, &c, "aa.b = 2\n# tail two\n\n");

        assert_eq!(
            store.emit(),
            vec!["aa.b = 2", "zz.a = 1", "# tail one", "# tail two", ""]
        );
    }

    #[test]
    fn test_begin_file_keeps_unclosed_pending() {
        let (mut store, c) = str_array();
        store.begin_file();
        store.feed(c.classify("# dangling"));
        store.begin_file();
        store.feed(c.classify("foo.bar = 1"));
        store.end_file();

        assert_eq!(store.orphan_lines(), &["# dangling".to_string()]);
        assert_eq!(body(&store, "foo", "bar"), vec!["foo.bar = 1"]);
    }

    #[test]
    fn test_numeric_before_string_entries() {
        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "g.alpha = a\ng.10 = b\ng.2 = c\n");

        assert_eq!(store.emit(), vec!["g.2 = c", "g.10 = b", "g.alpha = a"]);
        let keys: Vec<String> = store
            .entries(&GroupKey::new("g"))
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["2", "10", "alpha"]);
    }

    #[test]
    fn test_group_emission_order() {
        let (mut store, c) = str_array();
        feed_file(
            &mut store,
            &c,
            "jp.cstm_item.1 = a\njp.module.1 = b\ncstm_item.1 = c\nmodule.1 = d\ntop = e\n",
        );

        assert_eq!(
            store.emit(),
            vec![
                "top = e",
                "module.1 = d",
                "cstm_item.1 = c",
                "jp.module.1 = b",
                "jp.cstm_item.1 = a",
            ]
        );
    }

    #[test]
    fn test_normalized_key_collides_with_implicit_default() {
        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "en.ui.title = 1\n");
        feed_file(&mut store, &c, "ui.title = 2\n");
        assert_eq!(body(&store, "ui", "title"), vec!["ui.title = 2"]);

        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "ui.title = 2\n");
        feed_file(&mut store, &c, "en.ui.title = 1\n");
        assert_eq!(body(&store, "ui", "title"), vec!["ui.title = 1"]);
    }

    #[test]
    fn test_render_line_endings() {
        let (mut store, c) = str_array();
        feed_file(&mut store, &c, "a.b = 1\n# end");

        assert_eq!(store.render(LineEnding::Lf), "a.b = 1\n# end\n");
        assert_eq!(store.render(LineEnding::Crlf), "a.b = 1\r\n# end\r\n");
    }

    #[test]
    fn test_feed_reports_slot() {
        let (mut store, c) = str_array();
        store.begin_file();
        assert_eq!(store.feed(c.classify("# x")), None);
        assert_eq!(
            store.feed(c.classify("jp.module.7 = x")),
            Some(Slot {
                group: GroupKey::new("jp.module"),
                entry: EntryKey::Id(7),
            })
        );
    }
}
