//! Global bare-name symbol index.
//!
//! Maps an unqualified name (`Initialize`) or a member key
//! (`Heap::Initialize`) to every qualified identifier declaring it. Names are
//! not unique across a codebase, so each key holds a set and resolution
//! returns all candidates. The index is built once from the full record store
//! before any edge is resolved, which lets a dependency point at a symbol
//! declared in a file that is processed later.

use indexmap::{IndexMap, IndexSet};

use crate::indexer::identifiers::{member_id, member_key, method_id, SEPARATOR};
use crate::models::{ClassEntry, ExtractionRecord};

#[derive(Clone, Debug, Default)]
pub struct SymbolIndex {
    entries: IndexMap<String, IndexSet<String>>,
}

impl SymbolIndex {
    /// Single pass over every record. Registration is additive.
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ExtractionRecord>,
    {
        let mut index = SymbolIndex::default();
        for record in records {
            index.register_record(record);
        }
        index
    }

    fn register_record(&mut self, record: &ExtractionRecord) {
        let path = record.source_path.as_str();
        for entry in record.classes.iter().chain(record.interfaces.iter()) {
            self.register_type(path, entry);
        }
        for function in &record.functions {
            let Some(name) = function.declared_name() else {
                continue;
            };
            match function.declared_parent() {
                Some(parent) => {
                    let id = method_id(path, parent, name);
                    self.register(name, &id);
                    self.register(&member_key(parent, name), &id);
                }
                None => self.register(name, &member_id(path, name)),
            }
        }
    }

    fn register_type(&mut self, path: &str, entry: &ClassEntry) {
        let Some(class_name) = entry.declared_name() else {
            return;
        };
        self.register(class_name, &member_id(path, class_name));
        for method in &entry.methods {
            if let Some(name) = method.declared_name() {
                let id = method_id(path, class_name, name);
                self.register(name, &id);
                self.register(&member_key(class_name, name), &id);
            }
        }
    }

    pub fn register(&mut self, name: &str, id: &str) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .insert(id.to_string());
    }

    /// Exact lookup. Unknown names yield an empty list, never an error.
    pub fn resolve(&self, name: &str) -> Vec<&str> {
        self.entries
            .get(name)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Lookup with fallbacks for names written with qualifiers or decoration.
    ///
    /// Tries, in order and stopping at the first hit: the name as written,
    /// the name stripped of `const`, template arguments and `*`/`&`, its
    /// trailing `Class::member` pair, and its bare trailing segment.
    pub fn resolve_lenient(&self, name: &str) -> Vec<&str> {
        let exact = self.resolve(name);
        if !exact.is_empty() {
            return exact;
        }
        lookup_keys(name)
            .into_iter()
            .map(|key| self.resolve(&key))
            .find(|hits| !hits.is_empty())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of distinct lookup keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fallback keys for [`SymbolIndex::resolve_lenient`], most specific first.
fn lookup_keys(name: &str) -> Vec<String> {
    let mut cleaned = name.trim();
    if let Some(rest) = cleaned.strip_prefix("const ") {
        cleaned = rest.trim_start();
    }
    if let Some(pos) = cleaned.find('<') {
        cleaned = &cleaned[..pos];
    }
    let cleaned = cleaned
        .trim_end_matches(|c: char| c == '*' || c == '&' || c.is_whitespace())
        .trim_start_matches(SEPARATOR);

    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: String| {
        if !key.is_empty() && key != name && !keys.contains(&key) {
            keys.push(key);
        }
    };
    push(cleaned.to_string());
    let segments: Vec<&str> = cleaned
        .split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() > 2 {
        push(segments[segments.len() - 2..].join(SEPARATOR));
    }
    if segments.len() > 1 {
        push(segments[segments.len() - 1].to_string());
    }
    keys
}
