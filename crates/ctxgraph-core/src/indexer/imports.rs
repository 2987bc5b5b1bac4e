//! Include resolution from raw import text to loaded record paths.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::BuildOptions;
use crate::indexer::records::{canonicalize_path, is_absolute, RecordStore};

/// `#include "path"` or `#include <path>`, with optional spaces after `#`.
static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*#\s*include\s*(?:"([^"]+)"|<([^>]+)>)"#).unwrap());

/// Extract the path literal from one include statement.
pub fn parse_include(statement: &str) -> Option<&str> {
    let caps = INCLUDE_RE.captures(statement)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

/// Outcome of resolving one include line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportTarget {
    /// Canonical path of a loaded record.
    Resolved(String),
    /// The line is an include, but no loaded record matches the literal.
    Unresolved(String),
}

/// Maps include statements onto record store paths.
///
/// Candidates are tried in order: the literal itself when absolute, relative
/// to the including file's directory, relative to the root directory, then
/// relative to each extra include directory. The first candidate present in
/// the store wins.
pub struct ImportResolver<'a> {
    store: &'a RecordStore,
    root: Option<String>,
    include_dirs: Vec<String>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            root: store.root().map(str::to_string),
            include_dirs: Vec::new(),
        }
    }

    pub fn from_options(store: &'a RecordStore, options: &BuildOptions) -> Self {
        let root = options
            .root_str()
            .map(|r| canonicalize_path(&r, None))
            .or_else(|| store.root().map(str::to_string));
        let include_dirs = options
            .include_dirs
            .iter()
            .map(|d| canonicalize_path(&d.to_string_lossy(), root.as_deref()))
            .collect();
        Self {
            store,
            root,
            include_dirs,
        }
    }

    /// Resolve one statement. `None` when the text is not an include or the
    /// target was never loaded.
    pub fn resolve_import(&self, statement: &str, including_path: &str) -> Option<String> {
        match self.classify(statement, including_path)? {
            ImportTarget::Resolved(path) => Some(path),
            ImportTarget::Unresolved(_) => None,
        }
    }

    /// Like [`Self::resolve_import`] but keeps the literal of includes that
    /// matched the pattern yet found no record. `None` means "not an include".
    pub fn classify(&self, statement: &str, including_path: &str) -> Option<ImportTarget> {
        let literal = parse_include(statement)?;
        let target = self
            .candidates(literal, including_path)
            .into_iter()
            .find(|candidate| self.store.contains_canonical(candidate));
        Some(match target {
            Some(path) => ImportTarget::Resolved(path),
            None => ImportTarget::Unresolved(literal.to_string()),
        })
    }

    fn candidates(&self, literal: &str, including_path: &str) -> Vec<String> {
        let literal = literal.replace('\\', "/");
        if is_absolute(&literal) {
            return vec![canonicalize_path(&literal, None)];
        }
        let mut candidates = Vec::with_capacity(2 + self.include_dirs.len());
        let including_dir = parent_dir(including_path);
        candidates.push(canonicalize_path(&literal, Some(including_dir)));
        if let Some(root) = &self.root {
            candidates.push(canonicalize_path(&literal, Some(root)));
        }
        for dir in &self.include_dirs {
            candidates.push(canonicalize_path(&literal, Some(dir)));
        }
        candidates.dedup();
        candidates
    }
}

/// Directory part of a `/`-separated path; `"/"` for top-level files.
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(pos) => &path[..pos],
        None => "",
    }
}
