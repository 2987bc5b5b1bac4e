//! In-memory record store keyed by canonical source path.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::{GraphError, GraphResult};
use crate::models::{parse_record, ExtractionRecord};

/// Extensions of files the directory loader reads as records.
const RECORD_EXTENSIONS: &[&str] = &["context", "json"];

/// Sub-directory the upstream analysis step writes failure reports into.
const ERROR_REPORT_DIR: &str = "errors";

// ---------------------------------------------------------------------------
// Path canonicalization
// ---------------------------------------------------------------------------

/// Fold `.`/`..` segments of a `/`-separated path, keeping a leading `/`.
///
/// `..` above the root of an absolute path is dropped; on a relative path it
/// is kept so the result still points at the same place.
pub fn normalize_posix_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if stack.last().is_some_and(|last| *last != "..") {
                    stack.pop();
                } else if !absolute {
                    stack.push("..");
                }
            }
            _ => stack.push(part),
        }
    }
    let joined = stack.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// True for `/x` and drive-letter paths such as `C:/x`.
pub fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// Canonical form of a record path: separators unified, relative paths
/// joined onto `root`, then lexically normalized. The filesystem is never
/// consulted.
pub fn canonicalize_path(path: &str, root: Option<&str>) -> String {
    let normalized = path.trim().replace('\\', "/");
    if is_absolute(&normalized) {
        return normalize_drive_path(&normalized);
    }
    match root.map(str::trim).filter(|r| !r.is_empty()) {
        Some(root) => {
            let root = root.replace('\\', "/");
            normalize_drive_path(&format!("{}/{}", root.trim_end_matches('/'), normalized))
        }
        None => normalize_posix_path(&normalized),
    }
}

fn normalize_drive_path(path: &str) -> String {
    if path.starts_with('/') {
        return normalize_posix_path(path);
    }
    if is_absolute(path) {
        let (drive, rest) = path.split_at(2);
        return format!("{drive}{}", normalize_posix_path(rest));
    }
    normalize_posix_path(path)
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// Counts from one directory load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files_seen: usize,
    pub loaded: usize,
    pub rejected: usize,
}

/// All extraction records of one build, keyed by canonical source path.
///
/// Insertion order is kept so iteration is deterministic; loading a path that
/// is already present replaces the earlier record in place.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    root: Option<String>,
    records: IndexMap<String, ExtractionRecord>,
}

impl RecordStore {
    pub fn new(root: Option<&str>) -> Self {
        Self {
            root: root.map(|r| canonicalize_path(r, None)),
            records: IndexMap::new(),
        }
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn canonicalize(&self, path: &str) -> String {
        canonicalize_path(path, self.root.as_deref())
    }

    /// Store one record under its canonical path and return that path.
    ///
    /// Records without a source path are rejected with `MalformedRecord`.
    pub fn load(&mut self, mut record: ExtractionRecord) -> GraphResult<String> {
        if record.source_path.trim().is_empty() {
            warn!("Rejecting extraction record without a source path");
            return Err(GraphError::malformed("<record>", "missing sourcePath"));
        }
        let key = self.canonicalize(&record.source_path);
        record.source_path = key.clone();
        if self.records.insert(key.clone(), record).is_some() {
            warn!("Duplicate record for {key}; keeping the later load");
        }
        Ok(key)
    }

    /// Load every record, skipping rejected ones. Returns how many were stored.
    pub fn load_all<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = ExtractionRecord>,
    {
        records
            .into_iter()
            .map(|record| self.load(record))
            .filter(Result::is_ok)
            .count()
    }

    /// Read every record file under `dir` on a pool of `workers` threads.
    ///
    /// Files are parsed concurrently but inserted by this thread in sorted
    /// path order, so duplicate source paths resolve the same way every run.
    pub fn load_dir(&mut self, dir: &Path, workers: usize) -> GraphResult<LoadReport> {
        if !dir.is_dir() {
            return Err(GraphError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("record directory {} does not exist", dir.display()),
            )));
        }
        let files = find_record_files(dir);
        let mut report = LoadReport {
            files_seen: files.len(),
            ..LoadReport::default()
        };

        for (path, parsed) in parallel_parse(&files, workers) {
            match parsed.and_then(|record| self.load(record)) {
                Ok(key) => {
                    debug!("Loaded {} as {key}", path.display());
                    report.loaded += 1;
                }
                Err(e) => {
                    warn!("Skipping record file {}: {e}", path.display());
                    report.rejected += 1;
                }
            }
        }

        info!(
            "Loaded {} records from {} ({} files, {} rejected)",
            report.loaded,
            dir.display(),
            report.files_seen,
            report.rejected
        );
        Ok(report)
    }

    pub fn all(&self) -> impl Iterator<Item = &ExtractionRecord> {
        self.records.values()
    }

    pub fn get(&self, path: &str) -> Option<&ExtractionRecord> {
        self.records.get(&self.canonicalize(path))
    }

    /// Lookup by an already-canonical key, skipping re-normalization.
    pub fn contains_canonical(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn find_record_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_error_report_dir(e));
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Cannot read part of {}: {e}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_record = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| RECORD_EXTENSIONS.contains(&ext));
        if is_record {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

fn is_error_report_dir(entry: &walkdir::DirEntry) -> bool {
    entry.depth() == 1 && entry.file_type().is_dir() && entry.file_name() == ERROR_REPORT_DIR
}

fn read_record_file(path: &Path) -> GraphResult<ExtractionRecord> {
    let text = std::fs::read_to_string(path)?;
    parse_record(&text, &path.to_string_lossy())
}

fn parallel_parse(
    files: &[PathBuf],
    workers: usize,
) -> Vec<(PathBuf, GraphResult<ExtractionRecord>)> {
    if files.is_empty() {
        return vec![];
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build();

    let parse = |path: &PathBuf| (path.clone(), read_record_file(path));
    match pool {
        Ok(pool) => pool.install(|| files.par_iter().map(parse).collect()),
        Err(e) => {
            warn!("Falling back to sequential record parsing: {e}");
            files.iter().map(parse).collect()
        }
    }
}
