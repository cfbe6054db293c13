use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use crate::cohort::Target;
use crate::db::SessionRecord;
use crate::docx;
use crate::parser::document::RawDocument;
use crate::parser::{self, TableOutcome};

/// Where extracted sessions end up.
pub trait SessionStore {
    /// Atomically delete every record of `cohort_code` and insert `records`.
    /// An empty slice only clears. Returns the number inserted.
    fn replace_cohort(&self, cohort_code: &str, records: &[SessionRecord]) -> Result<usize>;

    /// Lock table shared by every importer writing to this store.
    fn cohort_locks(&self) -> &CohortLocks;
}

/// Per-document result of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Record counts per table, `None` for skipped tables.
    Loaded { tables: Vec<Option<usize>> },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub source: String,
    pub status: DocumentStatus,
}

impl DocumentReport {
    pub fn record_count(&self) -> usize {
        match &self.status {
            DocumentStatus::Loaded { tables } => tables.iter().flatten().sum(),
            DocumentStatus::Skipped { .. } => 0,
        }
    }
}

impl fmt::Display for DocumentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            DocumentStatus::Loaded { tables } => {
                let used = tables.iter().filter(|t| t.is_some()).count();
                write!(
                    f,
                    "{}: {} sessions from {}/{} tables",
                    self.source,
                    self.record_count(),
                    used,
                    tables.len()
                )
            }
            DocumentStatus::Skipped { reason } => {
                write!(f, "{}: skipped ({})", self.source, reason)
            }
        }
    }
}

/// Outcome of one import run for one cohort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub cohort_code: String,
    /// Records written. Zero still means the cohort was cleared.
    pub inserted: usize,
    pub documents: Vec<DocumentReport>,
}

/// Serializes runs per cohort so delete+insert phases never interleave.
#[derive(Default)]
pub struct CohortLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CohortLocks {
    pub fn lock_for(&self, cohort_code: &str) -> Result<Arc<Mutex<()>>> {
        let mut map = self
            .locks
            .lock()
            .map_err(|_| anyhow!("cohort lock table poisoned"))?;
        Ok(Arc::clone(map.entry(cohort_code.to_string()).or_default()))
    }
}

/// Drives classification and row walking over documents and hands the
/// combined batch to the store as one full replacement.
pub struct Importer<'a, S: SessionStore> {
    store: &'a S,
    year: i32,
}

impl<'a, S: SessionStore> Importer<'a, S> {
    /// `year` is assumed for dates written without one.
    pub fn new(store: &'a S, year: i32) -> Self {
        Importer { store, year }
    }

    pub fn import_document(
        &self,
        cohort_code: &str,
        document: &RawDocument,
    ) -> Result<ImportReport> {
        let target = Target::for_code(cohort_code);
        self.serialized(&target, || {
            let (records, report) = self.extract(&target, "document", document);
            self.replace(&target, records, vec![report])
        })
    }

    /// Import every location as one combined replacement for the cohort.
    /// Unusable documents are skipped; an unreadable file aborts the run
    /// before anything is written.
    pub fn import_from_locations(
        &self,
        cohort_code: &str,
        locations: &[PathBuf],
    ) -> Result<ImportReport> {
        let target = Target::for_code(cohort_code);
        self.serialized(&target, || self.run_locations(&target, locations))
    }

    fn serialized<T>(&self, target: &Target, run: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.store.cohort_locks().lock_for(&target.code)?;
        let _guard = lock
            .lock()
            .map_err(|_| anyhow!("import lock for {} poisoned", target.code))?;
        run()
    }

    fn run_locations(&self, target: &Target, locations: &[PathBuf]) -> Result<ImportReport> {
        let mut records = Vec::new();
        let mut reports = Vec::new();

        if locations.is_empty() {
            warn!(cohort = %target.code, "no documents to import, clearing group");
        }
        for path in locations {
            let source = path.display().to_string();
            match docx::load(path) {
                Ok(doc) => {
                    let (found, report) = self.extract(target, &source, &doc);
                    info!(source = %source, sessions = found.len(), "document imported");
                    records.extend(found);
                    reports.push(report);
                }
                Err(e) if e.is_format() => {
                    warn!(source = %source, error = %e, "skipping document");
                    reports.push(DocumentReport {
                        source,
                        status: DocumentStatus::Skipped {
                            reason: e.to_string(),
                        },
                    });
                }
                Err(e) => return Err(e).with_context(|| format!("Failed to read {}", source)),
            }
        }
        self.replace(target, records, reports)
    }

    fn extract(
        &self,
        target: &Target,
        source: &str,
        doc: &RawDocument,
    ) -> (Vec<SessionRecord>, DocumentReport) {
        let mut records = Vec::new();
        let mut tables = Vec::new();
        let outcomes = parser::extract_document(doc, target, self.year);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                TableOutcome::Extracted { roles, records: found } => {
                    debug!(
                        source,
                        table = index,
                        date_col = roles.date_col,
                        time_col = roles.time_col,
                        cohort_col = roles.cohort_col,
                        sessions = found.len(),
                        "table extracted"
                    );
                    tables.push(Some(found.len()));
                    records.extend(found);
                }
                TableOutcome::Skipped(reason) => {
                    debug!(source, table = index, %reason, "table skipped");
                    tables.push(None);
                }
            }
        }
        let report = DocumentReport {
            source: source.to_string(),
            status: DocumentStatus::Loaded { tables },
        };
        (records, report)
    }

    fn replace(
        &self,
        target: &Target,
        records: Vec<SessionRecord>,
        documents: Vec<DocumentReport>,
    ) -> Result<ImportReport> {
        let inserted = self.store.replace_cohort(&target.code, &records)?;
        info!(cohort = %target.code, inserted, "group replaced");
        Ok(ImportReport {
            cohort_code: target.code.clone(),
            inserted,
            documents,
        })
    }
}

/// Pick import locations: explicit paths, else a single configured file,
/// else a glob pattern (sorted).
pub fn resolve_locations(
    paths: &[PathBuf],
    docx_path: Option<&Path>,
    docx_glob: Option<&str>,
) -> Result<Vec<PathBuf>> {
    if !paths.is_empty() {
        return Ok(paths.to_vec());
    }
    if let Some(p) = docx_path {
        if p.is_file() {
            return Ok(vec![p.to_path_buf()]);
        }
        warn!(path = %p.display(), "configured document not found");
        return Ok(Vec::new());
    }
    if let Some(pattern) = docx_glob {
        let mut found = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern {:?}", pattern))?
            .filter_map(|entry| entry.ok())
            .collect::<Vec<_>>();
        found.sort();
        if found.is_empty() {
            warn!(pattern, "glob matched no documents");
        }
        return Ok(found);
    }
    warn!("no document path or glob configured");
    Ok(Vec::new())
}

/// `.doc` and `.docx` files directly inside `dir`, sorted.
pub fn documents_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let is_doc = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("doc") || e.eq_ignore_ascii_case("docx"));
        if is_doc && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
