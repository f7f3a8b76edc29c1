//! Doc → record mapping job.
//!
//! # Responsibility
//! - Write the mapping audit CSV, ensure every structurally referenced
//!   record exists, and append one `[doc-map]` note per mapping.
//!
//! # Invariants
//! - The audit CSV is written before any tracker mutation.
//! - A note is skipped when the record's `show` text already contains the
//!   document path.
//! - Inferred references to missing records are counted, never created.

use crate::docmap::{
    collect_mappings, placeholder_description, title_from_doc, write_report_csv, DOC_MAP_LABEL,
};
use crate::model::label::{PLACEHOLDER_LABEL, RECOVERED_LABEL};
use crate::model::mapping::{Mapping, MappingMode};
use crate::model::record::NewRecord;
use crate::recovery::{CreatePermit, Evidence, PlaceholderResolver, Resolution};
use crate::service::{LineSink, ServiceError, ServiceResult, Transcript};
use crate::tracker::Tracker;
use log::{info, warn};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMappingRequest {
    pub root: PathBuf,
    pub report_csv: PathBuf,
    pub dry_run: bool,
    pub create_missing: bool,
    pub infer: bool,
}

impl DocMappingRequest {
    pub fn new(root: impl Into<PathBuf>, report_csv: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            report_csv: report_csv.into(),
            dry_run: false,
            create_missing: true,
            infer: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocMappingReport {
    pub mappings: Vec<Mapping>,
    pub created: usize,
    pub mapped: usize,
    pub skipped: usize,
    pub unresolved_inferred: usize,
    pub errors: usize,
    pub missing_ids: BTreeSet<String>,
    pub report_csv: PathBuf,
    pub dry_run: bool,
    pub transcript: Transcript,
}

impl Display for DocMappingReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "summary: docs_mappings={} created={} mapped={} skipped={} unresolved_inferred={} errors={} missing_ids_seen={} dry_run={}",
            self.mappings.len(),
            self.created,
            self.mapped,
            self.skipped,
            self.unresolved_inferred,
            self.errors,
            self.missing_ids.len(),
            self.dry_run
        )?;
        write!(f, "report_csv: {}", self.report_csv.display())
    }
}

pub struct DocMappingService<T: Tracker> {
    tracker: T,
    progress: Option<LineSink>,
}

impl<T: Tracker> DocMappingService<T> {
    pub fn new(tracker: T) -> Self {
        Self {
            tracker,
            progress: None,
        }
    }

    /// Forwards progress lines to `sink` while the run is in flight.
    pub fn with_progress(mut self, sink: LineSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn into_inner(self) -> T {
        self.tracker
    }

    /// Maps the corpus under `request.root` onto tracker records.
    ///
    /// # Errors
    /// - A corpus document cannot be read.
    /// - The audit CSV cannot be written.
    pub fn run(&mut self, request: &DocMappingRequest) -> ServiceResult<DocMappingReport> {
        let mappings = collect_mappings(&request.root, request.infer)?;
        write_report_csv(&request.report_csv, &mappings).map_err(|source| {
            ServiceError::Report {
                path: request.report_csv.clone(),
                source,
            }
        })?;

        let mut report = DocMappingReport {
            transcript: Transcript::with_sink(self.progress.clone()),
            report_csv: request.report_csv.clone(),
            dry_run: request.dry_run,
            ..DocMappingReport::default()
        };
        let mut resolver = PlaceholderResolver::new(request.create_missing);

        for mapping in &mappings {
            if self.ensure_record(&mut resolver, request, mapping, &mut report) {
                self.append_note(mapping, request.dry_run, &mut report);
            }
        }

        info!(
            "event=doc_mapping module=service status=ok docs_mappings={} created={} mapped={} errors={} dry_run={}",
            mappings.len(),
            report.created,
            report.mapped,
            report.errors,
            report.dry_run
        );
        report.mappings = mappings;
        Ok(report)
    }

    /// Returns whether the mapped record exists (or was just created).
    fn ensure_record(
        &mut self,
        resolver: &mut PlaceholderResolver,
        request: &DocMappingRequest,
        mapping: &Mapping,
        report: &mut DocMappingReport,
    ) -> bool {
        let evidence = match mapping.mode {
            MappingMode::Inferred => Evidence::Inferred,
            MappingMode::Declared | MappingMode::InferredSibling => Evidence::Structured,
        };
        let id = &mapping.bead_id;
        let path = &mapping.doc_path;

        let resolution = match resolver.resolve(&self.tracker, id, evidence) {
            Ok(resolution) => resolution,
            Err(err) => {
                report.errors += 1;
                report.transcript.err(format!("error lookup {id}: {err}"));
                return false;
            }
        };
        if resolution.is_missing() {
            report.missing_ids.insert(id.clone());
        }

        match resolution {
            Resolution::Exists => true,
            Resolution::SkipInferred => {
                report.unresolved_inferred += 1;
                report.skipped += 1;
                report
                    .transcript
                    .out(format!("skip inferred-missing {id} for {path}"));
                false
            }
            Resolution::SkipTemplate => {
                report.skipped += 1;
                report.transcript.out(format!("skip template {id} for {path}"));
                false
            }
            Resolution::MissingNotCreated => {
                report.errors += 1;
                report
                    .transcript
                    .err(format!("error missing bead {id} for {path}"));
                false
            }
            Resolution::Create(permit) => {
                self.create_placeholder(resolver, permit, request, mapping, report)
            }
        }
    }

    fn create_placeholder(
        &mut self,
        resolver: &mut PlaceholderResolver,
        permit: CreatePermit,
        request: &DocMappingRequest,
        mapping: &Mapping,
        report: &mut DocMappingReport,
    ) -> bool {
        let id = mapping.bead_id.as_str();
        let doc = request.root.join(Path::new(&mapping.doc_path));
        let title = match title_from_doc(&doc) {
            Ok(title) => title,
            Err(err) => {
                report.errors += 1;
                report.transcript.err(format!("error create {id}: {err}"));
                return false;
            }
        };
        let record = NewRecord::task(
            id,
            title,
            placeholder_description(&doc, mapping.doc_kind),
            &[RECOVERED_LABEL, PLACEHOLDER_LABEL, DOC_MAP_LABEL],
        );

        match resolver.create(&mut self.tracker, permit, record, request.dry_run) {
            Ok(id) => {
                report.created += 1;
                let verb = if request.dry_run {
                    "would_create"
                } else {
                    "created"
                };
                report.transcript.out(format!("{verb} {id}"));
                true
            }
            Err(err) => {
                report.errors += 1;
                warn!(
                    "event=doc_map_create module=service status=error record_id={} error={}",
                    id, err
                );
                report.transcript.err(format!("error create {id}: {err}"));
                false
            }
        }
    }

    fn append_note(&mut self, mapping: &Mapping, dry_run: bool, report: &mut DocMappingReport) {
        let id = mapping.bead_id.as_str();
        let current = self.tracker.show(id).ok().flatten().unwrap_or_default();
        if current.contains(&mapping.doc_path) {
            report.skipped += 1;
            return;
        }

        let note = mapping.note_text();
        if dry_run {
            report.mapped += 1;
            report.transcript.out(format!("would_map {id} <- {note}"));
            return;
        }
        match self.tracker.append_note(id, &note) {
            Ok(()) => {
                report.mapped += 1;
                report.transcript.out(format!("mapped {id} <- {note}"));
            }
            Err(err) => {
                report.errors += 1;
                report
                    .transcript
                    .err(format!("error map {id} <- {}: {err}", mapping.doc_path));
            }
        }
    }
}
