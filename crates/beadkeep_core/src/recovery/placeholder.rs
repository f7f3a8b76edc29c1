//! Existence resolution and guarded placeholder creation.

use crate::model::record::{normalize_id, NewRecord};
use crate::tracker::{Tracker, TrackerResult};
use log::info;
use std::collections::BTreeSet;

/// Example identifiers used in templates and docs; never created.
pub const TEMPLATE_IDS: &[&str] = &["iv-aaaa", "iv-bbbb", "iv-xxxx"];

/// Whether `id` is one of the template identifiers.
pub fn is_template_id(id: &str) -> bool {
    TEMPLATE_IDS.contains(&normalize_id(id).as_str())
}

/// How a reference to an identifier was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    /// Declared in a structured field, manifest row or roadmap entry.
    Structured,
    /// Found by pattern anywhere in body text.
    Inferred,
}

/// Authorization to create one placeholder; only `resolve` hands these out.
#[derive(Debug, PartialEq, Eq)]
pub struct CreatePermit {
    id: String,
}

impl CreatePermit {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Outcome of resolving one identifier.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    Exists,
    SkipTemplate,
    SkipInferred,
    /// Missing, but creation is disabled for this run.
    MissingNotCreated,
    Create(CreatePermit),
}

impl Resolution {
    /// Whether the identifier was found missing from the tracker.
    pub fn is_missing(&self) -> bool {
        !matches!(self, Self::Exists)
    }

    /// Short reason used in skip lines.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Exists => "already exists",
            Self::SkipTemplate => "template id",
            Self::SkipInferred => "inferred reference",
            Self::MissingNotCreated => "creation disabled",
            Self::Create(_) => "missing",
        }
    }
}

/// Run-scoped existence cache plus creation policy.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderResolver {
    known_existing: BTreeSet<String>,
    allow_create: bool,
}

impl PlaceholderResolver {
    pub fn new(allow_create: bool) -> Self {
        Self {
            known_existing: BTreeSet::new(),
            allow_create,
        }
    }

    /// Resolves `id` against the run cache, then the tracker.
    ///
    /// Template ids that exist resolve to `Exists`; missing ones are never
    /// offered for creation.
    pub fn resolve<T: Tracker + ?Sized>(
        &mut self,
        tracker: &T,
        id: &str,
        evidence: Evidence,
    ) -> TrackerResult<Resolution> {
        let id = normalize_id(id);
        if self.known_existing.contains(&id) {
            return Ok(Resolution::Exists);
        }
        if tracker.record_exists(&id)? {
            self.known_existing.insert(id);
            return Ok(Resolution::Exists);
        }
        if is_template_id(&id) {
            return Ok(Resolution::SkipTemplate);
        }
        if evidence == Evidence::Inferred {
            return Ok(Resolution::SkipInferred);
        }
        if !self.allow_create {
            return Ok(Resolution::MissingNotCreated);
        }
        Ok(Resolution::Create(CreatePermit { id }))
    }

    /// Creates the placeholder for `permit`, overriding `record.id` with it.
    ///
    /// In dry-run mode nothing is sent, but the id is still registered so
    /// later references in the same run resolve to `Exists`.
    pub fn create<T: Tracker + ?Sized>(
        &mut self,
        tracker: &mut T,
        permit: CreatePermit,
        mut record: NewRecord,
        dry_run: bool,
    ) -> TrackerResult<String> {
        record.id = permit.id;
        if !dry_run {
            tracker.create_record(&record)?;
            info!(
                "event=placeholder_create module=recovery status=ok record_id={}",
                record.id
            );
        }
        self.known_existing.insert(record.id.clone());
        Ok(record.id)
    }
}
