//! Philosophy Alignment Protocol injection into AGENTS.md files.
//!
//! # Invariants
//! - A file already containing the protocol marker is never modified.
//! - Targets must be relative paths that stay inside the root.

use crate::service::{LineSink, Transcript};
use log::{info, warn};
use std::fmt::{Display, Formatter};
use std::path::{Component, Path};

/// Text whose presence marks a file as already backfilled.
pub const PROTOCOL_MARKER: &str = "Philosophy Alignment Protocol";

pub const PHILOSOPHY_FILE: &str = "PHILOSOPHY.md";

pub const DEFAULT_TARGETS: &[&str] = &[
    "core/intercore/AGENTS.md",
    "core/intermute/AGENTS.md",
    "core/interbench/AGENTS.md",
    "core/marketplace/AGENTS.md",
    "core/agent-rig/AGENTS.md",
    "os/clavain/AGENTS.md",
    "apps/autarch/AGENTS.md",
    "apps/intercom/AGENTS.md",
    "sdk/interbase/AGENTS.md",
    "interverse/interchart/AGENTS.md",
    "interverse/interdoc/AGENTS.md",
    "interverse/interfluence/AGENTS.md",
    "interverse/interflux/AGENTS.md",
    "interverse/interkasten/AGENTS.md",
    "interverse/interlearn/AGENTS.md",
    "interverse/interlock/AGENTS.md",
    "interverse/intermux/AGENTS.md",
    "interverse/intername/AGENTS.md",
    "interverse/interpath/AGENTS.md",
    "interverse/interserve/AGENTS.md",
    "interverse/intertrust/AGENTS.md",
    "interverse/interwatch/AGENTS.md",
    "interverse/tldr-swinton/AGENTS.md",
    "interverse/tool-time/AGENTS.md",
    "interverse/tuivision/AGENTS.md",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolBackfillReport {
    pub inserted: usize,
    pub skipped: usize,
    pub missing: usize,
    /// Unreadable, unwritable or out-of-root targets.
    pub failed: usize,
    pub dry_run: bool,
    pub transcript: Transcript,
}

impl Display for ProtocolBackfillReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Summary: {} inserted, {} skipped, {} missing",
            self.inserted, self.skipped, self.missing
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

/// `PHILOSOPHY.md` relative to the directory holding `target`, or `None`
/// when `target` is absolute or climbs out of the root.
pub fn philosophy_relpath(target: &str) -> Option<String> {
    let mut dirs = 0usize;
    let components: Vec<Component<'_>> = Path::new(target).components().collect();
    for component in &components {
        match component {
            Component::Normal(_) => dirs += 1,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if dirs == 0 {
        return None;
    }
    let mut relpath = "../".repeat(dirs - 1);
    relpath.push_str(PHILOSOPHY_FILE);
    Some(relpath)
}

/// Protocol block linking to `relpath`.
pub fn protocol_block(relpath: &str) -> String {
    format!(
        "
## Canonical References
1. [`PHILOSOPHY.md`]({relpath}) — direction for ideation and planning decisions.
2. `CLAUDE.md` — implementation details, architecture, testing, and release workflow.

## Philosophy Alignment Protocol
Review [`PHILOSOPHY.md`]({relpath}) during:
- Intake/scoping
- Brainstorming
- Planning
- Execution kickoff
- Review/gates
- Handoff/retrospective

For brainstorming/planning outputs, add two short lines:
- **Alignment:** one sentence on how the proposal supports the module's purpose within Demarch's philosophy.
- **Conflict/Risk:** one sentence on any tension with philosophy (or 'none').

If a high-value change conflicts with philosophy, either:
- adjust the plan to align, or
- create follow-up work to update `PHILOSOPHY.md` explicitly.
"
    )
}

/// Line index just past the first `# ` heading's description paragraph.
///
/// `0` when there is no heading; `lines.len()` when nothing ends the
/// paragraph.
pub fn find_insert_point<S: AsRef<str>>(lines: &[S]) -> usize {
    let Some(heading) = lines
        .iter()
        .position(|line| line.as_ref().starts_with("# "))
    else {
        return 0;
    };
    lines
        .iter()
        .enumerate()
        .skip(heading + 1)
        .find(|(_, line)| {
            let stripped = line.as_ref().trim();
            stripped.is_empty() || stripped.starts_with("## ")
        })
        .map(|(index, _)| index)
        .unwrap_or(lines.len())
}

/// `content` with the protocol inserted; also returns the insertion line.
pub fn insert_protocol(content: &str, relpath: &str) -> (String, usize) {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let bare: Vec<&str> = lines
        .iter()
        .map(|line| line.trim_end_matches('\n'))
        .collect();
    let at = find_insert_point(&bare);

    let mut updated = String::with_capacity(content.len() + 1024);
    updated.extend(lines[..at].iter().copied());
    updated.push_str(&protocol_block(relpath));
    updated.push('\n');
    updated.extend(lines[at..].iter().copied());
    (updated, at)
}

/// Inserts the protocol into every target under `root` that lacks it.
pub fn backfill_protocol<S: AsRef<str>>(
    root: &Path,
    targets: &[S],
    dry_run: bool,
    progress: Option<LineSink>,
) -> ProtocolBackfillReport {
    let mut report = ProtocolBackfillReport {
        transcript: Transcript::with_sink(progress),
        dry_run,
        ..ProtocolBackfillReport::default()
    };

    for target in targets {
        let target = target.as_ref();
        let Some(relpath) = philosophy_relpath(target) else {
            report.failed += 1;
            report
                .transcript
                .err(format!("ERROR: {target} (target must stay inside root)"));
            continue;
        };

        let path = root.join(target);
        if !path.is_file() {
            report.missing += 1;
            report.transcript.out(format!("MISSING: {target}"));
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                report.failed += 1;
                report.transcript.err(format!("ERROR: {target} ({err})"));
                continue;
            }
        };
        if content.contains(PROTOCOL_MARKER) {
            report.skipped += 1;
            report
                .transcript
                .out(format!("SKIP: {target} (already has protocol)"));
            continue;
        }

        if dry_run {
            report.inserted += 1;
            report
                .transcript
                .out(format!("WOULD INSERT: {target} (relpath: {relpath})"));
            continue;
        }

        let (updated, line) = insert_protocol(&content, &relpath);
        if let Err(err) = std::fs::write(&path, updated) {
            report.failed += 1;
            warn!(
                "event=protocol_write module=service status=error target={} error={}",
                target, err
            );
            report.transcript.err(format!("ERROR: {target} ({err})"));
            continue;
        }
        report.inserted += 1;
        report.transcript.out(format!(
            "INSERTED: {target} (line {line}, relpath: {relpath})"
        ));
    }

    info!(
        "event=protocol_backfill module=service status=ok inserted={} skipped={} missing={} failed={} dry_run={}",
        report.inserted, report.skipped, report.missing, report.failed, report.dry_run
    );
    report
}
