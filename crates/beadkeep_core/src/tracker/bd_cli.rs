//! `bd` command-line adapter.
//!
//! # Responsibility
//! - Map tracker primitives onto `bd` subcommands, one blocking subprocess
//!   per call.
//! - Turn non-zero exits into `TrackerError::CommandFailed` carrying stderr.
//!
//! # Invariants
//! - `show` treats a non-zero exit as "record absent", matching how `bd`
//!   reports unknown ids.
//! - No call retries; retry policy belongs to the reconciler.

use crate::model::label::LabelPair;
use crate::model::record::NewRecord;
use crate::tracker::queries::bulk_label_insert_sql;
use crate::tracker::{Row, Tracker, TrackerError, TrackerResult};
use log::debug;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Default program name resolved through `PATH`.
pub const DEFAULT_BD_PROGRAM: &str = "bd";

/// Tracker adapter shelling out to `bd`.
#[derive(Debug, Clone)]
pub struct BdCli {
    program: PathBuf,
}

impl Default for BdCli {
    fn default() -> Self {
        Self::new(DEFAULT_BD_PROGRAM)
    }
}

impl BdCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Argument vector `create_record` passes to `bd`, for previews.
    pub fn create_args(record: &NewRecord) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "--id".to_string(),
            record.id.clone(),
            "--type".to_string(),
            record.issue_type.clone(),
            "--priority".to_string(),
            record.priority.to_string(),
            "--title".to_string(),
            record.title.clone(),
            "--description".to_string(),
            record.description.clone(),
            "--labels".to_string(),
            record.labels_csv(),
        ];
        if let Some(external_ref) = record.external_ref.as_ref() {
            args.push("--external-ref".to_string());
            args.push(external_ref.clone());
        }
        args
    }

    fn run<I, S>(&self, args: I) -> TrackerResult<Output>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        debug!(
            "event=bd_exec module=tracker status=start program={} subcommand={}",
            self.program.display(),
            args.first()
                .map(|arg| arg.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| TrackerError::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }

    fn run_checked<I, S>(&self, label: &str, args: I) -> TrackerResult<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Err(TrackerError::CommandFailed {
                command: format!("{} {label}", self.program.display()),
                code: output.status.code(),
                stderr: if stderr.is_empty() { stdout } else { stderr },
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Tracker for BdCli {
    fn query(&self, sql: &str) -> TrackerResult<Vec<Row>> {
        let stdout = self.run_checked("sql --json", ["sql", "--json", sql])?;
        parse_json_rows(&stdout)
    }

    fn show(&self, id: &str) -> TrackerResult<Option<String>> {
        let output = self.run(["show", id])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn create_record(&mut self, record: &NewRecord) -> TrackerResult<()> {
        self.run_checked(
            &format!("create --id {}", record.id),
            Self::create_args(record),
        )?;
        Ok(())
    }

    fn add_label(&mut self, id: &str, label: &str) -> TrackerResult<()> {
        self.run_checked(
            &format!("label add {id} {label}"),
            ["label", "add", id, label],
        )?;
        Ok(())
    }

    fn add_labels_bulk(&mut self, pairs: &[LabelPair]) -> TrackerResult<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let sql = bulk_label_insert_sql(pairs);
        self.run_checked("sql (label batch)", ["sql".to_string(), sql])?;
        Ok(())
    }

    fn append_note(&mut self, id: &str, note: &str) -> TrackerResult<()> {
        self.run_checked(
            &format!("update {id} --append-notes"),
            ["update", id, "--append-notes", note],
        )?;
        Ok(())
    }
}

/// Decodes `bd sql --json` output; blank output is an empty result.
pub fn parse_json_rows(stdout: &str) -> TrackerResult<Vec<Row>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_args_include_external_ref_only_when_present() {
        let record = NewRecord::task("iv-ab12", "[recovered] x", "desc", &["recovered"]);
        let args = BdCli::create_args(&record);
        assert_eq!(&args[..3], &["create", "--id", "iv-ab12"]);
        assert!(!args.contains(&"--external-ref".to_string()));

        let args = BdCli::create_args(&record.with_external_ref("git:deadbeef"));
        assert_eq!(
            &args[args.len() - 2..],
            &["--external-ref".to_string(), "git:deadbeef".to_string()]
        );
    }

    #[test]
    fn json_rows_parse_and_blank_is_empty() {
        assert!(parse_json_rows("  \n").unwrap().is_empty());
        let rows = parse_json_rows(r#"[{"issue_id":"iv-1","label":"mod:clavain"}]"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["label"], "mod:clavain");
        assert!(matches!(
            parse_json_rows("not json"),
            Err(TrackerError::InvalidOutput(_))
        ));
    }

    #[test]
    fn missing_program_reports_spawn_error() {
        let mut tracker = BdCli::new("/nonexistent/bd-for-tests");
        let err = tracker.add_label("iv-1", "mod:clavain").unwrap_err();
        assert!(matches!(err, TrackerError::Spawn { .. }));
    }
}
