//! Bulk read queries shared by the batch jobs.
//!
//! Both queries are single round trips; per-record lookups are avoided.
//! SQL text sticks to single-quoted literals so it runs unchanged against
//! the `bd` SQL endpoint and a local SQLite tracker.

use crate::model::label::{LabelPair, LabelSnapshot};
use crate::model::record::Record;
use crate::tracker::{Row, Tracker, TrackerResult};
use serde::Deserialize;

/// Record status scope for record queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// `open` and `in_progress`.
    Open,
    Closed,
}

#[derive(Debug, Deserialize)]
struct LabelRow {
    issue_id: String,
    label: String,
}

/// Builds the record listing query. `limit == 0` means no limit.
pub fn records_query(filter: StatusFilter, limit: u32) -> String {
    let mut sql = String::from("select id, title, description, status from issues");
    match filter {
        StatusFilter::All => {}
        StatusFilter::Open => sql.push_str(" where status in ('open', 'in_progress')"),
        StatusFilter::Closed => sql.push_str(" where status = 'closed'"),
    }
    sql.push_str(" order by id");
    if limit > 0 {
        sql.push_str(&format!(" limit {limit}"));
    }
    sql
}

/// Fetches records in one query.
pub fn fetch_records<T: Tracker + ?Sized>(
    tracker: &T,
    filter: StatusFilter,
    limit: u32,
) -> TrackerResult<Vec<Record>> {
    tracker
        .query(&records_query(filter, limit))?
        .into_iter()
        .map(decode_row::<Record>)
        .collect()
}

/// Fetches every existing (record, label) pair in one query.
pub fn fetch_label_snapshot<T: Tracker + ?Sized>(tracker: &T) -> TrackerResult<LabelSnapshot> {
    let mut snapshot = LabelSnapshot::new();
    for row in tracker.query("select issue_id, label from labels")? {
        let row: LabelRow = decode_row(row)?;
        snapshot.entry(row.issue_id).or_default().insert(row.label);
    }
    Ok(snapshot)
}

/// Quotes `value` as a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Insert-ignore statement attaching every pair in one call.
pub fn bulk_label_insert_sql(pairs: &[LabelPair]) -> String {
    let values = pairs
        .iter()
        .map(|pair| {
            format!(
                "({}, {})",
                quote_literal(&pair.record_id),
                quote_literal(&pair.label)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("insert ignore into labels (issue_id, label) values {values}")
}

fn decode_row<R: serde::de::DeserializeOwned>(row: Row) -> TrackerResult<R> {
    Ok(serde_json::from_value(serde_json::Value::Object(row))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_query_applies_status_and_limit() {
        assert_eq!(
            records_query(StatusFilter::All, 0),
            "select id, title, description, status from issues order by id"
        );
        let open = records_query(StatusFilter::Open, 5);
        assert!(open.contains("status in ('open', 'in_progress')"));
        assert!(open.ends_with("limit 5"));
        assert!(records_query(StatusFilter::Closed, 0).contains("status = 'closed'"));
    }

    #[test]
    fn literals_escape_single_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn bulk_insert_lists_every_pair() {
        let sql = bulk_label_insert_sql(&[
            LabelPair::new("iv-1", "mod:clavain"),
            LabelPair::new("iv-2", "theme:ux"),
        ]);
        assert_eq!(
            sql,
            "insert ignore into labels (issue_id, label) values ('iv-1', 'mod:clavain'), ('iv-2', 'theme:ux')"
        );
    }
}
