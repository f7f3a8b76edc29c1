//! Plain-text and markdown table rendering.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Output flavor for rendered reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Plain,
    Markdown,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "plain" => Ok(Self::Plain),
            "markdown" => Ok(Self::Markdown),
            other => Err(format!("unsupported format `{other}`; expected plain|markdown")),
        }
    }
}

/// Renders `rows` under `headers`.
///
/// Plain tables left-align every cell to its column width and separate
/// columns with two spaces; short rows render the cells they have.
pub fn format_table<H, R>(format: OutputFormat, headers: &[H], rows: &[Vec<R>]) -> String
where
    H: AsRef<str>,
    R: AsRef<str>,
{
    match format {
        OutputFormat::Markdown => {
            let mut lines = Vec::with_capacity(rows.len() + 2);
            lines.push(markdown_row(headers.iter().map(AsRef::as_ref)));
            lines.push(markdown_row(headers.iter().map(|_| "---")));
            for row in rows {
                lines.push(markdown_row(row.iter().map(AsRef::as_ref)));
            }
            lines.join("\n")
        }
        OutputFormat::Plain => {
            let widths: Vec<usize> = headers
                .iter()
                .enumerate()
                .map(|(index, header)| {
                    rows.iter()
                        .filter_map(|row| row.get(index))
                        .map(|cell| cell.as_ref().chars().count())
                        .max()
                        .unwrap_or(0)
                        .max(header.as_ref().chars().count())
                })
                .collect();

            let mut lines = Vec::with_capacity(rows.len() + 2);
            lines.push(plain_row(headers.iter().map(AsRef::as_ref), &widths));
            lines.push(
                widths
                    .iter()
                    .map(|width| "-".repeat(*width))
                    .collect::<Vec<_>>()
                    .join("  "),
            );
            for row in rows {
                lines.push(plain_row(row.iter().map(AsRef::as_ref), &widths));
            }
            lines.join("\n")
        }
    }
}

/// `1234567` → `1,234,567`.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn markdown_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    format!("| {} |", cells.collect::<Vec<_>>().join(" | "))
}

fn plain_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_table_pads_columns() {
        let table = format_table(
            OutputFormat::Plain,
            &["Repo", "N"],
            &[vec!["core", "12"], vec!["interflux", "3"]],
        );
        assert_eq!(
            table,
            "Repo       N \n---------  --\ncore       12\ninterflux  3 "
        );
    }

    #[test]
    fn markdown_table_has_separator_row() {
        let table = format_table(OutputFormat::Markdown, &["A", "B"], &[vec!["1", "2"]]);
        assert_eq!(table, "| A | B |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn empty_plain_table_uses_header_widths() {
        let rows: Vec<Vec<String>> = Vec::new();
        assert_eq!(
            format_table(OutputFormat::Plain, &["Agent", "Runs"], rows.as_slice()),
            "Agent  Runs\n-----  ----"
        );
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-45_000), "-45,000");
    }

    #[test]
    fn format_parses_from_flag_values() {
        assert_eq!("markdown".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert!("html".parse::<OutputFormat>().is_err());
    }
}
