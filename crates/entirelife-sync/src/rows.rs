//! Spreadsheet row codec
//!
//! Rows follow [`ENTRY_FIELDS`]: `date, emoji, title, body, created, updated`.
//! Values are written with `valueInputOption = RAW` and read back as
//! unformatted values, so a cell normally comes back the way it was written.
//! Cells edited by hand in the spreadsheet may come back differently (a
//! date typed into the sheet is a serial day number, an id may be text) and
//! are accepted in those forms too.

use chrono::{Days, NaiveDate};
use entirelife_core::domain::{Entry, EntryContent, Timestamp, ENTRY_FIELDS};
use entirelife_core::ports::Row;
use serde_json::Value;

/// Range every pull reads
pub const PULL_RANGE: &str = "Sheet1!A1:F";

/// Id of the first sheet of a spreadsheet
pub const FIRST_SHEET_ID: i64 = 0;

/// Returns the range covering `row_count` full rows from `A1`
pub fn push_range(row_count: usize) -> String {
    let last_column = char::from(b'A' + ENTRY_FIELDS.len() as u8 - 1);
    format!("Sheet1!A1:{last_column}{row_count}")
}

/// The header row
pub fn header_row() -> Row {
    ENTRY_FIELDS.iter().map(|f| Value::from(*f)).collect()
}

/// Encodes one entry as a data row
pub fn entry_row(entry: &Entry) -> Row {
    vec![
        Value::from(entry.date.format("%Y-%m-%d").to_string()),
        Value::from(entry.emoji.clone().unwrap_or_default()),
        Value::from(entry.title.clone()),
        Value::from(entry.body.clone().unwrap_or_default()),
        Value::from(entry.created),
        Value::from(entry.updated),
    ]
}

/// A data row decoded from the spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRow {
    /// The user-facing fields
    pub content: EntryContent,
    /// Identity, absent for rows added by hand
    pub created: Option<Timestamp>,
    /// Last modification, if present
    pub updated: Option<Timestamp>,
}

impl RemoteRow {
    /// Builds the entry to insert locally, keeping the remote timestamps
    ///
    /// Returns `None` if the row has no `created`.
    pub fn into_entry(self) -> Option<Entry> {
        let created = self.created?;
        Some(Entry::from_content(
            self.content,
            created,
            self.updated.unwrap_or(created),
        ))
    }
}

/// Decodes a data row
///
/// # Returns
/// `Ok(None)` for a blank row, which is skipped
///
/// # Errors
/// A description of the problem if the date or a timestamp cannot be read
pub fn decode_row(row: &[Value]) -> Result<Option<RemoteRow>, String> {
    if row.iter().all(is_blank) {
        return Ok(None);
    }

    let cell = |i: usize| row.get(i).unwrap_or(&Value::Null);

    let date = decode_date(cell(0))?;
    let mut content = EntryContent::new(date, text(cell(2)));
    content = content.with_emoji(text(cell(1))).with_body(text(cell(3)));

    Ok(Some(RemoteRow {
        content,
        created: decode_timestamp("created", cell(4))?,
        updated: decode_timestamp("updated", cell(5))?,
    }))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode_date(value: &Value) -> Result<NaiveDate, String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            EntryContent::parse_date(s).map_err(|e| e.to_string())
        }
        Value::Number(n) => n
            .as_f64()
            .and_then(serial_to_date)
            .ok_or_else(|| format!("date serial {n} is out of range")),
        _ => Err("date is missing".to_string()),
    }
}

/// Converts a spreadsheet serial day number (days since 1899-12-30)
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

fn decode_timestamp(field: &str, value: &Value) -> Result<Option<Timestamp>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(Some)
            .ok_or_else(|| format!("{field} {n} is not a timestamp")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<Timestamp>()
            .map(Some)
            .map_err(|_| format!("{field} {s:?} is not a timestamp")),
        other => Err(format!("{field} {other} is not a timestamp")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        EntryContent::parse_date(s).unwrap()
    }

    #[test]
    fn test_header_and_range() {
        assert_eq!(
            header_row(),
            vec![
                json!("date"),
                json!("emoji"),
                json!("title"),
                json!("body"),
                json!("created"),
                json!("updated")
            ]
        );
        assert_eq!(push_range(3), "Sheet1!A1:F3");
    }

    #[test]
    fn test_entry_row_decodes_to_same_entry() {
        let entry = Entry::welcome(date("1990-01-01"), 1_000);
        let row = entry_row(&entry);
        assert_eq!(
            row,
            vec![
                json!("1990-01-01"),
                json!("\u{1f423}"),
                json!("Hello World!"),
                json!(""),
                json!(1_000),
                json!(1_000)
            ]
        );

        let decoded = decode_row(&row).unwrap().unwrap();
        assert_eq!(decoded.into_entry().unwrap(), entry);
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        assert_eq!(decode_row(&[]).unwrap(), None);
        assert_eq!(decode_row(&[json!(""), json!("  "), Value::Null]).unwrap(), None);
    }

    #[test]
    fn test_hand_added_row_has_no_identity() {
        let row = decode_row(&[json!("2021-06-01"), json!(""), json!("Moved house")])
            .unwrap()
            .unwrap();
        assert_eq!(row.created, None);
        assert_eq!(row.updated, None);
        assert_eq!(row.content.title, "Moved house");
        assert!(row.content.emoji.is_none());
        assert!(row.clone().into_entry().is_none());
    }

    #[test]
    fn test_serial_dates_and_text_timestamps() {
        // 43831 is 2020-01-01
        let row = decode_row(&[
            json!(43831),
            json!("x"),
            json!(42),
            json!(""),
            json!("1577836800000"),
            json!(""),
        ])
        .unwrap()
        .unwrap();
        assert_eq!(row.content.date, date("2020-01-01"));
        assert_eq!(row.content.title, "42");
        assert_eq!(row.created, Some(1_577_836_800_000));
        assert_eq!(row.updated, None);
        assert_eq!(row.into_entry().unwrap().updated, 1_577_836_800_000);
    }

    #[test]
    fn test_bad_cells_are_reported() {
        assert!(decode_row(&[json!("31/12/1999"), json!(""), json!("t")]).is_err());
        assert!(decode_row(&[json!(""), json!(""), json!("no date")]).is_err());
        assert!(decode_row(&[json!("1999-12-31"), json!(""), json!("t"), json!(""), json!("soon")])
            .is_err());
    }
}
