//! Projection of the current page and selection into a table view.

use hamlog_common::datetime::parse_record_date;
use hamlog_common::{Record, RecordId};

use super::pagination::{PageController, PageState, Pagination};
use super::selection::{SelectionSet, Toolbar};

/// Column headings, selection checkbox first and row actions last
pub const COLUMNS: [&str; 17] = [
    "",
    "Date",
    "Time",
    "Callsign",
    "Frequency",
    "Mode",
    "Equipment",
    "Antenna",
    "Power",
    "Country",
    "Grid",
    "Province",
    "Band",
    "QSL",
    "Notes",
    "Status",
    "Actions",
];

pub const COLUMN_COUNT: usize = COLUMNS.len();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// chrono format used for the date column
    pub date_format: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Control bound on a table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Toggle(RecordId),
    Edit(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: RecordId,
    pub checked: bool,
    /// Display values from date to status, one per data column
    pub cells: Vec<String>,
}

impl RowView {
    pub fn checkbox(&self) -> RowAction {
        RowAction::Toggle(self.id)
    }

    pub fn edit_button(&self) -> RowAction {
        RowAction::Edit(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    /// Single full-width "loading" row
    Loading,
    /// Single full-width row carrying the error
    Failed(String),
    Rows(Vec<RowView>),
}

impl TableBody {
    /// Columns spanned by the placeholder row
    pub fn placeholder_span(&self) -> Option<usize> {
        match self {
            TableBody::Loading | TableBody::Failed(_) => Some(COLUMN_COUNT),
            TableBody::Rows(_) => None,
        }
    }

    pub fn placeholder_text(&self) -> Option<String> {
        match self {
            TableBody::Loading => Some("Loading...".to_string()),
            TableBody::Failed(message) => Some(format!("Failed to load: {}", message)),
            TableBody::Rows(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub header_checked: bool,
    pub body: TableBody,
    /// `None` while the total is unknown; navigation is disabled then
    pub pagination: Option<Pagination>,
    pub toolbar: Toolbar,
}

impl TableView {
    pub fn rows(&self) -> &[RowView] {
        match &self.body {
            TableBody::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn prev_enabled(&self) -> bool {
        self.pagination.is_some_and(|p| p.has_prev())
    }

    pub fn next_enabled(&self) -> bool {
        self.pagination.is_some_and(|p| p.has_next())
    }
}

/// Build the whole table. The body is always produced from scratch.
pub fn render_table(pages: &PageController, selection: &SelectionSet, options: &RenderOptions) -> TableView {
    let body = match pages.state() {
        PageState::Idle => TableBody::Rows(Vec::new()),
        PageState::Loading => TableBody::Loading,
        PageState::Failed(message) => TableBody::Failed(message.clone()),
        PageState::Loaded(page) => TableBody::Rows(
            page.records
                .iter()
                .map(|record| render_row(record, selection.is_selected(record.id), options))
                .collect(),
        ),
    };

    TableView {
        header_checked: selection.all_checked(),
        body,
        pagination: pages.pagination(),
        toolbar: selection.toolbar(),
    }
}

pub fn render_row(record: &Record, checked: bool, options: &RenderOptions) -> RowView {
    let qsl = match (record.qslcard, record.qsl_status()) {
        (_, Some(status)) => status.display_text().to_string(),
        (Some(_), None) => "Unknown".to_string(),
        (None, None) => String::new(),
    };

    RowView {
        id: record.id,
        checked,
        cells: vec![
            format_date(record.date.as_deref(), &options.date_format),
            text(&record.time),
            text(&record.callsign),
            number(record.frequency),
            text(&record.mode),
            text(&record.equipment),
            text(&record.antenna),
            number(record.power),
            text(&record.dxcc),
            text(&record.grid),
            text(&record.province),
            text(&record.band),
            qsl,
            text(&record.notes),
            text(&record.status),
        ],
    }
}

/// Unparseable dates are shown as sent by the server
pub fn format_date(raw: Option<&str>, format: &str) -> String {
    match raw {
        Some(raw) => match parse_record_date(raw) {
            Some(date) => date.format(format).to_string(),
            None => raw.to_string(),
        },
        None => String::new(),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SourceError;
    use hamlog_common::RecordPage;

    fn loaded(records: Vec<Record>, total: u64) -> PageController {
        let mut pages = PageController::new();
        let ticket = pages.request(1).unwrap();
        pages
            .complete(ticket, Ok(RecordPage { page: 1, records, total }))
            .unwrap();
        pages
    }

    #[test]
    fn test_unset_fields_render_empty() {
        let row = render_row(&Record::new(RecordId(5)), false, &RenderOptions::default());
        assert_eq!(row.cells.len(), COLUMN_COUNT - 2);
        assert!(row.cells.iter().all(|c| c.is_empty()), "cells: {:?}", row.cells);
    }

    #[test]
    fn test_row_formatting() {
        let record = Record {
            callsign: Some("JA1XYZ".to_string()),
            frequency: Some(7.074),
            power: Some(100.0),
            qslcard: Some(1),
            date: Some("Sat, 17 Oct 2026 00:00:00 GMT".to_string()),
            time: Some("12:34:56".to_string()),
            ..Record::new(RecordId(1))
        };
        let options = RenderOptions { date_format: "%d %b %Y".to_string() };
        let row = render_row(&record, true, &options);

        assert!(row.checked);
        assert_eq!(row.cells[0], "17 Oct 2026");
        assert_eq!(row.cells[1], "12:34:56");
        assert_eq!(row.cells[2], "JA1XYZ");
        assert_eq!(row.cells[3], "7.074");
        assert_eq!(row.cells[7], "100");
        assert_eq!(row.cells[12], "Sent");
        assert_eq!(row.edit_button(), RowAction::Edit(RecordId(1)));
    }

    #[test]
    fn test_unknown_qsl_code_and_raw_date() {
        let record = Record {
            qslcard: Some(7),
            date: Some("last tuesday".to_string()),
            ..Record::new(RecordId(1))
        };
        let row = render_row(&record, false, &RenderOptions::default());
        assert_eq!(row.cells[12], "Unknown");
        assert_eq!(row.cells[0], "last tuesday");
    }

    #[test]
    fn test_render_is_idempotent() {
        let pages = loaded((1..=3).map(|i| Record::new(RecordId(i))).collect(), 3);
        let mut selection = SelectionSet::new();
        selection.reset(pages.page().unwrap().ids());
        selection.toggle(RecordId(2));

        let options = RenderOptions::default();
        let first = render_table(&pages, &selection, &options);
        let second = render_table(&pages, &selection, &options);
        assert_eq!(first, second);
        assert_eq!(first.rows().len(), 3);
        assert!(first.rows()[1].checked);
        assert!(!first.header_checked);
    }

    #[test]
    fn test_placeholders_span_all_columns() {
        let mut pages = PageController::new();
        let ticket = pages.request(1).unwrap();
        let selection = SelectionSet::new();
        let options = RenderOptions::default();

        let table = render_table(&pages, &selection, &options);
        assert_eq!(table.body, TableBody::Loading);
        assert_eq!(table.body.placeholder_span(), Some(17));

        let _ = pages.complete(ticket, Err(SourceError::Transport("connection refused".into())));
        let table = render_table(&pages, &selection, &options);
        assert_eq!(table.body.placeholder_span(), Some(17));
        assert_eq!(
            table.body.placeholder_text().as_deref(),
            Some("Failed to load: request failed: connection refused")
        );
        assert!(table.pagination.is_none());
        assert!(!table.prev_enabled() && !table.next_enabled());
    }
}
