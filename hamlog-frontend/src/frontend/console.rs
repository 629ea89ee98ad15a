//! Terminal adapter: draws the table on stdout and reads operator commands.

use std::io::{BufRead, Write};

use hamlog_common::{HistoryEntry, RecordId, MODE_CHOICES};

use crate::backend::RecordSource;
use crate::command::{Command, HELP};
use crate::controller::{
    format_date, ControllerError, DeleteOutcome, EditForm, FormField, LoadOutcome, LogController, TableView, Toolbar,
    ViewPort, COLUMNS,
};

/// Widest a table cell gets before it is cut
const MAX_CELL_WIDTH: usize = 20;

pub struct ConsoleView<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleView<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.output, "{}", text).and_then(|_| self.output.flush()) {
            tracing::warn!("Failed to write to console: {}", e);
        }
    }

    /// Show `prompt` and read one line. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn read_command(&mut self) -> std::io::Result<Option<String>> {
        self.read_line("> ")
    }
}

impl<R: BufRead, W: Write> ViewPort for ConsoleView<R, W> {
    fn render(&mut self, table: &TableView) {
        let text = format_table(table);
        self.emit(&text);
    }

    fn selection_changed(&mut self, toolbar: &Toolbar) {
        let text = format_toolbar(toolbar);
        self.emit(&text);
    }

    fn confirm(&mut self, message: &str) -> bool {
        match self.read_line(&format!("{} [y/N] ", message)) {
            Ok(Some(answer)) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }

    fn alert(&mut self, message: &str) {
        self.emit(&format!("! {}", message));
    }

    fn show_editor(&mut self, form: &EditForm, targets: &[RecordId]) {
        let text = format_form(form, targets);
        self.emit(&text);
    }

    fn hide_editor(&mut self) {
        self.emit("Edit form closed.");
    }
}

fn fit(cell: &str, width: usize) -> String {
    let count = cell.chars().count();
    if count > width {
        let cut: String = cell.chars().take(width.saturating_sub(1)).collect();
        format!("{}~", cut)
    } else {
        format!("{}{}", cell, " ".repeat(width - count))
    }
}

pub fn format_table(table: &TableView) -> String {
    let header: Vec<String> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| match i {
            0 if table.header_checked => "[x]".to_string(),
            0 => "[ ]".to_string(),
            _ => name.to_string(),
        })
        .collect();

    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| {
            let mut line = Vec::with_capacity(COLUMNS.len());
            line.push(if row.checked { "[x]" } else { "[ ]" }.to_string());
            line.extend(row.cells.iter().cloned());
            line.push(format!("/edit {}", row.id));
            line
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .chain(std::iter::once(&header[i]))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect();

    let join = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| fit(cell, *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![join(&header)];
    match table.body.placeholder_text() {
        Some(text) => lines.push(text),
        None if rows.is_empty() => lines.push("No records.".to_string()),
        None => lines.extend(rows.iter().map(|row| join(row))),
    }

    match table.pagination {
        Some(pagination) => {
            let prev = if table.prev_enabled() { "/prev" } else { "-" };
            let next = if table.next_enabled() { "/next" } else { "-" };
            lines.push(format!("{}   {} {}", pagination, prev, next));
        }
        None => lines.push("Page -".to_string()),
    }

    lines.join("\n")
}

pub fn format_toolbar(toolbar: &Toolbar) -> String {
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };
    format!(
        "Selected: {}   edit: {}   delete: {}",
        toolbar.selected,
        on_off(toolbar.edit_enabled),
        on_off(toolbar.delete_enabled)
    )
}

pub fn format_form(form: &EditForm, targets: &[RecordId]) -> String {
    let title = match targets {
        [] => "New record".to_string(),
        [id] => format!("Editing record {}", id),
        _ => format!(
            "Editing {} records: {}",
            targets.len(),
            targets.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };

    let mut lines = vec![title];
    for field in FormField::ALL {
        lines.push(format!("  {:<10} {}", field.as_str(), form.get(field)));
    }
    lines.push(format!("  (modes: {})", MODE_CHOICES.join(" ")));
    lines.push("Use /set FIELD VALUE, then /save or /cancel.".to_string());
    lines.join("\n")
}

/// Dates use `date_format`, like the table's date column
pub fn format_history(callsign: &str, entries: &[HistoryEntry], date_format: &str) -> String {
    if entries.is_empty() {
        return format!("No previous contacts with {}", callsign);
    }

    let mut lines = vec![format!("Previous contacts with {}:", callsign)];
    for entry in entries {
        let date = match entry.date.as_deref() {
            Some(raw) => format_date(Some(raw), date_format),
            None => "-".to_string(),
        };
        lines.push(format!(
            "  {} {}  {}  {}",
            date,
            entry.time.as_deref().unwrap_or("-"),
            entry.frequency.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string()),
            entry.mode.as_deref().unwrap_or("-"),
        ));
    }
    lines.join("\n")
}

/// Read and execute commands until `/quit` or end of input.
pub async fn run<S, R, W>(controller: &mut LogController<S, ConsoleView<R, W>>) -> anyhow::Result<()>
where
    S: RecordSource + ?Sized,
    R: BufRead,
    W: Write,
{
    controller.view_mut().emit("Type /help for commands.");

    while let Some(line) = controller.view_mut().read_command()? {
        if line.is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                controller.view_mut().alert(&e.to_string());
                continue;
            }
        };
        tracing::debug!("Operator command: {:?}", command);

        if command == Command::Quit {
            break;
        }
        execute(controller, command).await;
    }

    tracing::info!("Console closed");
    Ok(())
}

async fn execute<S, R, W>(controller: &mut LogController<S, ConsoleView<R, W>>, command: Command)
where
    S: RecordSource + ?Sized,
    R: BufRead,
    W: Write,
{
    // Failures have already been shown by the controller
    let result = match command {
        Command::Next => {
            let outcome = controller.next_page().await;
            navigation(controller, outcome)
        }
        Command::Prev => {
            let outcome = controller.prev_page().await;
            navigation(controller, outcome)
        }
        Command::Page(page) => {
            let outcome = controller.load_page(page).await;
            navigation(controller, outcome)
        }
        Command::Refresh => controller.refresh().await.map(|_| ()),
        Command::Toggle(id) => {
            if controller.toggle(id).is_none() {
                controller
                    .view_mut()
                    .alert(&format!("Record {} is not on this page", id));
            }
            Ok(())
        }
        Command::SelectAll => {
            controller.set_select_all(true);
            Ok(())
        }
        Command::SelectNone => {
            controller.set_select_all(false);
            Ok(())
        }
        Command::New => {
            controller.begin_create();
            Ok(())
        }
        Command::Edit(None) => controller.edit_selected().await,
        Command::Edit(Some(id)) => controller.begin_single_edit(id).await,
        Command::Batch => controller.batch_edit_selected().await,
        Command::Set { field, value } => controller.set_field(field, &value),
        Command::Save => controller.commit().await,
        Command::Cancel => {
            if !controller.cancel_edit() {
                controller.view_mut().alert("no record is being edited");
            }
            Ok(())
        }
        Command::Delete => match controller.delete_selected().await {
            Ok(DeleteOutcome::Declined) => {
                controller.view_mut().alert("Nothing deleted");
                Ok(())
            }
            other => other.map(|_| ()),
        },
        Command::History(callsign) => controller.callsign_history(&callsign).await.map(|entries| {
            let text = format_history(&callsign, &entries, &controller.options().date_format);
            controller.view_mut().emit(&text);
        }),
        Command::Help => {
            controller.view_mut().emit(HELP);
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        tracing::debug!("Command failed: {}", e);
    }
}

fn navigation<S, R, W>(
    controller: &mut LogController<S, ConsoleView<R, W>>,
    outcome: Result<LoadOutcome, ControllerError>,
) -> Result<(), ControllerError>
where
    S: RecordSource + ?Sized,
    R: BufRead,
    W: Write,
{
    if let Ok(LoadOutcome::Ignored) = outcome {
        controller.view_mut().alert("No such page");
    }
    outcome.map(|_| ())
}
