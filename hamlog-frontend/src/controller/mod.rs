//! Record list state: the displayed page, the selected rows and the open edit form.
//!
//! [`LogController`] owns all three and reconciles them against a
//! [`RecordSource`]. It never draws anything itself; every visible change goes
//! through a [`ViewPort`] supplied by the adapter layer.

pub mod edit;
pub mod pagination;
pub mod render;
pub mod selection;


use std::sync::Arc;

use chrono::NaiveDateTime;
use thiserror::Error;

use hamlog_common::{HistoryEntry, Record, RecordId, RecordPage};

use crate::backend::{RecordSource, SourceError, PAGE_SIZE};

pub use edit::{CommitReport, EditForm, EditSession, FieldError, FormField, ValidationError};
pub use pagination::{LoadOutcome, PageController, PageState, PageTicket, Pagination};
pub use render::{format_date, render_table, RenderOptions, COLUMN_COUNT, COLUMNS, RowAction, RowView, TableBody, TableView};
pub use selection::{SelectionSet, Toolbar};

const DELETE_WARNING: &str = "Delete the selected records? This cannot be undone.";
const DELETE_RECONFIRM: &str = "Are you sure you want to delete these records?";

/// Output side of the controller, implemented by the UI adapter.
pub trait ViewPort {
    /// Replace the whole table
    fn render(&mut self, table: &TableView);

    fn selection_changed(&mut self, _toolbar: &Toolbar) {}

    /// Blocking yes/no question
    fn confirm(&mut self, message: &str) -> bool;

    fn alert(&mut self, message: &str);

    fn show_editor(&mut self, form: &EditForm, targets: &[RecordId]);

    fn hide_editor(&mut self);
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("select at least one record")]
    NothingSelected,
    #[error("only one record can be edited at a time")]
    TooManySelected,
    #[error("no record is being edited")]
    NoSession,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Field(#[from] FieldError),
    /// First failed call of a commit, in target order
    #[error("{source}")]
    Update { id: RecordId, source: SourceError },
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(usize),
    /// The operator said no at one of the confirmations
    Declined,
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub struct LogController<S: RecordSource + ?Sized, V: ViewPort> {
    source: Arc<S>,
    view: V,
    pages: PageController,
    selection: SelectionSet,
    session: Option<EditSession>,
    options: RenderOptions,
    clock: fn() -> NaiveDateTime,
}

impl<S: RecordSource + ?Sized, V: ViewPort> LogController<S, V> {
    pub fn new(source: Arc<S>, view: V) -> Self {
        Self {
            source,
            view,
            pages: PageController::new(),
            selection: SelectionSet::new(),
            session: None,
            options: RenderOptions::default(),
            clock: local_now,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the source of "now" used to pre-fill empty date and time fields
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn pages(&self) -> &PageController {
        &self.pages
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn table(&self) -> TableView {
        render_table(&self.pages, &self.selection, &self.options)
    }

    fn render(&mut self) {
        let table = self.table();
        self.view.render(&table);
    }

    // ---- page loading ----

    /// Start loading `page`. The rows make way for the loading placeholder,
    /// so the selection goes with them.
    ///
    /// Returns `None` when the page is out of range; nothing changes then.
    pub fn begin_load(&mut self, page: u32) -> Option<PageTicket> {
        let ticket = self.pages.request(page)?;
        tracing::debug!("Loading page {} (request #{})", page, ticket.seq());

        let had_selection = !self.selection.is_empty();
        self.selection.reset(Vec::new());
        self.render();
        if had_selection {
            self.on_selection_changed();
        }
        Some(ticket)
    }

    /// Feed the result of a page request back in.
    pub fn on_page_loaded(
        &mut self,
        ticket: PageTicket,
        result: Result<RecordPage, SourceError>,
    ) -> Result<LoadOutcome, ControllerError> {
        let outcome = self.pages.complete(ticket, result);

        match outcome {
            Ok(LoadOutcome::Applied) => {
                let rows = self.pages.page().map(|p| p.ids()).unwrap_or_default();
                tracing::info!("Showing page {} with {} records", ticket.page(), rows.len());
                self.selection.reset(rows);
                self.render();
                self.on_selection_changed();
                Ok(LoadOutcome::Applied)
            }
            Ok(other) => Ok(other),
            Err(e) => {
                self.render();
                Err(e.into())
            }
        }
    }

    /// Load `page`. If the total shrank so that `page` no longer exists, the
    /// new last page is loaded instead.
    pub async fn load_page(&mut self, page: u32) -> Result<LoadOutcome, ControllerError> {
        let mut page = page;
        loop {
            let Some(ticket) = self.begin_load(page) else {
                return Ok(LoadOutcome::Ignored);
            };
            let result = self.source.list_page(page, PAGE_SIZE).await;
            let outcome = self.on_page_loaded(ticket, result)?;

            match self.pages.past_last_page() {
                Some(last) if outcome == LoadOutcome::Applied => {
                    tracing::debug!("Page {} is past the last page {}, moving back", page, last);
                    page = last;
                }
                _ => return Ok(outcome),
            }
        }
    }

    /// Reload the page currently shown
    pub async fn refresh(&mut self) -> Result<LoadOutcome, ControllerError> {
        let page = self.pages.current_page();
        self.load_page(page).await
    }

    /// No-op unless a later page exists
    pub async fn next_page(&mut self) -> Result<LoadOutcome, ControllerError> {
        match self.pages.next_page() {
            Some(page) => self.load_page(page).await,
            None => Ok(LoadOutcome::Ignored),
        }
    }

    pub async fn prev_page(&mut self) -> Result<LoadOutcome, ControllerError> {
        match self.pages.prev_page() {
            Some(page) => self.load_page(page).await,
            None => Ok(LoadOutcome::Ignored),
        }
    }

    // ---- selection ----

    /// Flip the checkbox of one row. Returns the new state, or `None` when the
    /// row is not on screen.
    pub fn toggle(&mut self, id: RecordId) -> Option<bool> {
        let checked = self.selection.toggle(id)?;
        self.render();
        self.on_selection_changed();
        Some(checked)
    }

    /// Header checkbox
    pub fn set_select_all(&mut self, checked: bool) {
        if checked {
            let rows = self.selection.rows().to_vec();
            self.selection.select_all(&rows);
        } else {
            self.selection.clear();
        }
        self.render();
        self.on_selection_changed();
    }

    pub fn on_selection_changed(&mut self) {
        let toolbar = self.selection.toolbar();
        self.view.selection_changed(&toolbar);
    }

    pub async fn dispatch(&mut self, action: RowAction) -> Result<(), ControllerError> {
        match action {
            RowAction::Toggle(id) => {
                self.toggle(id);
                Ok(())
            }
            RowAction::Edit(id) => self.begin_single_edit(id).await,
        }
    }

    // ---- editing ----

    /// Toolbar edit button: works on exactly one selected record
    pub async fn edit_selected(&mut self) -> Result<(), ControllerError> {
        let ids = self.selection.selected_ids();
        match ids.as_slice() {
            [] => self.refuse(ControllerError::NothingSelected),
            [id] => self.begin_single_edit(*id).await,
            _ => self.refuse(ControllerError::TooManySelected),
        }
    }

    /// Open the form for one record, fetched fresh from the source
    pub async fn begin_single_edit(&mut self, id: RecordId) -> Result<(), ControllerError> {
        self.open_session(vec![id]).await
    }

    /// Open one form whose values will overwrite every record in `ids`. The
    /// form starts with the values of the first one.
    pub async fn begin_batch_edit(&mut self, ids: Vec<RecordId>) -> Result<(), ControllerError> {
        if ids.is_empty() {
            return self.refuse(ControllerError::NothingSelected);
        }
        self.open_session(ids).await
    }

    pub async fn batch_edit_selected(&mut self) -> Result<(), ControllerError> {
        let ids = self.selection.selected_ids();
        self.begin_batch_edit(ids).await
    }

    async fn open_session(&mut self, targets: Vec<RecordId>) -> Result<(), ControllerError> {
        let Some(first) = targets.first().copied() else {
            return self.refuse(ControllerError::NothingSelected);
        };

        let fetched = self.source.get_one(first).await;
        let record = match fetched {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Could not load record {} for editing: {}", first, e);
                return self.refuse(e.into());
            }
        };

        if self.session.is_some() {
            tracing::debug!("Discarding the previous edit form");
        }

        let form = EditForm::from_record(&record, (self.clock)());
        let session = if targets.len() == 1 {
            EditSession::single(first, form)
        } else {
            EditSession::batch(targets, form)
        };
        self.view.show_editor(session.form(), session.targets());
        self.session = Some(session);
        Ok(())
    }

    /// Open an empty form for a contact that is not logged yet
    pub fn begin_create(&mut self) {
        if self.session.is_some() {
            tracing::debug!("Discarding the previous edit form");
        }
        let form = EditForm::from_record(&Record::default(), (self.clock)());
        let session = EditSession::new_record(form);
        self.view.show_editor(session.form(), session.targets());
        self.session = Some(session);
    }

    pub fn set_field(&mut self, field: FormField, value: &str) -> Result<(), ControllerError> {
        let Some(session) = self.session.as_mut() else {
            return self.refuse(ControllerError::NoSession);
        };
        let updated = session.form_mut().set(field, value);
        match updated {
            Ok(()) => {
                self.view.show_editor(session.form(), session.targets());
                Ok(())
            }
            Err(e) => self.refuse(e.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ControllerError> {
        let session = self.session.as_ref().ok_or(ControllerError::NoSession)?;
        session.form().validate()?;
        Ok(())
    }

    /// Submit the form to every target, or log it as a new contact when it
    /// has none. A form that does not validate sends nothing and stays open.
    pub async fn commit(&mut self) -> Result<(), ControllerError> {
        let Some(session) = self.session.as_ref() else {
            return self.refuse(ControllerError::NoSession);
        };

        if session.is_new() {
            let created = session.create(self.source.as_ref()).await;
            return match created {
                Ok(result) => self.on_create_result(result).await,
                Err(e) => self.refuse(e.into()),
            };
        }

        let committed = session.commit(self.source.as_ref()).await;
        match committed {
            Ok(report) => self.on_commit_result(report).await,
            Err(e) => self.refuse(e.into()),
        }
    }

    /// Close the form and report how the commit went. Successful calls of a
    /// partly failed batch stay applied and the page is not reloaded.
    pub async fn on_commit_result(&mut self, report: CommitReport) -> Result<(), ControllerError> {
        self.session = None;
        self.view.hide_editor();

        if let Some((id, e)) = report.first_failure() {
            tracing::warn!(
                "Update failed for {} of {} records, first failure on {}: {}",
                report.failures.len(),
                report.targets.len(),
                id,
                e
            );
            return self.refuse(ControllerError::Update {
                id: *id,
                source: e.clone(),
            });
        }

        tracing::info!("Updated {} record(s)", report.targets.len());
        self.view.alert("Updated");
        self.refresh().await?;
        Ok(())
    }

    pub async fn on_create_result(&mut self, result: Result<(), SourceError>) -> Result<(), ControllerError> {
        self.session = None;
        self.view.hide_editor();

        if let Err(e) = result {
            tracing::warn!("Creating record failed: {}", e);
            return self.refuse(e.into());
        }

        self.view.alert("Created");
        self.refresh().await?;
        Ok(())
    }

    /// Returns whether a form was open
    pub fn cancel_edit(&mut self) -> bool {
        if self.session.take().is_some() {
            self.view.hide_editor();
            true
        } else {
            false
        }
    }

    // ---- deleting ----

    pub async fn delete_selected(&mut self) -> Result<DeleteOutcome, ControllerError> {
        let ids = self.selection.selected_ids();
        if ids.is_empty() {
            return self.refuse(ControllerError::NothingSelected);
        }

        if !self.view.confirm(DELETE_WARNING) || !self.view.confirm(DELETE_RECONFIRM) {
            tracing::debug!("Deletion of {:?} declined", ids);
            return Ok(DeleteOutcome::Declined);
        }

        tracing::info!("Deleting records {:?}", ids);
        let deleted = self.source.delete_many(&ids).await;
        if let Err(e) = deleted {
            tracing::warn!("Deleting {:?} failed: {}", ids, e);
            return self.refuse(e.into());
        }

        self.view.alert("Deleted");
        self.refresh().await?;
        Ok(DeleteOutcome::Deleted(ids.len()))
    }

    // ---- lookups ----

    pub async fn callsign_history(&mut self, callsign: &str) -> Result<Vec<HistoryEntry>, ControllerError> {
        let history = self.source.callsign_history(callsign.trim()).await;
        match history {
            Ok(entries) => Ok(entries),
            Err(e) => self.refuse(e.into()),
        }
    }

    /// Show `error` to the operator and return it
    fn refuse<T>(&mut self, error: ControllerError) -> Result<T, ControllerError> {
        self.view.alert(&error.to_string());
        Err(error)
    }
}
