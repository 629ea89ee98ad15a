use std::collections::HashSet;

use hamlog_common::RecordId;

/// Enabled state of the batch-action toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Toolbar {
    pub selected: usize,
    /// Editing from the toolbar works on exactly one record
    pub edit_enabled: bool,
    pub delete_enabled: bool,
}

/// Checked rows of the page currently on screen.
///
/// Only ids of rendered rows can be selected. `reset` is called with the new
/// row order whenever the page is replaced, which drops every selection.
#[derive(Debug, Default)]
pub struct SelectionSet {
    rows: Vec<RecordId>,
    selected: HashSet<RecordId>,
    /// State of the header "select all" checkbox
    all_checked: bool,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with a freshly rendered set of rows
    pub fn reset(&mut self, rows: Vec<RecordId>) {
        self.rows = rows;
        self.selected.clear();
        self.all_checked = false;
    }

    /// Returns whether anything was selected before
    pub fn clear(&mut self) -> bool {
        let changed = !self.selected.is_empty() || self.all_checked;
        self.selected.clear();
        self.all_checked = false;
        changed
    }

    /// Flip one row. Returns the new checked state, or `None` when `id` is
    /// not on the current page.
    pub fn toggle(&mut self, id: RecordId) -> Option<bool> {
        if !self.rows.contains(&id) {
            return None;
        }

        if self.selected.remove(&id) {
            // unchecking a row always unchecks the header
            self.all_checked = false;
            Some(false)
        } else {
            self.selected.insert(id);
            Some(true)
        }
    }

    /// Check every row of `ids` that is on the current page and check the header.
    pub fn select_all(&mut self, ids: &[RecordId]) {
        for id in ids {
            if self.rows.contains(id) {
                self.selected.insert(*id);
            }
        }
        self.all_checked = true;
    }

    pub fn is_selected(&self, id: RecordId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected ids in row order
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.rows
            .iter()
            .filter(|id| self.selected.contains(id))
            .copied()
            .collect()
    }

    pub fn rows(&self) -> &[RecordId] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn all_checked(&self) -> bool {
        self.all_checked
    }

    pub fn toolbar(&self) -> Toolbar {
        let selected = self.len();
        Toolbar {
            selected,
            edit_enabled: selected == 1,
            delete_enabled: selected > 0,
        }
    }
}
