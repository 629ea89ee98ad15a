//! Page fetch lifecycle.
//!
//! Every request gets a sequence number. Only the completion carrying the
//! latest sequence number is applied; anything older has been superseded and
//! is dropped on arrival, whatever order the network delivers it in.

use hamlog_common::RecordPage;

use crate::backend::{SourceError, PAGE_SIZE};

/// Handle for one outstanding page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    seq: u64,
    page: u32,
}

impl PageTicket {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result replaced the current page
    Applied,
    /// A newer request was issued meanwhile; the result was dropped
    Superseded,
    /// The page number was out of range, nothing was requested
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// Nothing requested yet
    Idle,
    Loading,
    Loaded(RecordPage),
    Failed(String),
}

/// `page n of m` summary shown under the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl Pagination {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

impl std::fmt::Display for Pagination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Page {} of {} ({} records)", self.page, self.total_pages, self.total)
    }
}

/// Number of pages needed for `total` records, never less than one
pub fn page_count(total: u64) -> u32 {
    let pages = total.div_ceil(PAGE_SIZE as u64).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug)]
pub struct PageController {
    /// Last page number that was successfully displayed
    current_page: u32,
    total: Option<u64>,
    latest_seq: u64,
    in_flight: Option<PageTicket>,
    state: PageState,
}

impl Default for PageController {
    fn default() -> Self {
        Self::new()
    }
}

impl PageController {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            total: None,
            latest_seq: 0,
            in_flight: None,
            state: PageState::Idle,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Unset until a page has loaded, and again after a failed load
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn last_page(&self) -> Option<u32> {
        self.total.map(page_count)
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn page(&self) -> Option<&RecordPage> {
        match &self.state {
            PageState::Loaded(page) => Some(page),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<PageTicket> {
        self.in_flight
    }

    pub fn pagination(&self) -> Option<Pagination> {
        let total = self.total?;
        self.page()?;
        Some(Pagination {
            page: self.current_page,
            total_pages: page_count(total),
            total,
        })
    }

    pub fn next_page(&self) -> Option<u32> {
        let pagination = self.pagination()?;
        pagination.has_next().then_some(pagination.page + 1)
    }

    pub fn prev_page(&self) -> Option<u32> {
        let pagination = self.pagination()?;
        pagination.has_prev().then_some(pagination.page - 1)
    }

    /// Last page, when the page on display lies beyond it. Happens when
    /// records vanish between loads, e.g. after emptying the last page.
    pub fn past_last_page(&self) -> Option<u32> {
        let last = self.last_page()?;
        self.page()?;
        (self.current_page > last).then_some(last)
    }

    /// Whether `page` may be requested. Without a known total only the lower
    /// bound can be checked.
    pub fn accepts(&self, page: u32) -> bool {
        if page < 1 {
            return false;
        }
        match self.last_page() {
            Some(last) => page <= last,
            None => true,
        }
    }

    /// Start a request for `page`, superseding any request still in flight.
    pub fn request(&mut self, page: u32) -> Option<PageTicket> {
        if !self.accepts(page) {
            tracing::debug!("Page {} out of range (last page {:?}), ignoring", page, self.last_page());
            return None;
        }

        if let Some(previous) = self.in_flight {
            tracing::debug!("Page {} request #{} superseded", previous.page, previous.seq);
        }

        self.latest_seq += 1;
        let ticket = PageTicket {
            seq: self.latest_seq,
            page,
        };
        self.in_flight = Some(ticket);
        self.state = PageState::Loading;
        Some(ticket)
    }

    pub fn is_current(&self, ticket: &PageTicket) -> bool {
        ticket.seq == self.latest_seq
    }

    /// Apply the result of `ticket` if it is still the latest request.
    ///
    /// A failed current request clears the total and leaves the error as the
    /// page state; a failed superseded request is dropped like any other.
    pub fn complete(
        &mut self,
        ticket: PageTicket,
        result: Result<RecordPage, SourceError>,
    ) -> Result<LoadOutcome, SourceError> {
        if !self.is_current(&ticket) {
            tracing::debug!(
                "Dropping result of page {} request #{} (latest is #{})",
                ticket.page,
                ticket.seq,
                self.latest_seq
            );
            return Ok(LoadOutcome::Superseded);
        }

        self.in_flight = None;

        match result {
            Ok(mut page) => {
                page.page = ticket.page;
                self.current_page = ticket.page;
                self.total = Some(page.total);
                self.state = PageState::Loaded(page);
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!("Loading page {} failed: {}", ticket.page, e);
                self.total = None;
                self.state = PageState::Failed(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamlog_common::{Record, RecordId};

    fn page_of(n: usize, total: u64) -> RecordPage {
        RecordPage {
            page: 0,
            records: (0..n).map(|i| Record::new(RecordId(i as i64 + 1))).collect(),
            total,
        }
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(25), 1);
        assert_eq!(page_count(26), 2);
        assert_eq!(page_count(30), 2);
    }

    #[test]
    fn test_bounds_guard() {
        let mut pages = PageController::new();
        assert!(pages.request(0).is_none());
        // Unknown total: anything from 1 up is allowed
        let ticket = pages.request(2).unwrap();
        pages.complete(ticket, Ok(page_of(5, 30))).unwrap();
        assert!(!pages.accepts(3));
        assert!(pages.accepts(2));
        assert!(pages.request(3).is_none());
        assert!(!pages.is_loading());
    }

    #[test]
    fn test_newest_ticket_wins_in_either_order() {
        let mut pages = PageController::new();
        let first = pages.request(1).unwrap();
        let second = pages.request(2).unwrap();
        assert!(!pages.is_current(&first));

        assert_eq!(pages.complete(first, Ok(page_of(25, 60))), Ok(LoadOutcome::Superseded));
        assert!(pages.is_loading());
        assert_eq!(pages.state(), &PageState::Loading);

        assert_eq!(pages.complete(second, Ok(page_of(25, 60))), Ok(LoadOutcome::Applied));
        assert_eq!(pages.current_page(), 2);
        assert_eq!(pages.page().map(|p| p.page), Some(2));
        assert!(!pages.is_loading());

        // Late arrival after the newer result was applied
        assert_eq!(pages.complete(first, Err(SourceError::Transport("late".into()))), Ok(LoadOutcome::Superseded));
        assert_eq!(pages.current_page(), 2);
    }

    #[test]
    fn test_failure_unsets_total_and_keeps_page_number() {
        let mut pages = PageController::new();
        let ticket = pages.request(1).unwrap();
        pages.complete(ticket, Ok(page_of(25, 30))).unwrap();

        let ticket = pages.request(2).unwrap();
        let err = pages
            .complete(ticket, Err(SourceError::Status { context: "loading logs".into(), status: 502 }))
            .unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 502, .. }));
        assert_eq!(pages.total(), None);
        assert_eq!(pages.current_page(), 1);
        assert!(pages.pagination().is_none());
        assert!(matches!(pages.state(), PageState::Failed(msg) if msg.contains("502")));
        assert!(!pages.is_loading());
    }

    #[test]
    fn test_shrunk_total_leaves_page_past_end() {
        let mut pages = PageController::new();
        let ticket = pages.request(2).unwrap();
        pages.complete(ticket, Ok(page_of(5, 30))).unwrap();
        assert_eq!(pages.past_last_page(), None);

        let ticket = pages.request(2).unwrap();
        assert_eq!(pages.past_last_page(), None);
        pages.complete(ticket, Ok(page_of(0, 25))).unwrap();
        assert_eq!(pages.past_last_page(), Some(1));
    }

    #[test]
    fn test_navigation_targets() {
        let mut pages = PageController::new();
        let ticket = pages.request(1).unwrap();
        pages.complete(ticket, Ok(page_of(25, 30))).unwrap();

        let pagination = pages.pagination().unwrap();
        assert_eq!(pagination.to_string(), "Page 1 of 2 (30 records)");
        assert!(!pagination.has_prev());
        assert!(pagination.has_next());
        assert_eq!(pages.next_page(), Some(2));
        assert_eq!(pages.prev_page(), None);
    }
}
