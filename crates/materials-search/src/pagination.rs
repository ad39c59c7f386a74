//! Page reset and page clamp rules.

use crate::intent::SearchIntent;
use crate::material::ResultPage;
use crate::sequencer::RequestTicket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampOutcome {
    InBounds,
    /// Page was out of range; re-issue once for `to`.
    Reissue { from: u32, to: u32 },
    /// Out of range again after a corrective request. Clamp, but stop there.
    ClampOnly { from: u32, to: u32 },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PaginationController;

impl PaginationController {
    /// Explicit navigation. Touches nothing but the page.
    pub fn request_page(intent: &mut SearchIntent, page: u32) -> bool {
        let page = page.max(1);
        let changed = intent.page != page;
        intent.page = page;
        changed
    }

    /// Any filter change sends the next request back to the first page.
    pub fn reset_for_filter_change(intent: &mut SearchIntent) {
        intent.page = 1;
    }

    pub fn clamp(page: u32, total_pages: u32) -> u32 {
        page.clamp(1, total_pages.max(1))
    }

    pub fn check(ticket: &RequestTicket, result: &ResultPage) -> ClampOutcome {
        let from = ticket.intent.page;
        let to = Self::clamp(from, result.total_pages);
        if to == from {
            ClampOutcome::InBounds
        } else if ticket.corrective {
            ClampOutcome::ClampOnly { from, to }
        } else {
            ClampOutcome::Reissue { from, to }
        }
    }
}
