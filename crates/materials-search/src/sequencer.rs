//! Request sequencing.
//!
//! Every issued request gets the next sequence number. When a response comes
//! back it is accepted only if its sequence is still the latest issued; any
//! other response belongs to a superseded search and is dropped, whatever
//! order the network delivered it in.

use std::collections::BTreeMap;

use crate::intent::SearchIntent;
use crate::listing::ListingRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestTicket {
    pub sequence: u64,
    pub intent: SearchIntent,
    /// Issued by the pagination clamp rather than by a user change.
    pub corrective: bool,
}

impl RequestTicket {
    pub fn request(&self, per_page: u32) -> ListingRequest {
        ListingRequest::from_intent(&self.intent, per_page)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The response answers the latest request and may be applied.
    Accepted(RequestTicket),
    /// The response is from a superseded (or unknown) request.
    Stale { sequence: u64, latest: u64 },
}

#[derive(Debug, Default)]
pub struct FetchSequencer {
    latest_issued: u64,
    in_flight: BTreeMap<u64, RequestTicket>,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, intent: SearchIntent, corrective: bool) -> RequestTicket {
        self.latest_issued += 1;
        let ticket = RequestTicket {
            sequence: self.latest_issued,
            intent,
            corrective,
        };
        self.in_flight.insert(ticket.sequence, ticket.clone());
        ticket
    }

    /// Consume the ticket for `sequence` and decide whether its response counts.
    pub fn settle(&mut self, sequence: u64) -> Settlement {
        match self.in_flight.remove(&sequence) {
            Some(ticket) if sequence == self.latest_issued => Settlement::Accepted(ticket),
            _ => Settlement::Stale {
                sequence,
                latest: self.latest_issued,
            },
        }
    }

    pub fn latest_issued(&self) -> u64 {
        self.latest_issued
    }

    pub fn is_latest(&self, sequence: u64) -> bool {
        sequence == self.latest_issued
    }

    /// Whether the latest request is still waiting for its response.
    pub fn is_loading(&self) -> bool {
        self.in_flight.contains_key(&self.latest_issued)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Forget every outstanding ticket; their responses will all be stale.
    pub fn abandon_all(&mut self) {
        self.in_flight.clear();
    }
}
