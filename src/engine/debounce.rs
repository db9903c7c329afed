use std::time::Duration;

use crate::entities::SearchResult;

#[derive(Clone, Debug, PartialEq)]
pub enum DebounceAction {
    /// Query too short: results cleared, nothing scheduled.
    Clear,
    /// Fire `elapsed(ticket)` after `delay`; earlier tickets are dead.
    Schedule { ticket: u64, delay: Duration },
}

/// Rate-limits a rapidly changing query into search requests.
///
/// Only the last submission inside the delay window survives. Timer firings
/// carry a ticket so a late timer for an older keystroke does nothing.
#[derive(Clone, Debug)]
pub struct DebouncedQuery {
    delay: Duration,
    min_len: usize,
    ticket: u64,
    query: String,
    pending: Option<String>,
    results: Vec<SearchResult>,
}

impl DebouncedQuery {
    pub fn new(delay: Duration, min_len: usize) -> Self {
        Self {
            delay,
            min_len,
            ticket: 0,
            query: String::new(),
            pending: None,
            results: vec![],
        }
    }

    pub fn submit(&mut self, text: String) -> DebounceAction {
        self.ticket += 1;
        self.query = text.clone();

        if text.chars().count() < self.min_len {
            self.pending = None;
            self.results.clear();
            return DebounceAction::Clear;
        }

        self.pending = Some(text);

        DebounceAction::Schedule {
            ticket: self.ticket,
            delay: self.delay,
        }
    }

    /// The quiet period for `ticket` is over. Yields the text to search for
    /// if no later submission replaced it.
    pub fn elapsed(&mut self, ticket: u64) -> Option<String> {
        if ticket != self.ticket {
            return None;
        }

        self.pending.take()
    }

    /// Drops the query, any scheduled search and the shown results.
    pub fn reset(&mut self) {
        self.ticket += 1;
        self.query.clear();
        self.pending = None;
        self.results.clear();
    }

    pub fn set_results(&mut self, results: Vec<SearchResult>) {
        self.results = results;
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }
}

#[test]
fn only_last_submission_fires() {
    let mut channel = DebouncedQuery::new(Duration::from_millis(300), 2);

    let tickets: Vec<u64> = ["a", "ab", "abc"]
        .iter()
        .filter_map(|text| match channel.submit(text.to_string()) {
            DebounceAction::Schedule { ticket, .. } => Some(ticket),
            DebounceAction::Clear => None,
        })
        .collect();

    assert_eq!(tickets.len(), 2);
    assert_eq!(channel.elapsed(tickets[0]), None);
    assert_eq!(channel.elapsed(tickets[1]), Some("abc".to_string()));
    assert_eq!(channel.elapsed(tickets[1]), None);
}

#[test]
fn short_query_clears_and_cancels() {
    let mut channel = DebouncedQuery::new(Duration::from_millis(300), 2);

    let ticket = match channel.submit("seoul".into()) {
        DebounceAction::Schedule { ticket, delay } => {
            assert_eq!(delay, Duration::from_millis(300));
            ticket
        }
        DebounceAction::Clear => panic!("expected a scheduled search"),
    };
    channel.set_results(vec![]);

    assert_eq!(channel.submit("s".into()), DebounceAction::Clear);
    assert_eq!(channel.elapsed(ticket), None);
    assert!(channel.results().is_empty());
    assert!(!channel.is_scheduled());
    assert_eq!(channel.query(), "s");
}

#[test]
fn length_counts_characters() {
    let mut channel = DebouncedQuery::new(Duration::from_millis(300), 2);

    assert!(matches!(
        channel.submit("서울".into()),
        DebounceAction::Schedule { .. }
    ));
    assert_eq!(channel.submit("역".into()), DebounceAction::Clear);
    // one scalar value, two UTF-16 units
    assert_eq!(channel.submit("😀".into()), DebounceAction::Clear);
}
