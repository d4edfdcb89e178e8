//! Daily generation quota and the local date key shared with calendar views.
//!
//! Dates are always resolved in the observer's timezone, never UTC, so a card
//! created at 23:59 local time counts for that local day.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};

use crate::models::Card;

pub const DEFAULT_DAILY_LIMIT: u32 = 5;

/// `YYYY-MM-DD` of an instant as seen in `tz`.
pub fn local_date_key<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> String {
    date_key(at.with_timezone(tz).date_naive())
}

pub fn date_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Today's date in the machine's local timezone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Advisory cap on card generations per local day. Nothing server-side
/// enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaGate {
    limit: u32,
}

impl Default for QuotaGate {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT)
    }
}

impl QuotaGate {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of cards created on `today` (local to `tz`).
    pub fn used_on<Tz: TimeZone>(&self, cards: &[Card], today: NaiveDate, tz: &Tz) -> u32 {
        let count = cards
            .iter()
            .filter(|c| c.created_at.with_timezone(tz).date_naive() == today)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// `limit - used`, never below zero.
    pub fn remaining_on<Tz: TimeZone>(&self, cards: &[Card], today: NaiveDate, tz: &Tz) -> u32 {
        self.limit.saturating_sub(self.used_on(cards, today, tz))
    }

    pub fn is_exhausted_on<Tz: TimeZone>(&self, cards: &[Card], today: NaiveDate, tz: &Tz) -> bool {
        self.remaining_on(cards, today, tz) == 0
    }

    pub fn remaining_today(&self, cards: &[Card]) -> u32 {
        self.remaining_on(cards, local_today(), &Local)
    }

    pub fn is_exhausted_today(&self, cards: &[Card]) -> bool {
        self.remaining_today(cards) == 0
    }
}
