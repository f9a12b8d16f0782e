//! Filtered views over fetched collections.
//!
//! The source is never mutated. `visible()` is recomputed from the source
//! and the current predicates on every call, and keeps source order.

use std::ops::RangeInclusive;

use shared::{
    domain::Amount,
    protocol::{Employee, Reservation, Review, Service, SupportTicket, Transaction},
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Service,
    Location,
    Rate,
    Search,
    Status,
}

/// Inclusive price bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateRange {
    pub min: Option<Amount>,
    pub max: Option<Amount>,
}

impl RateRange {
    pub fn between(min: Amount, max: Amount) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, amount: Amount) -> bool {
        self.min.map_or(true, |min| amount >= min) && self.max.map_or(true, |max| amount <= max)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

impl From<RangeInclusive<Amount>> for RateRange {
    fn from(range: RangeInclusive<Amount>) -> Self {
        Self::between(*range.start(), *range.end())
    }
}

/// One predicate to set. Blank text or an unbounded range clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterField {
    Service(String),
    Location(String),
    Rate(RateRange),
    Search(String),
    Status(String),
}

impl FilterField {
    pub fn key(&self) -> FilterKey {
        match self {
            Self::Service(_) => FilterKey::Service,
            Self::Location(_) => FilterKey::Location,
            Self::Rate(_) => FilterKey::Rate,
            Self::Search(_) => FilterKey::Search,
            Self::Status(_) => FilterKey::Status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub service: Option<String>,
    pub location: Option<String>,
    pub rate_range: Option<RateRange>,
    pub search_text: Option<String>,
    pub status: Option<String>,
}

fn normalized(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_lowercase())
}

fn same_text(candidate: Option<&str>, wanted: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => candidate.is_some_and(|value| value.trim().to_lowercase() == *wanted),
    }
}

impl FilterState {
    pub fn set(&mut self, field: FilterField) {
        match field {
            FilterField::Service(value) => self.service = normalized(value),
            FilterField::Location(value) => self.location = normalized(value),
            FilterField::Rate(range) => self.rate_range = (!range.is_unbounded()).then_some(range),
            FilterField::Search(value) => self.search_text = normalized(value),
            FilterField::Status(value) => self.status = normalized(value),
        }
    }

    pub fn clear(&mut self, key: FilterKey) {
        match key {
            FilterKey::Service => self.service = None,
            FilterKey::Location => self.location = None,
            FilterKey::Rate => self.rate_range = None,
            FilterKey::Search => self.search_text = None,
            FilterKey::Status => self.status = None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// All set predicates must hold. A predicate on a facet the record
    /// does not have never holds.
    pub fn matches<T: Filterable + ?Sized>(&self, record: &T) -> bool {
        same_text(record.service(), &self.service)
            && same_text(record.location(), &self.location)
            && same_text(record.status(), &self.status)
            && self
                .rate_range
                .map_or(true, |range| record.rate().is_some_and(|rate| range.contains(rate)))
            && self.search_text.as_ref().map_or(true, |needle| {
                record.search_text().to_lowercase().contains(needle.as_str())
            })
    }
}

/// The facets a record exposes to the filter.
pub trait Filterable {
    fn service(&self) -> Option<&str> {
        None
    }

    fn location(&self) -> Option<&str> {
        None
    }

    fn rate(&self) -> Option<Amount> {
        None
    }

    fn status(&self) -> Option<&str> {
        None
    }

    /// Text matched by the free-text search.
    fn search_text(&self) -> String;
}

impl Filterable for Employee {
    fn service(&self) -> Option<&str> {
        Some(&self.service)
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location)
    }

    fn rate(&self) -> Option<Amount> {
        Some(self.hourly_rate)
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.first_name, self.last_name, self.service)
    }
}

impl Filterable for Service {
    fn service(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn rate(&self) -> Option<Amount> {
        Some(self.price)
    }

    fn status(&self) -> Option<&str> {
        Some(if self.active { "active" } else { "inactive" })
    }

    fn search_text(&self) -> String {
        match &self.description {
            Some(description) => format!("{} {}", self.name, description),
            None => self.name.clone(),
        }
    }
}

impl Filterable for Review {
    fn status(&self) -> Option<&str> {
        Some(if self.archived { "archived" } else { "published" })
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.author_name, self.comment)
    }
}

impl Filterable for Transaction {
    fn service(&self) -> Option<&str> {
        Some(self.method.as_str())
    }

    fn rate(&self) -> Option<Amount> {
        Some(self.amount)
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_text(&self) -> String {
        let mut text = self.id.to_string();
        for part in [
            self.reservation_id.as_ref().map(|id| id.as_str()),
            self.reference.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            text.push(' ');
            text.push_str(part);
        }
        text
    }
}

impl Filterable for Reservation {
    fn location(&self) -> Option<&str> {
        Some(&self.address)
    }

    fn rate(&self) -> Option<Amount> {
        Some(self.amount)
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.client.name, self.client.phone, self.client.email, self.address
        )
    }
}

impl Filterable for SupportTicket {
    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.subject, self.message, self.requester_email)
    }
}

#[derive(Debug, Clone)]
pub struct ListController<T> {
    source: Vec<T>,
    filter: FilterState,
}

impl<T> Default for ListController<T> {
    fn default() -> Self {
        Self {
            source: Vec::new(),
            filter: FilterState::default(),
        }
    }
}

impl<T: Filterable> ListController<T> {
    pub fn new(source: Vec<T>) -> Self {
        Self {
            source,
            filter: FilterState::default(),
        }
    }

    /// Replaces the fetched collection, keeping the current filters.
    pub fn set_source(&mut self, source: Vec<T>) {
        debug!(len = source.len(), "list source replaced");
        self.source = source;
    }

    pub fn set_filter(&mut self, field: FilterField) {
        debug!(key = ?field.key(), "filter set");
        self.filter.set(field);
    }

    pub fn clear_filter(&mut self, key: FilterKey) {
        self.filter.clear(key);
    }

    pub fn clear_all(&mut self) {
        self.filter = FilterState::default();
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn source(&self) -> &[T] {
        &self.source
    }

    pub fn visible(&self) -> Vec<&T> {
        self.source
            .iter()
            .filter(|record| self.filter.matches(*record))
            .collect()
    }

    pub fn visible_count(&self) -> usize {
        self.source
            .iter()
            .filter(|record| self.filter.matches(*record))
            .count()
    }
}
