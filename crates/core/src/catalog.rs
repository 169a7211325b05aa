//! Event catalog with category, track and free-text filtering.
//!
//! The catalog is static festival data shipped with the client. Filtering
//! follows the events page: a category tab, a cultural sub-track that only
//! applies while the Cultural tab is selected, and a search box matched
//! against title and description.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{CulturalTrack, Event, EventCategory, EventId};

/// Errors that can occur when loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate event id in catalog: {0}")]
    DuplicateId(EventId),
}

/// Filter applied to the catalog. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// `None` is the "All" tab.
    pub category: Option<EventCategory>,
    /// Ignored unless `category` is `Cultural`.
    pub track: Option<CulturalTrack>,
    /// Case-insensitive substring of title or description. Surrounding
    /// whitespace is ignored.
    pub query: String,
}

impl EventFilter {
    /// Whether `event` passes this filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let category_ok = self.category.is_none_or(|c| c == event.category);

        let track_ok = match (self.category, self.track) {
            (Some(EventCategory::Cultural), Some(track)) => event.track == Some(track),
            _ => true,
        };

        let query = self.query.trim().to_lowercase();
        let query_ok = query.is_empty()
            || event.title.to_lowercase().contains(&query)
            || event.description.to_lowercase().contains(&query);

        category_ok && track_ok && query_ok
    }
}

/// Filtered events split by category.
#[derive(Debug, Default)]
pub struct CatalogGroups<'a> {
    pub technical: Vec<&'a Event>,
    pub gaming: Vec<&'a Event>,
    pub cultural: Vec<&'a Event>,
}

impl CatalogGroups<'_> {
    /// Total number of events across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.technical.len() + self.gaming.len() + self.cultural.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The festival's event catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: Vec<Event>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<Event>),
    Wrapped { events: Vec<Event> },
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two events share an id.
    pub fn new(events: Vec<Event>) -> Result<Self, CatalogError> {
        for (i, event) in events.iter().enumerate() {
            if events.iter().skip(i + 1).any(|other| other.id == event.id) {
                return Err(CatalogError::DuplicateId(event.id.clone()));
            }
        }
        Ok(Self { events })
    }

    /// Parse a catalog from JSON: either a bare array of events or
    /// `{ "events": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or ids repeat.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let events = match serde_json::from_str::<CatalogFile>(json)? {
            CatalogFile::List(events) | CatalogFile::Wrapped { events } => events,
        };
        Self::new(events)
    }

    /// All events in catalog order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Look up an event by id.
    #[must_use]
    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|e| &e.id == id)
    }

    /// Events passing `filter`, in catalog order.
    #[must_use]
    pub fn filter<'a>(&'a self, filter: &EventFilter) -> Vec<&'a Event> {
        self.events.iter().filter(|e| filter.matches(e)).collect()
    }

    /// Events passing `filter`, split by category.
    #[must_use]
    pub fn grouped<'a>(&'a self, filter: &EventFilter) -> CatalogGroups<'a> {
        let mut groups = CatalogGroups::default();
        for event in self.filter(filter) {
            match event.category {
                EventCategory::Technical => groups.technical.push(event),
                EventCategory::Gaming => groups.gaming.push(event),
                EventCategory::Cultural => groups.cultural.push(event),
            }
        }
        groups
    }
}
