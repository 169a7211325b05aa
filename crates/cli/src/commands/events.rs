//! Event catalog listing.

#![allow(clippy::print_stdout)]

use std::path::Path;

use varnothsava_client::catalog::{CatalogLoadError, load_catalog};
use varnothsava_core::{Catalog, CatalogGroups, Event, EventFilter};

/// Print the catalog grouped by category.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn list(path: Option<&Path>, filter: &EventFilter) -> Result<(), CatalogLoadError> {
    let catalog = load_catalog(path)?;
    print_groups(&catalog, filter);
    Ok(())
}

/// Print the events matching `filter`, one section per category.
pub fn print_groups(catalog: &Catalog, filter: &EventFilter) {
    let groups = catalog.grouped(filter);
    if groups.is_empty() {
        println!("No events match.");
        return;
    }

    let CatalogGroups {
        technical,
        gaming,
        cultural,
    } = groups;
    for (heading, events) in [
        ("Technical", technical),
        ("Gaming", gaming),
        ("Cultural", cultural),
    ] {
        if events.is_empty() {
            continue;
        }
        println!("{heading}");
        for event in events {
            println!("  {}", event_line(event));
        }
    }
}

fn event_line(event: &Event) -> String {
    let track = event
        .track
        .map(|track| format!(" [{track}]"))
        .unwrap_or_default();
    format!(
        "{:<26} {:<28} {:>9}{track}",
        event.id.as_str(),
        event.title,
        event.fee.to_string()
    )
}
