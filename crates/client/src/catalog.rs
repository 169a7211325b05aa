//! Event catalog loading.

use std::path::{Path, PathBuf};

use thiserror::Error;

use varnothsava_core::{Catalog, CatalogError};

/// The catalog shipped with the client.
const BUNDLED_CATALOG: &str = include_str!("../data/events.json");

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

/// Load the catalog from `path`, or the bundled one when `path` is `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, CatalogLoadError> {
    let Some(path) = path else {
        return Ok(Catalog::from_json(BUNDLED_CATALOG)?);
    };

    let json = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = Catalog::from_json(&json)?;
    tracing::debug!(path = %path.display(), events = catalog.events().len(), "catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use varnothsava_core::{CulturalTrack, EventCategory, EventFilter, EventId};

    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let catalog = load_catalog(None).unwrap();
        let groups = catalog.grouped(&EventFilter::default());
        assert!(!groups.technical.is_empty());
        assert!(!groups.gaming.is_empty());
        assert!(!groups.cultural.is_empty());
        assert_eq!(groups.len(), catalog.events().len());

        for event in catalog.events() {
            assert_eq!(
                event.track.is_some(),
                event.category == EventCategory::Cultural,
                "{}",
                event.id
            );
        }
    }

    #[test]
    fn test_bundled_catalog_tracks() {
        let catalog = load_catalog(None).unwrap();
        let hobby = catalog.filter(&EventFilter {
            category: Some(EventCategory::Cultural),
            track: Some(CulturalTrack::HobbyClub),
            query: String::new(),
        });
        assert!(hobby.iter().all(|e| e.track == Some(CulturalTrack::HobbyClub)));
        assert!(catalog.get(&EventId::new("cult-photography")).is_some());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"[{"id":"quiz","title":"Quiz","type":"Technical","fee":50}]"#,
        )
        .unwrap();

        let catalog = load_catalog(Some(&path)).unwrap();
        assert_eq!(catalog.events().len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_catalog(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(CatalogLoadError::Io { .. })));
    }
}
