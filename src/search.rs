use crate::boundaries::{BoundaryCollection, Bounds};
use crate::geocode::Geocoder;
use crate::index::{normalize, BoundaryIndex};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SearchOutcome {
    Empty,
    Boundary {
        index: usize,
        name: String,
        bounds: Bounds,
        exact: bool,
    },
    Location { lat: f64, lon: f64, zoom: u8 },
    // geocoder failed or found nothing
    NotFound,
}

/// Exact then substring match against boundary names, without touching the network.
pub fn match_boundary(
    query: &str,
    index: &BoundaryIndex,
    boundaries: Option<&BoundaryCollection>,
) -> Option<SearchOutcome> {
    let normalized = normalize(query);
    if normalized.is_empty() {
        return Some(SearchOutcome::Empty);
    }

    let (found, exact) = match index.exact(&normalized) {
        Some(i) => (i, true),
        None => (index.fuzzy(&normalized)?, false),
    };
    let feature = boundaries?.get(found)?;
    Some(SearchOutcome::Boundary {
        index: found,
        name: feature.name.clone(),
        bounds: feature.bounds,
        exact,
    })
}

/// Geocode fallback. Failures are logged and reported as `NotFound`.
pub async fn geocode_fallback(query: &str, geocoder: &dyn Geocoder, zoom: u8) -> SearchOutcome {
    match geocoder.geocode(query.trim()).await {
        Ok(Some(point)) => SearchOutcome::Location {
            lat: point.lat,
            lon: point.lon,
            zoom,
        },
        Ok(None) => {
            debug!("No geocode result for {:?}", query);
            SearchOutcome::NotFound
        }
        Err(e) => {
            warn!("Geocode lookup for {:?} failed: {e}", query);
            SearchOutcome::NotFound
        }
    }
}

pub async fn resolve(
    query: &str,
    index: &BoundaryIndex,
    boundaries: Option<&BoundaryCollection>,
    geocoder: &dyn Geocoder,
    zoom: u8,
) -> SearchOutcome {
    match match_boundary(query, index, boundaries) {
        Some(outcome) => outcome,
        None => geocode_fallback(query, geocoder, zoom).await,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::boundaries::tests::sample;
    use crate::geocode::{GeoPoint, GeocodeError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Canned geocoder that records the queries it receives.
    pub(crate) struct StubGeocoder {
        pub(crate) answer: Option<GeoPoint>,
        pub(crate) fail: bool,
        pub(crate) calls: AtomicUsize,
        pub(crate) queries: Mutex<Vec<String>>,
    }

    impl StubGeocoder {
        pub(crate) fn answering(lat: f64, lon: f64) -> Self {
            Self {
                answer: Some(GeoPoint { lat, lon }),
                fail: false,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                answer: None,
                fail: true,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(GeocodeError::Parse("stub failure".into()));
            }
            Ok(self.answer)
        }
    }

    #[tokio::test]
    async fn exact_name_match_skips_geocoder() {
        let collection = sample();
        let index = BoundaryIndex::build(Some(&collection));
        let geocoder = StubGeocoder::answering(0.0, 0.0);

        let outcome = resolve("Kensington Market", &index, Some(&collection), &geocoder, 16).await;
        match outcome {
            SearchOutcome::Boundary { index, exact, ref name, .. } => {
                assert_eq!(index, 0);
                assert!(exact);
                assert_eq!(name, "Kensington Market");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn accent_insensitive_substring_match() {
        let collection = sample();
        let index = BoundaryIndex::build(Some(&collection));
        let geocoder = StubGeocoder::answering(0.0, 0.0);

        let outcome = resolve("  cote-des ", &index, Some(&collection), &geocoder, 16).await;
        assert!(matches!(
            outcome,
            SearchOutcome::Boundary { index: 1, exact: false, .. }
        ));
        assert_eq!(geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_geocoder() {
        let collection = sample();
        let index = BoundaryIndex::build(Some(&collection));
        let geocoder = StubGeocoder::answering(43.65, -79.38);

        let outcome = resolve("M5V 2T6", &index, Some(&collection), &geocoder, 16).await;
        assert_eq!(
            outcome,
            SearchOutcome::Location { lat: 43.65, lon: -79.38, zoom: 16 }
        );
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(geocoder.queries.lock().unwrap()[0], "M5V 2T6");
    }

    #[tokio::test]
    async fn geocoder_failure_is_not_found() {
        let index = BoundaryIndex::build(None);
        let geocoder = StubGeocoder::failing();
        let outcome = resolve("somewhere", &index, None, &geocoder, 16).await;
        assert_eq!(outcome, SearchOutcome::NotFound);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn blank_query_is_a_no_op() {
        let index = BoundaryIndex::build(None);
        let geocoder = StubGeocoder::answering(1.0, 1.0);
        assert_eq!(resolve("   ", &index, None, &geocoder, 16).await, SearchOutcome::Empty);
        assert_eq!(geocoder.calls(), 0);
    }
}
