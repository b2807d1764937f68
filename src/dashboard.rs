use crate::boundaries::{BoundaryCollection, Bounds};
use crate::config::AppConfig;
use crate::filter::{filter_records, summarize, FilterContext, FilterCriteria, Summary};
use crate::geocode::Geocoder;
use crate::geometry::GeoEngine;
use crate::index::BoundaryIndex;
use crate::search::{geocode_fallback, match_boundary, SearchOutcome};
use crate::selection::Selection;
use crate::types::DefectRecord;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tab {
    #[default]
    Map,
    Filters,
    List,
}

/// Viewport command for the map widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Focus {
    FitBounds { index: usize, bounds: Bounds },
    Recenter { lat: f64, lon: f64, zoom: u8 },
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundaryView {
    pub index: usize,
    pub name: String,
    pub selected: bool,
    pub bounds: Bounds,
    pub geometry: geojson::Geometry,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub tab: Tab,
    pub draft: FilterCriteria,
    pub applied: FilterCriteria,
    pub selection: Selection,
    pub records: Vec<DefectRecord>,
    pub boundaries: Vec<BoundaryView>,
    pub summary: Summary,
    pub total_records: usize,
    pub focus: Option<Focus>,
}

struct VisibleCache {
    revision: u64,
    cutoff: Option<DateTime<Utc>>,
    records: Vec<DefectRecord>,
}

pub struct Dashboard {
    records: Vec<DefectRecord>,
    boundaries: Option<BoundaryCollection>,
    index: BoundaryIndex,
    require_within_boundaries: bool,
    zoom: u8,

    tab: Tab,
    draft: FilterCriteria,
    applied: FilterCriteria,
    selection: Selection,
    focus: Option<Focus>,

    // Bumped whenever `applied` or `selection` changes.
    revision: u64,
    cache: Option<VisibleCache>,
}

impl Dashboard {
    pub fn new(
        records: Vec<DefectRecord>,
        boundaries: Option<BoundaryCollection>,
        config: &AppConfig,
    ) -> Self {
        let index = BoundaryIndex::build(boundaries.as_ref());
        info!(
            "Dashboard ready: {} records, {} boundaries",
            records.len(),
            index.len()
        );
        Self {
            records,
            boundaries,
            index,
            require_within_boundaries: config.filter.require_within_boundaries,
            zoom: config.geocoder.zoom,
            tab: Tab::default(),
            draft: FilterCriteria::default(),
            applied: FilterCriteria::default(),
            selection: Selection::default(),
            focus: None,
            revision: 0,
            cache: None,
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn draft(&self) -> &FilterCriteria {
        &self.draft
    }

    pub fn applied(&self) -> &FilterCriteria {
        &self.applied
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn boundaries(&self) -> Option<&BoundaryCollection> {
        self.boundaries.as_ref()
    }

    pub fn index(&self) -> &BoundaryIndex {
        &self.index
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    // Draft edits never touch the visible set until apply.
    pub fn edit_draft(&mut self, criteria: FilterCriteria) {
        self.draft = criteria;
    }

    pub fn apply_filters(&mut self) {
        self.applied = self.draft.clone();
        self.bump();
    }

    pub fn clear_filters(&mut self) {
        self.draft = FilterCriteria::default();
        self.applied = FilterCriteria::default();
        self.bump();
    }

    // Unknown indices are ignored.
    pub fn select_boundary(&mut self, index: usize) {
        let Some(feature) = self.boundaries.as_ref().and_then(|b| b.get(index)) else {
            debug!("Ignoring selection of unknown boundary {index}");
            return;
        };
        let bounds = feature.bounds;

        self.selection = self.selection.select(index);
        if !self.selection.is_empty() {
            self.focus = Some(Focus::FitBounds { index, bounds });
        }
        self.bump();
    }

    /// Boundary-name part of a search. `None` means the geocoder must be asked.
    pub fn match_query(&self, query: &str) -> Option<SearchOutcome> {
        match_boundary(query, &self.index, self.boundaries.as_ref())
    }

    pub fn apply_search(&mut self, outcome: &SearchOutcome) {
        match outcome {
            SearchOutcome::Boundary { index, bounds, .. } => {
                self.selection = Selection::single(*index);
                self.focus = Some(Focus::FitBounds {
                    index: *index,
                    bounds: *bounds,
                });
                self.bump();
            }
            SearchOutcome::Location { lat, lon, zoom } => {
                self.selection = Selection::default();
                self.focus = Some(Focus::Recenter {
                    lat: *lat,
                    lon: *lon,
                    zoom: *zoom,
                });
                self.bump();
            }
            SearchOutcome::Empty | SearchOutcome::NotFound => {}
        }
    }

    pub async fn search(&mut self, query: &str, geocoder: &dyn Geocoder) -> SearchOutcome {
        let outcome = match self.match_query(query) {
            Some(outcome) => outcome,
            None => geocode_fallback(query, geocoder, self.zoom).await,
        };
        self.apply_search(&outcome);
        outcome
    }

    pub fn visible<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> &[DefectRecord] {
        let cutoff = self.applied.date_range.cutoff(now);
        let fresh = matches!(&self.cache, Some(c) if c.revision == self.revision && c.cutoff == cutoff);
        if !fresh {
            let ctx = FilterContext {
                boundaries: self.boundaries.as_ref(),
                selection: &self.selection,
                criteria: &self.applied,
                require_within_boundaries: self.require_within_boundaries,
                geometry: &GeoEngine,
                now: now.clone(),
            };
            let records = filter_records(&self.records, &ctx);
            self.cache = Some(VisibleCache {
                revision: self.revision,
                cutoff,
                records,
            });
        }
        match &self.cache {
            Some(cache) => &cache.records,
            None => &[],
        }
    }

    /// Snapshot for rendering. Takes the pending focus command, so it is handed out once.
    pub fn frame<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> RenderFrame {
        let records = self.visible(now).to_vec();
        let boundaries = self.boundary_views();
        RenderFrame {
            tab: self.tab,
            draft: self.draft.clone(),
            applied: self.applied.clone(),
            selection: self.selection.clone(),
            summary: summarize(&records),
            records,
            boundaries,
            total_records: self.records.len(),
            focus: self.focus.take(),
        }
    }

    pub fn boundary_views(&self) -> Vec<BoundaryView> {
        let Some(boundaries) = self.boundaries.as_ref() else {
            return Vec::new();
        };
        boundaries
            .iter()
            .enumerate()
            .map(|(index, feature)| BoundaryView {
                index,
                name: feature.name.clone(),
                selected: self.selection.contains(index),
                bounds: feature.bounds,
                geometry: geojson::Geometry::new(geojson::Value::from(&feature.geometry)),
            })
            .collect()
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
