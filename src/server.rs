use crate::config::AppConfig;
use crate::dashboard::{Dashboard, RenderFrame, Tab};
use crate::filter::FilterCriteria;
use crate::geocode::Geocoder;
use crate::search::{geocode_fallback, SearchOutcome};
use crate::types::records_to_geojson;
use anyhow::Result;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub dashboard: Mutex<Dashboard>,
    pub geocoder: Arc<dyn Geocoder>,
}

#[derive(Deserialize)]
pub struct SelectParams {
    index: usize,
}

#[derive(Deserialize)]
pub struct TabParams {
    tab: Tab,
}

#[derive(Deserialize)]
pub struct SearchParams {
    query: String,
}

pub fn router(state: Arc<AppState>, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/api/frame", get(frame_handler))
        .route("/api/boundaries", get(boundaries_handler))
        .route("/api/records", get(records_handler))
        .route("/api/filters/draft", put(draft_handler))
        .route("/api/filters/apply", post(apply_handler))
        .route("/api/filters/clear", post(clear_handler))
        .route("/api/selection", post(select_handler))
        .route("/api/tab", post(tab_handler))
        .route("/api/search", post(search_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(
    config: AppConfig,
    dashboard: Dashboard,
    geocoder: Arc<dyn Geocoder>,
) -> Result<()> {
    let state = Arc::new(AppState {
        dashboard: Mutex::new(dashboard),
        geocoder,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(state, &config.server.static_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn frame_handler(State(state): State<Arc<AppState>>) -> Json<RenderFrame> {
    let mut dashboard = state.dashboard.lock().await;
    Json(dashboard.frame(&Local::now()))
}

async fn boundaries_handler(State(state): State<Arc<AppState>>) -> Json<geojson::FeatureCollection> {
    let dashboard = state.dashboard.lock().await;
    let features = dashboard
        .boundary_views()
        .into_iter()
        .map(|view| {
            let mut properties = serde_json::Map::new();
            properties.insert("index".into(), view.index.into());
            properties.insert("name".into(), view.name.into());
            properties.insert("selected".into(), view.selected.into());
            geojson::Feature {
                bbox: None,
                geometry: Some(view.geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    Json(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

async fn records_handler(State(state): State<Arc<AppState>>) -> Json<geojson::FeatureCollection> {
    let mut dashboard = state.dashboard.lock().await;
    Json(records_to_geojson(dashboard.visible(&Local::now())))
}

async fn draft_handler(
    State(state): State<Arc<AppState>>,
    Json(criteria): Json<FilterCriteria>,
) -> Json<RenderFrame> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.edit_draft(criteria);
    Json(dashboard.frame(&Local::now()))
}

async fn apply_handler(State(state): State<Arc<AppState>>) -> Json<RenderFrame> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.apply_filters();
    Json(dashboard.frame(&Local::now()))
}

async fn clear_handler(State(state): State<Arc<AppState>>) -> Json<RenderFrame> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.clear_filters();
    Json(dashboard.frame(&Local::now()))
}

async fn select_handler(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SelectParams>,
) -> Json<RenderFrame> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.select_boundary(params.index);
    Json(dashboard.frame(&Local::now()))
}

async fn tab_handler(
    State(state): State<Arc<AppState>>,
    Json(params): Json<TabParams>,
) -> Json<RenderFrame> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.set_tab(params.tab);
    Json(dashboard.frame(&Local::now()))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SearchParams>,
) -> Json<SearchOutcome> {
    let (local, zoom) = {
        let dashboard = state.dashboard.lock().await;
        (dashboard.match_query(&params.query), dashboard.zoom())
    };

    // The lock is not held while the geocoder is in flight.
    let outcome = match local {
        Some(outcome) => outcome,
        None => geocode_fallback(&params.query, state.geocoder.as_ref(), zoom).await,
    };

    state.dashboard.lock().await.apply_search(&outcome);
    Json(outcome)
}
