use crate::config::AppConfig;
use crate::index::CaseIndex;
use crate::render::Fit;
use crate::types::Region;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Point, Rect};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

// Wrapper for RTree indexing
pub struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub regions: Vec<Region>,
    pub tree: RTree<RegionEnvelope>,
    pub index: CaseIndex,
    pub fit: Fit,
}

/// Pointer position in map-viewport coordinates.
#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
}

/// The region under the pointer and its latest report; zero counts and no
/// date when the region never reported.
#[derive(Serialize)]
pub struct QueryResponse {
    fips: u32,
    name: String,
    cases: u32,
    deaths: u32,
    date: Option<NaiveDate>,
}

pub async fn start_server(config: AppConfig, regions: Vec<Region>, index: CaseIndex) -> Result<()> {
    println!("Building spatial index for {} regions...", regions.len());
    let tree_items: Vec<RegionEnvelope> = regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let rect = region.geometry.bounding_rect().unwrap_or(Rect::new(
                geo::Coord { x: 0.0, y: 0.0 },
                geo::Coord { x: 0.0, y: 0.0 },
            ));
            RegionEnvelope {
                index: i,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            }
        })
        .collect();

    let tree = RTree::bulk_load(tree_items);
    let fit = Fit::compute(&regions, config.map.width, config.map.height);

    let state = Arc::new(AppState { regions, tree, index, fit });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    println!("Starting server on http://{}", addr);

    let app = Router::new()
        .route("/api/query", get(query_handler))
        .nest_service("/", ServeDir::new(&config.output.dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    Json(resolve(&state, params.x, params.y))
}

/// Point-in-polygon resolution of a viewport position: the server-side
/// analog of the map tooltip.
fn resolve(state: &AppState, px: f64, py: f64) -> Option<QueryResponse> {
    let (x, y) = state.fit.invert(px, py);
    let point = Point::new(x, y);
    let envelope = AABB::from_point([x, y]);

    for candidate in state.tree.locate_in_envelope_intersecting(&envelope) {
        let Some(region) = state.regions.get(candidate.index) else {
            continue;
        };
        if !region.geometry.contains(&point) {
            continue;
        }

        let report = state.index.latest(region.id);
        let name = report
            .map(|r| r.display_name().to_string())
            .or_else(|| region.name.clone())
            .unwrap_or_else(|| region.id.to_string());

        return Some(QueryResponse {
            fips: region.id,
            name,
            cases: report.map(|r| r.cases).unwrap_or(0),
            deaths: report.map(|r| r.deaths).unwrap_or(0),
            date: report.map(|r| r.date),
        });
    }

    None
}
