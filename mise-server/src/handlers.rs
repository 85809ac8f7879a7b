use crate::error::{ServerError, ServerResult};
use crate::models::{
    rows_of, ClusterRequest, JointReduceRequest, JointReduceResponse, ReduceRequest, ReduceResponse,
    SearchRequest, SearchResponse, SpaceCoordinates,
};
use crate::state::AppState;

use axum::{
    extract::{Path, State},
    Json,
};
use ndarray::Array1;
use tracing::{debug, info};
use mise_core::analytics::{
    cluster_report, joint_projection, variance_curve, ClusterReport, SweepOptions, VarianceCurve, DEFAULT_SWEEP,
};
use mise_core::{top_k, MiseResult, SpaceInfo};

/// Runs CPU-bound engine work off the async executor.
async fn run_blocking<T, F>(task: F) -> ServerResult<T>
where
    F: FnOnce() -> MiseResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServerError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(ServerError::from)
}

/// Handler for `GET /spaces`
/// Lists every loaded space with its dimensions and row count.
#[axum::debug_handler]
pub async fn list_spaces(State(state): State<AppState>) -> ServerResult<Json<Vec<SpaceInfo>>> {
    let spaces = state.store.describe();
    debug!(count = spaces.len(), "Returning space list");
    Ok(Json(spaces))
}

/// Handler for `POST /spaces/:name/search`
/// Returns the `k` items most cosine-similar to the query vector.
#[axum::debug_handler]
pub async fn search(
    State(state): State<AppState>,
    Path(space): Path<String>,
    Json(payload): Json<SearchRequest>,
) -> ServerResult<Json<SearchResponse>> {
    debug!(space = %space, k = payload.k, "Received search request");
    let store = state.store.clone();
    let name = space.clone();
    let query = Array1::from(payload.query_vector);
    let k = payload.k;

    let results = run_blocking(move || top_k(&store, &name, query.view(), k)).await?;
    debug!(space = %space, count = results.len(), "Search completed");
    Ok(Json(SearchResponse { space, results }))
}

/// Handler for `GET /spaces/:name/variance`
/// Returns the explained-variance ratio of every principal component.
#[axum::debug_handler]
pub async fn variance(
    State(state): State<AppState>,
    Path(space): Path<String>,
) -> ServerResult<Json<VarianceCurve>> {
    debug!(space = %space, "Received variance request");
    let store = state.store.clone();
    let curve = run_blocking(move || variance_curve(&store, &space)).await?;
    Ok(Json(curve))
}

/// Handler for `POST /spaces/:name/reduce`
/// Projects one space to `components` dimensions with PCA or t-SNE.
#[axum::debug_handler]
pub async fn reduce(
    State(state): State<AppState>,
    Path(space): Path<String>,
    Json(payload): Json<ReduceRequest>,
) -> ServerResult<Json<ReduceResponse>> {
    let reducer = payload.reducer()?;
    info!(space = %space, method = %reducer.method(), components = payload.components, "Received reduce request");

    let store = state.store.clone();
    let name = space.clone();
    let components = payload.components;
    let reduced = run_blocking(move || reducer.reduce(store.get(&name)?.matrix(), components)).await?;

    Ok(Json(ReduceResponse {
        space,
        method: reducer.method().to_string(),
        coordinates: rows_of(&reduced.coordinates),
        explained_variance_ratio: reduced.explained_variance_ratio,
    }))
}

/// Handler for `POST /spaces/:name/cluster`
/// Runs k-means for the requested k, or the default sweep, and samples members per cluster.
#[axum::debug_handler]
pub async fn cluster(
    State(state): State<AppState>,
    Path(space): Path<String>,
    Json(payload): Json<ClusterRequest>,
) -> ServerResult<Json<Vec<ClusterReport>>> {
    let options = SweepOptions {
        ks: payload.k.map_or_else(|| DEFAULT_SWEEP.to_vec(), |k| vec![k]),
        seed: payload.seed(),
        max_iterations: payload.max_iterations(),
        sample_size: payload.sample_size(),
    };
    info!(space = %space, ks = ?options.ks, seed = options.seed, "Received cluster request");

    let store = state.store.clone();
    let reports = run_blocking(move || cluster_report(&store, &space, &options)).await?;
    Ok(Json(reports))
}

/// Handler for `POST /reduce/joint`
/// Reduces several spaces through one shared projection so their coordinates are comparable.
#[axum::debug_handler]
pub async fn joint_reduce(
    State(state): State<AppState>,
    Json(payload): Json<JointReduceRequest>,
) -> ServerResult<Json<JointReduceResponse>> {
    let reducer = payload.reducer()?;
    info!(spaces = ?payload.spaces, method = %reducer.method(), components = payload.components, "Received joint reduce request");

    let store = state.store.clone();
    let spaces = payload.spaces;
    let components = payload.components;
    let projected = run_blocking(move || {
        let names: Vec<&str> = spaces.iter().map(String::as_str).collect();
        joint_projection(&store, &names, &reducer, components)
    })
    .await?;

    Ok(Json(JointReduceResponse {
        method: reducer.method().to_string(),
        spaces: projected
            .into_iter()
            .map(|(space, coordinates)| SpaceCoordinates { space, coordinates: rows_of(&coordinates) })
            .collect(),
    }))
}
