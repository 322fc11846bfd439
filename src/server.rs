use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::error::Error;
use std::sync::PoisonError;
use tokio::net::TcpListener;

use crate::logging::{self, DataSource};
use crate::query::{self, QueryParams, QueryResponse};
use crate::store::SharedStore;

/*

Routes

  /                                         -> 2020-01-01 00:00
  /{year}                                   -> {year}-01-01 00:00
  /{year}/{month}                           ...
  /{year}/{month}/{day}/{hour}/{minute}     -> exact interval
  /health                                   -> store coverage and fill counts

Anything else answers 400 "No API endpoint".

*/

impl IntoResponse for QueryResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/{year}", get(by_path))
        .route("/{year}/{month}", get(by_path))
        .route("/{year}/{month}/{day}", get(by_path))
        .route("/{year}/{month}/{day}/{hour}", get(by_path))
        .route("/{year}/{month}/{day}/{hour}/{minute}", get(by_path))
        .fallback(fallback)
        .with_state(store)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(store: SharedStore, addr: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    logging::info(DataSource::Http, None, &format!("Listening on {}", addr));
    serve_on(listener, store).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, store: SharedStore) -> Result<(), Box<dyn Error + Send + Sync>> {
    axum::serve(listener, router(store).into_make_service()).await?;
    Ok(())
}

async fn root(State(store): State<SharedStore>) -> QueryResponse {
    answer(&store, QueryParams::default())
}

async fn by_path(
    State(store): State<SharedStore>,
    Path(params): Path<QueryParams>,
) -> QueryResponse {
    answer(&store, params)
}

fn answer(store: &SharedStore, params: QueryParams) -> QueryResponse {
    let response = query::respond(store, &params);
    if response.status != 200 {
        logging::debug(
            DataSource::Http,
            None,
            &format!("{:?} -> {} {}", params, response.status, response.body),
        );
    }
    response
}

async fn health(State(store): State<SharedStore>) -> Response {
    (StatusCode::OK, Json(health_body(&store))).into_response()
}

fn health_body(store: &SharedStore) -> serde_json::Value {
    let store = store.read().unwrap_or_else(PoisonError::into_inner);
    json!({
        "epoch": store.epoch(),
        "end": store.slot_start(store.len() as i64),
        "slots": store.len(),
        "capacity": store.capacity(),
        "filled": store.filled(),
    })
}

async fn fallback() -> QueryResponse {
    query::no_endpoint()
}
