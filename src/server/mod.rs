// SPDX-License-Identifier: MIT

//! JSON HTTP API over the evaluator, concept store and scenario runner

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::concept::{Concept, ConceptSource, ConceptSnapshot, ConceptStore};
use crate::config::{visibility_report, RuleConfig, VisibilityEntry};
use crate::error::{ConceptRulesError, ScenarioError};
use crate::expression::{self, EvaluationOutcome};
use crate::scenario::{ScenarioBook, ScenarioRunner, TestResult, TestStepResult};

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: ConceptStore,
    pub config: Arc<RuleConfig>,
    pub book: Arc<RwLock<ScenarioBook>>,
}

impl AppState {
    pub fn new(store: ConceptStore, config: RuleConfig, book: ScenarioBook) -> Self {
        Self {
            store,
            config: Arc::new(config),
            book: Arc::new(RwLock::new(book)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/concepts", get(list_concepts))
        .route("/api/concepts/{name}", put(set_concept))
        .route("/api/evaluate", post(evaluate))
        .route("/api/visibility", get(visibility))
        .route("/api/scenarios/run", post(run_scenario))
        .route("/api/scenarios/stream", post(stream_scenario))
        .route("/api/scenarios/results", delete(clear_results))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> crate::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Error body returned by failing handlers
struct ApiError(ConceptRulesError);

impl From<ConceptRulesError> for ApiError {
    fn from(err: ConceptRulesError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConceptRulesError::Scenario(
                ScenarioError::ScenarioNotFound(_) | ScenarioError::PathNotFound { .. },
            ) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_concepts(State(state): State<AppState>) -> Json<ConceptSnapshot> {
    Json(state.store.snapshot().await)
}

async fn set_concept(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(concept): Json<Concept>,
) -> Json<Concept> {
    log::debug!("Setting concept {}", name);
    state.store.set(&name, concept.clone()).await;
    Json(concept)
}

#[derive(Deserialize)]
struct EvaluateRequest {
    expression: String,
    /// Evaluate against these concepts instead of the live store
    #[serde(default)]
    concepts: Option<ConceptSnapshot>,
}

async fn evaluate(
    State(state): State<AppState>,
    Json(payload): Json<EvaluateRequest>,
) -> Json<EvaluationOutcome> {
    let outcome = match payload.concepts {
        Some(concepts) => expression::evaluate(&payload.expression, &concepts),
        None => expression::evaluate_live(&state.store, &payload.expression).await,
    };
    Json(outcome)
}

async fn visibility(State(state): State<AppState>) -> Json<Vec<VisibilityEntry>> {
    let concepts = state.store.snapshot().await;
    Json(visibility_report(&state.config, &concepts))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    scenario_id: String,
    path_id: String,
}

async fn run_scenario(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<TestResult>, ApiError> {
    let baseline = state.store.snapshot().await;
    let result = {
        let book = state.book.read().await;
        ScenarioRunner::new(&state.config).execute_path(
            &book,
            &payload.scenario_id,
            &payload.path_id,
            &baseline,
        )?
    };

    state.book.write().await.record_result(result.clone());
    Ok(Json(result))
}

async fn clear_results(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.book.write().await.clear_results();
    log::info!("Cleared {} recorded result(s)", cleared);
    Json(json!({ "cleared": cleared }))
}

/// Events sent while a path runs
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RunEvent {
    Step { step: TestStepResult },
    Completed { result: TestResult },
    Error { message: String },
}

async fn stream_scenario(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        log::info!(
            "Starting streaming run for scenario {} path {}",
            payload.scenario_id,
            payload.path_id
        );

        let baseline = state.store.snapshot().await;
        let outcome = {
            let book = state.book.read().await;
            ScenarioRunner::new(&state.config).execute_path_with(
                &book,
                &payload.scenario_id,
                &payload.path_id,
                &baseline,
                |step| {
                    let _ = tx.send(RunEvent::Step { step: step.clone() });
                },
            )
        };

        match outcome {
            Ok(result) => {
                state.book.write().await.record_result(result.clone());
                let _ = tx.send(RunEvent::Completed { result });
            }
            Err(e) => {
                log::warn!("Streaming run failed: {}", e);
                let _ = tx.send(RunEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| {
        Ok(Event::default()
            .json_data(event)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(1)))
}
