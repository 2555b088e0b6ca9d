//! HTTP API server.
//!
//! Exposes the orchestrator's actions and the saved learning history as JSON.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{AgentInfo, AgentRequest, Orchestrator, ACTIONS};
use crate::store::{LearningSession, StoredRecommendation};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    preflight::check(Operation::Recommend, &settings)?;

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let orchestrator = Orchestrator::new(settings)?;

    let app = router(Arc::new(AppState { orchestrator }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Studyflow API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Agents", "GET  /agents");
    Output::kv("Dispatch", "POST /agent");
    Output::kv("Recommendations", "GET  /users/{user_id}/recommendations");
    Output::kv("Sessions", "GET  /users/{user_id}/sessions");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/agent", post(dispatch))
        .route("/users/{user_id}/recommendations", get(user_recommendations))
        .route("/users/{user_id}/sessions", get(user_sessions))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct AgentsResponse {
    agents: Vec<AgentInfo>,
    actions: Vec<&'static str>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Serialize)]
struct RecommendationsResponse {
    user_id: String,
    recommendations: Vec<StoredRecommendation>,
}

#[derive(Serialize)]
struct SessionsResponse {
    user_id: String,
    sessions: Vec<LearningSession>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(AgentsResponse {
        agents: state.orchestrator.agents_info(),
        actions: ACTIONS.to_vec(),
    })
}

async fn dispatch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let request = match AgentRequest::from_value(body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.orchestrator.handle(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, e),
        Err(e) => {
            warn!("Request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn user_recommendations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let Some(store) = state.orchestrator.store() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Storage is disabled");
    };

    match store.list_recommendations(&user_id, query.limit).await {
        Ok(recommendations) => Json(RecommendationsResponse {
            user_id,
            recommendations,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn user_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let Some(store) = state.orchestrator.store() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Storage is disabled");
    };

    match store.list_sessions(&user_id, query.limit).await {
        Ok(sessions) => Json(SessionsResponse { user_id, sessions }).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::store::{fixtures, MemoryStore, RecommendationStore};
    use crate::testing::FailingLlm;
    use axum::response::Response;
    use serde_json::{json, Value};

    fn state(store: Option<Arc<dyn RecommendationStore>>) -> State<Arc<AppState>> {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(FailingLlm),
            None,
            None,
            store,
        );
        State(Arc::new(AppState { orchestrator }))
    }

    async fn body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_invalid_request_is_bad_request() {
        let request = json!({"action": "generate_questions", "subject": "Fizik"});
        let response = dispatch(state(None), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body(response).await["error"].as_str().unwrap().contains("topic"));

        let response = dispatch(state(None), Json(json!({"action": "fly"}))).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_agent_failure_is_ok_with_error_body() {
        let request = json!({"action": "general_query", "query": "Limit nedir?"});
        let response = dispatch(state(None), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["agent"], "general_agent");
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_agents_listing() {
        let json = body(list_agents(state(None)).await.into_response()).await;
        assert_eq!(json["agents"].as_array().unwrap().len(), 5);
        assert_eq!(json["actions"].as_array().unwrap().len(), ACTIONS.len());
    }

    #[tokio::test]
    async fn test_user_history() {
        let store = Arc::new(MemoryStore::new());
        store.save_cycle("u1", &fixtures::outcome("Matematik")).await.unwrap();
        let state = state(Some(store));

        let response = user_recommendations(
            state.clone(),
            Path("u1".to_string()),
            Query(HistoryQuery { limit: 5 }),
        )
        .await
        .into_response();
        let json = body(response).await;
        assert_eq!(json["recommendations"][0]["title"], "Kesirler Soru Bankası");

        let limit = Query(HistoryQuery { limit: 5 });
        let response = user_sessions(state, Path("u1".to_string()), limit)
            .await
            .into_response();
        assert_eq!(body(response).await["sessions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_without_store() {
        let limit = Query(HistoryQuery { limit: 5 });
        let response = user_sessions(state(None), Path("u1".to_string()), limit)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
