//! HTTP routes: `/chat`, `/feedback`, `/health`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use sitechat_core::{FeedbackRecord, Services, validate_message};
use sitechat_shared::{ErrorKind, SiteChatError};

/// Application state shared across handlers.
pub struct AppState {
    pub services: Services,
    /// Pass raw upstream error text through to clients.
    pub expose_upstream_errors: bool,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(services: Services, expose_upstream_errors: bool) -> Self {
        Self {
            services,
            expose_upstream_errors,
            start_time: Instant::now(),
        }
    }
}

type AppStateArc = Arc<AppState>;

/// All routes, without middleware layers.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/feedback", post(feedback))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    feedback: Option<String>,
    response: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReplyBody {
    response: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

/// A failure rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn from_error(err: SiteChatError, expose_upstream_errors: bool) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream | ErrorKind::Fetch | ErrorKind::Generation => {
                StatusCode::BAD_GATEWAY
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if kind == ErrorKind::Validation {
            warn!(error = %err, "rejected request");
        } else {
            error!(error = %err, status = status.as_u16(), "request failed");
        }

        let message = if expose_upstream_errors {
            err.to_string()
        } else {
            err.public_message()
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

fn body_rejection(rejection: JsonRejection) -> SiteChatError {
    SiteChatError::validation(format!("invalid request body: {}", rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

async fn chat(
    State(state): State<AppStateArc>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ReplyBody>, ApiError> {
    let request_id = Uuid::now_v7();
    let expose = state.expose_upstream_errors;

    async move {
        let Json(req) = payload.map_err(|r| ApiError::from_error(body_rejection(r), expose))?;
        let message = validate_message(req.message.as_deref())
            .map_err(|e| ApiError::from_error(e, expose))?;

        let answer = state
            .services
            .chat
            .answer(message)
            .await
            .map_err(|e| ApiError::from_error(e, expose))?;

        Ok(Json(ReplyBody {
            response: answer.into_text(),
        }))
    }
    .instrument(info_span!("chat", %request_id))
    .await
}

async fn feedback(
    State(state): State<AppStateArc>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<ReplyBody>, ApiError> {
    let request_id = Uuid::now_v7();
    let expose = state.expose_upstream_errors;

    async move {
        let Json(req) = payload.map_err(|r| ApiError::from_error(body_rejection(r), expose))?;
        let record = FeedbackRecord::parse(req.feedback.as_deref(), req.response.as_deref())
            .map_err(|e| ApiError::from_error(e, expose))?;

        let outcome = state
            .services
            .feedback
            .handle(&record)
            .await
            .map_err(|e| ApiError::from_error(e, expose))?;

        Ok(Json(ReplyBody {
            response: outcome.text().to_string(),
        }))
    }
    .instrument(info_span!("feedback", %request_id))
    .await
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use sitechat_core::ACKNOWLEDGEMENT;
    use sitechat_shared::AppConfig;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn app(uri: &str, expose: bool) -> Router {
        let mut config = AppConfig::default();
        config.catalog.url = format!("{uri}/pages");
        config.generation.endpoint = format!("{uri}/generate");
        let services = Services::from_config(&config).expect("services");
        routes(AppState::new(services, expose))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn chat_requires_message() {
        let server = MockServer::start().await;

        let (status, body) = post_json(app(&server.uri(), true), "/chat", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("message is required"));

        let (status, _) =
            post_json(app(&server.uri(), true), "/chat", r#"{"message": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_rejects_malformed_body() {
        let server = MockServer::start().await;

        let (status, body) = post_json(app(&server.uri(), true), "/chat", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid request body"));
    }

    #[tokio::test]
    async fn chat_keyword_hit_skips_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let (status, body) = post_json(
            app(&server.uri(), true),
            "/chat",
            &json!({"message": "Hello!"}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Hi there! How can I help you?");
    }

    #[tokio::test]
    async fn chat_catalog_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pages"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let request = json!({"message": "What are your opening times?"}).to_string();

        let (status, body) = post_json(app(&server.uri(), true), "/chat", &request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("503"));

        let (status, body) = post_json(app(&server.uri(), false), "/chat", &request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "site catalog is currently unavailable");
    }

    #[tokio::test]
    async fn chat_full_pipeline() {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path("/pages"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!(r#"{{"home": "{uri}/home"}}"#)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/home"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<h1>Open 9 to 5</h1><p>Mon-Fri.</p>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"generated_text": "We open at 9."}]"#),
            )
            .mount(&server)
            .await;

        let (status, body) = post_json(
            app(&uri, true),
            "/chat",
            &json!({"message": "When do you open?"}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "We open at 9.");
    }

    #[tokio::test]
    async fn feedback_thumbs_up() {
        let server = MockServer::start().await;

        let (status, body) = post_json(
            app(&server.uri(), true),
            "/feedback",
            &json!({"feedback": "thumbs_up", "response": "X"}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], ACKNOWLEDGEMENT);
    }

    #[tokio::test]
    async fn feedback_validation() {
        let server = MockServer::start().await;

        let (status, body) = post_json(
            app(&server.uri(), true),
            "/feedback",
            &json!({"feedback": "maybe", "response": "X"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("'thumbs_up' or 'thumbs_down'"));

        let (status, body) = post_json(
            app(&server.uri(), true),
            "/feedback",
            &json!({"feedback": "thumbs_down"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("feedback and response are required"));
    }

    #[tokio::test]
    async fn feedback_refinement_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (status, body) = post_json(
            app(&server.uri(), true),
            "/feedback",
            &json!({"feedback": "thumbs_down", "response": "X"}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("error refining response"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let server = MockServer::start().await;

        let response = app(&server.uri(), true)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
