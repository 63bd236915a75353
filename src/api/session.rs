//! REST API endpoints for session-scoped companion actions

use std::sync::Arc;

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::model::{Analysis, SortOrder, Thread, ThreadSessionEntry, TimeWindow};
use crate::service::llm::{OpenAiGenerator, TextGenerator};
use crate::service::CompanionService;

/// Request body for creating a session
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// OpenAI API key for this session. Analyses are refused until one is
    /// provided, either here or via the key endpoint.
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    /// Whether the session can run analyses already
    pub generator_ready: bool,
}

/// Request body for supplying the key after session creation
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetKeyRequest {
    pub openai_api_key: String,
}

/// Request body for fetching a thread listing
#[derive(Debug, Deserialize, ToSchema)]
pub struct FetchRequest {
    /// Sort order; unrecognized values fall back to "top"
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Time window, only meaningful when sort_order is "top"
    #[serde(default)]
    pub time_window: TimeWindow,
    pub limit: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FetchResponse {
    pub threads: Vec<Thread>,
}

/// A thread together with its per-session state
#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadStateView {
    #[serde(flatten)]
    pub thread: Thread,
    pub analyzed: bool,
    pub visible: bool,
    pub analysis: Option<Analysis>,
    pub rebuttal: Option<String>,
}

impl ThreadStateView {
    fn new(thread: Thread, entry: ThreadSessionEntry) -> Self {
        Self {
            thread,
            analyzed: entry.analyzed,
            visible: entry.visible,
            analysis: entry.analysis,
            rebuttal: entry.rebuttal,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadsResponse {
    pub threads: Vec<ThreadStateView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleResponse {
    pub thread_id: String,
    pub analyzed: bool,
    pub visible: bool,
    pub analysis: Option<Analysis>,
    pub rebuttal: Option<String>,
    /// True when this toggle ran the analysis pipeline
    pub ran_pipeline: bool,
    /// Set when the analysis fell back to the sentinel structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishResponse {
    pub success: bool,
    pub message: String,
}

fn build_generator(api_key: &str) -> Arc<dyn TextGenerator> {
    Arc::new(OpenAiGenerator::new(api_key))
}

/// Create a new session
#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse)
    ),
    tag = "sessions"
)]
#[post("/v1/sessions")]
pub async fn create_session(
    service: web::Data<CompanionService>,
    body: web::Json<CreateSessionRequest>,
) -> HttpResponse {
    let generator = body.openai_api_key.as_deref().map(build_generator);
    let generator_ready = generator.is_some();

    let session_id = service.create_session(generator);

    HttpResponse::Created().json(CreateSessionResponse {
        session_id,
        generator_ready,
    })
}

/// Supply or replace the session's OpenAI API key
#[utoipa::path(
    put,
    path = "/v1/sessions/{session_id}/key",
    request_body = SetKeyRequest,
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 204, description = "Key configured"),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
#[put("/v1/sessions/{session_id}/key")]
pub async fn set_key(
    service: web::Data<CompanionService>,
    path: web::Path<Uuid>,
    body: web::Json<SetKeyRequest>,
) -> Result<HttpResponse, ApiError> {
    let session_id = path.into_inner();
    let generator = build_generator(&body.openai_api_key);

    service.set_generator(&session_id, generator).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Fetch a thread listing for the session
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/fetch",
    request_body = FetchRequest,
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Threads fetched", body = FetchResponse),
        (status = 404, description = "Session not found"),
        (status = 429, description = "Fetch cooldown active"),
        (status = 502, description = "Forum unavailable")
    ),
    tag = "sessions"
)]
#[post("/v1/sessions/{session_id}/fetch")]
pub async fn fetch_threads(
    service: web::Data<CompanionService>,
    path: web::Path<Uuid>,
    body: web::Json<FetchRequest>,
) -> Result<HttpResponse, ApiError> {
    let session_id = path.into_inner();

    let threads = service
        .fetch_threads(&session_id, body.sort_order, body.time_window, body.limit)
        .await?;

    Ok(HttpResponse::Ok().json(FetchResponse { threads }))
}

/// Current threads with their session state, for re-render
#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}/threads",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session thread state", body = ThreadsResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
#[get("/v1/sessions/{session_id}/threads")]
pub async fn list_threads(
    service: web::Data<CompanionService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let session_id = path.into_inner();

    let threads = service
        .session_threads(&session_id)
        .await?
        .into_iter()
        .map(|(thread, entry)| ThreadStateView::new(thread, entry))
        .collect();

    Ok(HttpResponse::Ok().json(ThreadsResponse { threads }))
}

/// Toggle a thread: analyze on first toggle, then flip visibility
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/threads/{thread_id}/toggle",
    params(
        ("session_id" = Uuid, Path, description = "Session ID"),
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread toggled", body = ToggleResponse),
        (status = 404, description = "Session or thread not found"),
        (status = 409, description = "No API key configured"),
        (status = 502, description = "Text generation failed")
    ),
    tag = "sessions"
)]
#[post("/v1/sessions/{session_id}/threads/{thread_id}/toggle")]
pub async fn toggle_thread(
    service: web::Data<CompanionService>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, ApiError> {
    let (session_id, thread_id) = path.into_inner();

    let outcome = service.toggle_thread(&session_id, &thread_id).await?;

    Ok(HttpResponse::Ok().json(ToggleResponse {
        thread_id,
        analyzed: outcome.entry.analyzed,
        visible: outcome.entry.visible,
        analysis: outcome.entry.analysis,
        rebuttal: outcome.entry.rebuttal,
        ran_pipeline: outcome.ran_pipeline,
        warning: outcome.parse_warning.map(|w| w.to_string()),
    }))
}

/// Publish a thread's rebuttal back to the forum
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/threads/{thread_id}/publish",
    params(
        ("session_id" = Uuid, Path, description = "Session ID"),
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Publish attempted; success flag in body", body = PublishResponse),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Thread not analyzed yet")
    ),
    tag = "sessions"
)]
#[post("/v1/sessions/{session_id}/threads/{thread_id}/publish")]
pub async fn publish_rebuttal(
    service: web::Data<CompanionService>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, ApiError> {
    let (session_id, thread_id) = path.into_inner();

    let outcome = service.publish_rebuttal(&session_id, &thread_id).await?;

    Ok(HttpResponse::Ok().json(PublishResponse {
        success: outcome.success,
        message: outcome.message,
    }))
}

/// OpenAPI documentation for the companion API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_session,
        set_key,
        fetch_threads,
        list_threads,
        toggle_thread,
        publish_rebuttal,
        crate::api::health::liveness,
        crate::api::health::readiness,
    ),
    components(schemas(
        CreateSessionRequest,
        CreateSessionResponse,
        SetKeyRequest,
        FetchRequest,
        FetchResponse,
        ThreadStateView,
        ThreadsResponse,
        ToggleResponse,
        PublishResponse,
        Thread,
        Analysis,
        ThreadSessionEntry,
        SortOrder,
        TimeWindow,
    )),
    tags(
        (name = "sessions", description = "Session-scoped fetch/analyze/publish actions"),
        (name = "health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

/// Configure session routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_session)
        .service(set_key)
        .service(fetch_threads)
        .service(list_threads)
        .service(toggle_thread)
        .service(publish_rebuttal);
}
