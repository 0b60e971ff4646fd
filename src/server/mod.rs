//! HTTP API server.
//!
//! Exposes the content pipeline and RAG chat over REST. Every response body
//! carries a `success` flag; failures add a user-facing `message`.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::FortellError;
use crate::llm::{OpenAIGenerator, TextGenerator};
use crate::orchestrator::Orchestrator;
use crate::rag::{RagChat, DEFAULT_SESSION};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    rag_chat: RagChat,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings.clone())?;

    let prompts = Prompts::load(None, None)?;
    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAIGenerator::new(&settings.rag.model, 120));
    let rag_chat = RagChat::new(generator, orchestrator.rag_store(), prompts, &settings.rag);

    let state = Arc::new(AppState {
        orchestrator,
        rag_chat,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/summarize", post(summarize))
        .route("/api/v1/build-video", post(build_video))
        .route("/api/v1/image", post(generate_image))
        .route("/api/v1/chat/rag", post(chat_rag))
        .route("/api/v1/chat/rag/clear", post(clear_history))
        .route("/api/v1/documents", get(list_documents))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Fortell API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Summarize", "POST /api/v1/summarize");
    Output::kv("Build Video", "POST /api/v1/build-video");
    Output::kv("Image", "POST /api/v1/image");
    Output::kv("RAG Chat", "POST /api/v1/chat/rag");
    Output::kv("Clear History", "POST /api/v1/chat/rag/clear");
    Output::kv("Documents", "GET  /api/v1/documents");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    url: String,
}

#[derive(Serialize)]
struct SummarizeResponse {
    success: bool,
    stories_dir: String,
    doc_id: String,
    summaries: Vec<String>,
    credit_balance: i64,
}

#[derive(Deserialize)]
struct BuildVideoRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    dir: String,
}

#[derive(Serialize)]
struct BuildVideoResponse {
    success: bool,
    video_url: String,
    credit_balance: i64,
}

#[derive(Deserialize)]
struct ImageRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    prompt: String,
}

#[derive(Serialize)]
struct ImageResponse {
    success: bool,
    message: String,
    result_image: String,
    credit_balance: i64,
}

#[derive(Deserialize)]
struct ChatRagRequest {
    #[serde(default)]
    question: String,
    #[serde(default)]
    doc_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ChatRagResponse {
    success: bool,
    message: String,
    total_results: usize,
}

#[derive(Deserialize)]
struct ClearHistoryRequest {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct DocumentsResponse {
    success: bool,
    documents: Vec<DocumentInfo>,
    total: usize,
}

#[derive(Serialize)]
struct DocumentInfo {
    doc_id: String,
    chunk_count: u32,
    source: String,
    created_at: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

fn error_response(error: FortellError) -> axum::response::Response {
    let status = match &error {
        FortellError::InvalidInput(_) | FortellError::InsufficientCredits { .. } => {
            StatusCode::BAD_REQUEST
        }
        FortellError::UserNotFound(_) | FortellError::BundleNotFound(_) => StatusCode::NOT_FOUND,
        FortellError::NotBundleOwner(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            success: false,
            message: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SummarizeRequest>,
) -> impl IntoResponse {
    if req.user_id.trim().is_empty() {
        return error_response(FortellError::InvalidInput("User ID is required".into()));
    }

    match state.orchestrator.summarize_url(&req.user_id, &req.url).await {
        Ok(result) => Json(SummarizeResponse {
            success: true,
            stories_dir: result.stories_dir,
            doc_id: result.doc_id,
            summaries: result.summaries,
            credit_balance: result.credit_balance,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn build_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BuildVideoRequest>,
) -> impl IntoResponse {
    if req.user_id.trim().is_empty() {
        return error_response(FortellError::InvalidInput("User ID is required".into()));
    }

    match state.orchestrator.build_video(&req.user_id, &req.dir).await {
        Ok(result) => Json(BuildVideoResponse {
            success: true,
            video_url: result.video_url,
            credit_balance: result.credit_balance,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn generate_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImageRequest>,
) -> impl IntoResponse {
    if req.user_id.trim().is_empty() {
        return error_response(FortellError::InvalidInput("User ID is required".into()));
    }

    match state
        .orchestrator
        .generate_image(&req.user_id, &req.prompt)
        .await
    {
        Ok(result) => Json(ImageResponse {
            success: true,
            message: "Image generated".to_string(),
            result_image: result.image,
            credit_balance: result.credit_balance,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn chat_rag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRagRequest>,
) -> impl IntoResponse {
    if req.question.trim().is_empty() {
        return error_response(FortellError::InvalidInput("Question is required".into()));
    }

    let session_id = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);

    match state
        .rag_chat
        .chat(session_id, &req.question, req.doc_id.as_deref())
        .await
    {
        Ok(answer) => Json(ChatRagResponse {
            success: true,
            message: answer.message,
            total_results: answer.total_results,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn clear_history(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClearHistoryRequest>,
) -> impl IntoResponse {
    match req.session_id.as_deref() {
        Some(session_id) => {
            state.rag_chat.clear_session(session_id);
        }
        None => state.rag_chat.clear_all_sessions(),
    }

    Json(serde_json::json!({
        "success": true,
        "message": "Chat history cleared successfully"
    }))
    .into_response()
}

async fn list_documents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.orchestrator.rag_store().list_documents().await {
        Ok(documents) => Json(DocumentsResponse {
            success: true,
            total: documents.len(),
            documents: documents
                .into_iter()
                .map(|d| DocumentInfo {
                    doc_id: d.doc_id,
                    chunk_count: d.chunk_count,
                    source: d.source,
                    created_at: d.created_at.to_rfc3339(),
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
