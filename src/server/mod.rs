//! HTTP REST facade
//!
//! A thin axum layer over the core: handlers decode requests, call the
//! store or orchestrator, and map the error taxonomy to status codes.
//! No semantics live here.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::embed::EmbeddingClient;
use crate::error::VectorDbError;
use crate::index::{IndexParams, IndexType};
use crate::model::{
    ChunkUpdate, DocumentUpdate, LibraryUpdate, NewChunk, NewDocument, NewLibrary,
};
use crate::search::{SearchMatch, SearchRequest};
use crate::store::Database;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub embedder: Option<EmbeddingClient>,
}

/// Core errors carried out of handlers; the status mapping lives in one
/// place so the facade stays consistent
struct ApiError(VectorDbError);

impl From<VectorDbError> for ApiError {
    fn from(err: VectorDbError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VectorDbError::NotFound { .. } => StatusCode::NOT_FOUND,
            VectorDbError::Validation { .. }
            | VectorDbError::DimensionMismatch { .. }
            | VectorDbError::UnsupportedIndexType { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            VectorDbError::NotIndexed { .. } | VectorDbError::Conflict { .. } => {
                StatusCode::CONFLICT
            }
            VectorDbError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error surfaced to client");
        }
        let body = serde_json::json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// Request/response DTOs

#[derive(Debug, Deserialize)]
struct CreateDocumentRequest {
    library_id: Uuid,
    #[serde(flatten)]
    document: NewDocument,
}

#[derive(Debug, Deserialize)]
struct CreateChunkRequest {
    document_id: Uuid,
    #[serde(flatten)]
    chunk: NewChunk,
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    index_type: String,
}

/// Optional per-build hyperparameter overrides; anything omitted falls
/// back to the defaults in [`crate::constants`]
#[derive(Debug, Default, Deserialize)]
struct IndexParamsBody {
    seed: Option<u64>,
    lsh_tables: Option<usize>,
    lsh_bits: Option<usize>,
    m: Option<usize>,
    ef_construction: Option<usize>,
    ef_search: Option<usize>,
}

impl IndexParamsBody {
    fn into_params(self) -> IndexParams {
        let defaults = IndexParams::default();
        IndexParams {
            // A missing seed is drawn once here and recorded on the build
            seed: self.seed.unwrap_or_else(rand::random),
            lsh_tables: self.lsh_tables.unwrap_or(defaults.lsh_tables),
            lsh_bits: self.lsh_bits.unwrap_or(defaults.lsh_bits),
            lsh_pool_factor: defaults.lsh_pool_factor,
            m: self.m.unwrap_or(defaults.m),
            ef_construction: self.ef_construction.unwrap_or(defaults.ef_construction),
            ef_search: self.ef_search.unwrap_or(defaults.ef_search),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    results: Vec<SearchMatch>,
    took_ms: u64,
}

#[derive(Debug, Deserialize)]
struct EmbedRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
    model: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/libraries", post(create_library).get(list_libraries))
        .route(
            "/libraries/:id",
            get(get_library).put(update_library).delete(delete_library),
        )
        .route("/libraries/:id/stats", get(library_stats))
        .route("/libraries/:id/index", post(index_library))
        .route("/libraries/:id/search", post(search_library))
        .route("/libraries/:id/documents", get(list_library_documents))
        .route("/documents", post(create_document).get(list_documents))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/documents/:id/chunks", get(list_document_chunks))
        .route("/chunks", post(create_chunk))
        .route(
            "/chunks/:id",
            get(get_chunk).put(update_chunk).delete(delete_chunk),
        )
        .route("/embeddings", post(embed_text))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP server until the cancellation token fires
pub async fn serve(host: &str, port: u16, cancel_token: CancellationToken) -> anyhow::Result<()> {
    let state = AppState {
        db: Arc::new(Database::new()),
        embedder: EmbeddingClient::from_env(),
    };
    let embeddings_configured = state.embedder.is_some();
    let app = router(state);

    let addr = format!("{host}:{port}");
    println!("{}", "🚀 vectordb".bright_cyan().bold());
    println!("{}", "=".repeat(60));
    println!("🌐 Listening on: http://{addr}");
    println!("  Health:  GET  http://{addr}/health");
    println!("  Library: POST http://{addr}/libraries");
    println!("  Search:  POST http://{addr}/libraries/{{id}}/search");
    if !embeddings_configured {
        println!(
            "   {}",
            "(embedding passthrough disabled: VECTORDB_EMBEDDINGS_URL not set)".dimmed()
        );
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "server ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await?;

    Ok(())
}

// HTTP Handlers

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn create_library(
    State(state): State<AppState>,
    Json(new): Json<NewLibrary>,
) -> impl IntoResponse {
    let library = state.db.create_library(new).await;
    (StatusCode::CREATED, Json(library))
}

async fn list_libraries(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.db.list_libraries().await)
}

async fn get_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.get_library(id).await?))
}

async fn update_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<LibraryUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.update_library(id, patch).await?))
}

async fn delete_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.db.delete_library(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn library_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.library_stats(id).await?))
}

async fn index_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<IndexQuery>,
    body: Option<Json<IndexParamsBody>>,
) -> ApiResult<impl IntoResponse> {
    let index_type = IndexType::from_str(&query.index_type)?;
    let params = body.map(|Json(b)| b).unwrap_or_default().into_params();
    let library = state.db.index_library(id, index_type, Some(params)).await?;
    Ok(Json(library))
}

async fn search_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<impl IntoResponse> {
    let start = Instant::now();
    let results = state.db.search(id, request).await?;
    Ok(Json(SearchResponse {
        results,
        took_ms: start.elapsed().as_millis() as u64,
    }))
}

async fn list_library_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_documents(Some(id)).await?))
}

async fn create_document(
    State(state): State<AppState>,
    Json(request): Json<CreateDocumentRequest>,
) -> ApiResult<impl IntoResponse> {
    let document = state
        .db
        .create_document(request.library_id, request.document)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn list_documents(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_documents(None).await?))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.get_document(id).await?))
}

async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DocumentUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.update_document(id, patch).await?))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.db.delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_document_chunks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.list_chunks(id).await?))
}

async fn create_chunk(
    State(state): State<AppState>,
    Json(request): Json<CreateChunkRequest>,
) -> ApiResult<impl IntoResponse> {
    let chunk = state
        .db
        .create_chunk(request.document_id, request.chunk)
        .await?;
    Ok((StatusCode::CREATED, Json(chunk)))
}

async fn get_chunk(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.get_chunk(id).await?))
}

async fn update_chunk(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ChunkUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.db.update_chunk(id, patch).await?))
}

async fn delete_chunk(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.db.delete_chunk(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn embed_text(
    State(state): State<AppState>,
    Json(request): Json<EmbedRequest>,
) -> Response {
    let Some(embedder) = &state.embedder else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": "unavailable",
                "message": "embedding provider not configured",
            })),
        )
            .into_response();
    };
    match embedder.embed(&request.text).await {
        Ok(embedding) => Json(EmbedResponse {
            embedding,
            model: embedder.model().to_string(),
        })
        .into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(AppState {
            db: Arc::new(Database::new()),
            embedder: None,
        })
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_router();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_library_is_404() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::get(format!("/libraries/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_create_search_flow() {
        let app = test_router();

        // Library
        let response = app
            .clone()
            .oneshot(json_request("POST", "/libraries", json!({"name": "docs"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let library = body_json(response).await;
        let library_id = library["id"].as_str().unwrap().to_string();

        // Document
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/documents",
                json!({"library_id": library_id, "title": "intro", "file_type": "text"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let document = body_json(response).await;
        let document_id = document["id"].as_str().unwrap().to_string();

        // Chunks
        for (text, embedding) in [
            ("v1", json!([1.0, 0.0, 0.0])),
            ("v2", json!([0.0, 1.0, 0.0])),
            ("v3", json!([0.9, 0.1, 0.0])),
        ] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/chunks",
                    json!({
                        "document_id": document_id,
                        "text": text,
                        "embedding": embedding,
                        "source": "test",
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        // Searching before indexing is a conflict
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/libraries/{library_id}/search"),
                json!({"embedding": [1.0, 0.0, 0.0], "k": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Index with a pinned seed, then search
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/libraries/{library_id}/index?index_type=flat"),
                json!({"seed": 42}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/libraries/{library_id}/search"),
                json!({"embedding": [1.0, 0.0, 0.0], "k": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["chunk"]["text"], "v1");
        assert_eq!(results[1]["chunk"]["text"], "v3");

        // Stats reflect the build
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/libraries/{library_id}/stats"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let stats = body_json(response).await;
        assert_eq!(stats["total_chunks"], 3);
        assert_eq!(stats["is_indexed"], true);
        assert_eq!(stats["index_type"], "flat");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_422() {
        let app = test_router();
        let library = body_json(
            app.clone()
                .oneshot(json_request("POST", "/libraries", json!({"name": "l"})))
                .await
                .unwrap(),
        )
        .await;
        let document = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/documents",
                    json!({"library_id": library["id"], "title": "d", "file_type": "text"}),
                ))
                .await
                .unwrap(),
        )
        .await;

        let chunk = |embedding: Value| {
            json_request(
                "POST",
                "/chunks",
                json!({
                    "document_id": document["id"],
                    "text": "t",
                    "embedding": embedding,
                    "source": "s",
                }),
            )
        };
        app.clone()
            .oneshot(chunk(json!([1.0, 0.0, 0.0])))
            .await
            .unwrap();

        let response = app.oneshot(chunk(json!([1.0, 0.0]))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "dimension_mismatch");
    }

    #[tokio::test]
    async fn test_unknown_index_type_is_422() {
        let app = test_router();
        let library = body_json(
            app.clone()
                .oneshot(json_request("POST", "/libraries", json!({"name": "l"})))
                .await
                .unwrap(),
        )
        .await;

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/libraries/{}/index?index_type=kd_tree", library["id"].as_str().unwrap()),
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "unsupported_index_type");
    }

    #[tokio::test]
    async fn test_embeddings_unconfigured_is_503() {
        let app = test_router();
        let response = app
            .oneshot(json_request("POST", "/embeddings", json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_cascade_delete_over_http() {
        let app = test_router();
        let library = body_json(
            app.clone()
                .oneshot(json_request("POST", "/libraries", json!({"name": "l"})))
                .await
                .unwrap(),
        )
        .await;
        let library_id = library["id"].as_str().unwrap().to_string();
        let document = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/documents",
                    json!({"library_id": library_id, "title": "d", "file_type": "text"}),
                ))
                .await
                .unwrap(),
        )
        .await;
        let document_id = document["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/libraries/{library_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::get(format!("/documents/{document_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
