// src/server/mod.rs

use anyhow::{Context, Result};
use futures::TryStreamExt;
use serde::Serialize;
use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use warp::{
    http::StatusCode,
    hyper::body::Buf,
    multipart::{FormData, Part},
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::fetch::DocumentSource;
use crate::pipeline;

pub const QUESTIONS_FIELD: &str = "questions.txt";
pub const MISSING_UPLOAD: &str = "No questions.txt uploaded";
/// Upper bound on the whole multipart body.
pub const MAX_UPLOAD_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: message.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "filmscraper"
    })))
}

/// Drain the `questions.txt` file part, if the form carries one.
///
/// Like a browser file field, a part only counts when it has a filename.
async fn read_questions(form: FormData) -> Result<Option<Vec<u8>>, warp::Error> {
    futures::pin_mut!(form);
    while let Some(part) = form.try_next().await? {
        if part.name() == QUESTIONS_FIELD && part.filename().is_some_and(|f| !f.is_empty()) {
            return read_part(part).await.map(Some);
        }
    }
    Ok(None)
}

async fn read_part(part: Part) -> Result<Vec<u8>, warp::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, buf| async move {
            acc.extend_from_slice(buf.chunk());
            Ok(acc)
        })
        .await
}

async fn analyze(form: FormData, source: Arc<dyn DocumentSource>) -> Result<Response, Rejection> {
    let questions = match read_questions(form).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(error_reply(StatusCode::BAD_REQUEST, MISSING_UPLOAD)),
        Err(e) => {
            warn!(error = %e, "unreadable multipart body");
            return Ok(error_reply(StatusCode::BAD_REQUEST, MISSING_UPLOAD));
        }
    };
    // The upload is required but its content does not steer the analysis.
    info!(bytes = questions.len(), "received questions.txt");

    match pipeline::run(source.as_ref()).await {
        Ok(answers) => Ok(warp::reply::json(&answers).into_response()),
        Err(e) => {
            error!(error = %e, "pipeline failed");
            let status = if e.is_upstream() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Ok(error_reply(status, e.to_string()))
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let reply = if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Upload too large")
    } else {
        // Not multipart, no boundary, no length: there is no file to find.
        warn!(rejection = ?err, "request without a usable upload");
        error_reply(StatusCode::BAD_REQUEST, MISSING_UPLOAD)
    };
    Ok(reply)
}

/// `GET /health` and `POST /api/`.
pub fn routes(
    source: Arc<dyn DocumentSource>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let with_source = warp::any().map(move || Arc::clone(&source));
    let api = warp::path("api")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_source)
        .and_then(analyze);

    health
        .or(api)
        .recover(handle_rejection)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    source: Arc<dyn DocumentSource>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let (bound, server) = warp::serve(routes(source))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .with_context(|| format!("binding {}", addr))?;

    info!("Server listening on {}", bound);
    info!("Analyze endpoint: POST http://{}/api/", bound);
    server.await;
    info!("Server stopped");
    Ok(())
}
