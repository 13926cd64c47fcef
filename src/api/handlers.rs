//! Handler for the `/generate` endpoint
//!
//! One request runs the generator exactly once:
//!
//! 1. resolve language and input specification (query, else configuration);
//! 2. allocate a fresh temp directory for the generator's files;
//! 3. spawn the invocation with stdout and stderr both bound to the response;
//! 4. stream output as it is produced;
//! 5. remove the temp directory, then publish the outcome.
//!
//! Both output streams share one channel, so the body carries stdout and stderr
//! interleaved in the order chunks arrive. The outcome is reported as the status
//! code when it is known before the first byte (or in buffered mode), and as
//! trailers after the body otherwise.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Query, RawQuery, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, stream};
use http_body::Frame;
use http_body_util::StreamBody;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::DropGuard;
use uuid::Uuid;

use crate::api::error::{ApiError, outcome_headers};
use crate::generation::{
    GeneratorLanguage, GeneratorOptions, InvocationContext, InvocationError, OutputSink,
};
use crate::state::AppState;

/// Prefix of the per-request output directories
pub const OUTPUT_DIR_PREFIX: &str = "full_autorest";

/// Trailer fields announced on streamed responses
pub const ANNOUNCED_TRAILERS: &str = "x-generator-status, x-generator-exit-code";

const OUTPUT_CHANNEL_CAPACITY: usize = 64;
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

type Invocation = JoinHandle<Result<(), InvocationError>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Forward output as it is produced; outcome in trailers
    #[default]
    Stream,
    /// Collect all output first; outcome in the status code
    Buffered,
}

/// Single-valued query parameters. `spec` may repeat and is read from the raw
/// query by [`input_specs_from_query`].
#[derive(Debug, Default, Deserialize)]
pub struct GenerateParams {
    pub language: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "use")]
    pub use_package: Option<String>,
    #[serde(default)]
    pub mode: ResponseMode,
}

/// Every non-empty `spec` value of the query string, in order
pub fn input_specs_from_query(query: Option<&str>) -> Vec<String> {
    let Some(query) = query else {
        return Vec::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, value)| key == "spec" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .collect()
}

pub async fn generate(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Query(params): Query<GenerateParams>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, mode = ?params.mode, "Request received: generate");

    let language = match params.language.as_deref() {
        Some(name) => name.parse::<GeneratorLanguage>()?,
        None => state.config.default_language.clone(),
    };
    let mut input_specs = input_specs_from_query(query.as_deref());
    if input_specs.is_empty() {
        input_specs = state.config.default_input_specs.clone();
    }

    let ctx = InvocationContext::from_parent(&state.shutdown)
        .with_timeout(state.config.generation_timeout);

    let mut builder = tempfile::Builder::new();
    builder.prefix(OUTPUT_DIR_PREFIX);
    let output_dir = match &state.config.output_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(|e| {
        tracing::error!(%request_id, error = %e, "Failed to create output directory");
        ApiError::OutputDirectory(e)
    })?;
    tracing::debug!(
        %request_id,
        path = %output_dir.path().display(),
        "Allocated output directory"
    );

    let (sender, receiver) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
    let sink = OutputSink::channel(sender);
    let mut options = GeneratorOptions::new()
        .set_output_folder(output_dir.path())
        .set_stdout(sink.clone())
        .set_stderr(sink);
    if let Some(tag) = params.tag {
        options = options.set_tag(tag);
    }
    if let Some(package) = params.use_package {
        options = options.set_use_package(package);
    }

    // If the response is dropped before the generator finishes, stop it
    let cancel_on_drop = ctx.token().clone().drop_guard();
    let invocation = spawn_invocation(
        &state,
        ctx,
        language,
        input_specs,
        options,
        output_dir,
        request_id,
    );

    match params.mode {
        ResponseMode::Stream => {
            stream_response(receiver, invocation, cancel_on_drop, request_id).await
        }
        ResponseMode::Buffered => {
            buffered_response(receiver, invocation, cancel_on_drop, request_id).await
        }
    }
}

/// Run the generator on its own task. The task owns the output directory and
/// removes it before yielding the outcome.
fn spawn_invocation(
    state: &AppState,
    ctx: InvocationContext,
    language: GeneratorLanguage,
    input_specs: Vec<String>,
    options: GeneratorOptions,
    output_dir: TempDir,
    request_id: Uuid,
) -> Invocation {
    let generator = state.generator.clone();
    tokio::spawn(async move {
        let result = generator
            .invoke(&ctx, &language, &input_specs, options)
            .await;

        let path = output_dir.path().to_path_buf();
        match output_dir.close() {
            Ok(()) => tracing::debug!(
                %request_id,
                path = %path.display(),
                "Removed output directory"
            ),
            Err(e) => tracing::warn!(
                %request_id,
                path = %path.display(),
                error = %e,
                "Failed to remove output directory"
            ),
        }

        match &result {
            Ok(()) => tracing::info!(%request_id, "Generation succeeded"),
            Err(e) => tracing::error!(
                %request_id,
                kind = e.kind().as_str(),
                exit_code = ?e.exit_code(),
                error = %e,
                "Generation failed"
            ),
        }
        result
    })
}

async fn finish(invocation: Invocation, cancel_on_drop: DropGuard) -> Result<(), ApiError> {
    let joined = invocation.await;
    cancel_on_drop.disarm();
    match joined {
        Ok(outcome) => outcome.map_err(ApiError::from),
        Err(e) => Err(ApiError::Internal(format!("generation task failed: {e}"))),
    }
}

fn response_headers(request_id: Uuid) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(HeaderName::from_static("x-request-id"), value);
    }
    headers
}

async fn stream_response(
    mut receiver: mpsc::Receiver<Bytes>,
    invocation: Invocation,
    cancel_on_drop: DropGuard,
    request_id: Uuid,
) -> Result<Response, ApiError> {
    let first = match receiver.recv().await {
        Some(chunk) => chunk,
        None => {
            // Finished without writing anything, the status can still carry the outcome
            finish(invocation, cancel_on_drop).await?;
            let mut headers = response_headers(request_id);
            headers.extend(outcome_headers(&Ok(())));
            return Ok((StatusCode::OK, headers).into_response());
        }
    };

    let data = stream::once(async move { first })
        .chain(ReceiverStream::new(receiver))
        .map(|chunk| Ok::<_, Infallible>(Frame::data(chunk)));
    let trailers = stream::once(async move {
        let outcome = finish(invocation, cancel_on_drop).await;
        tracing::debug!(%request_id, "Sending generation trailers");
        Ok::<_, Infallible>(Frame::trailers(outcome_headers(&outcome)))
    });
    let body = Body::new(StreamBody::new(data.chain(trailers)));

    let mut headers = response_headers(request_id);
    headers.insert(
        header::TRAILER,
        HeaderValue::from_static(ANNOUNCED_TRAILERS),
    );
    Ok((StatusCode::OK, headers, body).into_response())
}

async fn buffered_response(
    mut receiver: mpsc::Receiver<Bytes>,
    invocation: Invocation,
    cancel_on_drop: DropGuard,
    request_id: Uuid,
) -> Result<Response, ApiError> {
    let mut output = BytesMut::new();
    while let Some(chunk) = receiver.recv().await {
        output.extend_from_slice(&chunk);
    }

    let outcome = finish(invocation, cancel_on_drop).await;
    let status = match &outcome {
        Ok(()) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    if let Err(e) = &outcome {
        if !output.is_empty() && !output.ends_with(b"\n") {
            output.extend_from_slice(b"\n");
        }
        output.extend_from_slice(format!("{e}\n").as_bytes());
    }

    let mut headers = response_headers(request_id);
    headers.extend(outcome_headers(&outcome));
    Ok((status, headers, output.freeze()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_specs_from_query() {
        assert!(input_specs_from_query(None).is_empty());
        assert!(input_specs_from_query(Some("language=go")).is_empty());

        assert_eq!(
            input_specs_from_query(Some("spec=a.md&language=go&spec=https%3A%2F%2Fx%2Fb.md")),
            vec!["a.md", "https://x/b.md"]
        );
        assert_eq!(input_specs_from_query(Some("spec=&spec=c.md")), vec!["c.md"]);
    }
}
