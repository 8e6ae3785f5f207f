use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use common::Message;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::{AppState, error::AppError};

/// Runs the request body through the processor. Request headers become
/// message metadata.
pub async fn process(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let span = info_span!("process", request_id = %Uuid::new_v4());

    async move {
        info!("Received message with {} byte payload", body.len());
        let message = message_from_request(&headers, &body);

        let batch = state.processor.process(&message).await.map_err(|e| {
            error!("Failed to process message: {}", e);
            e
        })?;

        let out = batch
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("processor produced no output"))?;
        debug!("Processed message into {} byte payload", out.payload().len());

        Ok::<_, AppError>((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            out.payload().to_vec(),
        ))
    }
    .instrument(span)
    .await
}

fn message_from_request(headers: &HeaderMap, body: &Bytes) -> Message {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .fold(Message::new(body.to_vec()), |message, (name, value)| {
            message.with_metadata(name, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn headers_become_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("x-language", HeaderValue::from_static("French"));
        headers.insert("x-binary", HeaderValue::from_bytes(&[0xff]).unwrap());

        let message = message_from_request(&headers, &Bytes::from_static(b"bonjour"));

        assert_eq!(message.as_str().unwrap(), "bonjour");
        assert_eq!(message.meta("x-language"), Some("French"));
        assert_eq!(message.meta("x-binary"), None);
    }
}
