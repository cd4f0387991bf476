// Newline-delimited JSON streaming of device actions
use crate::domain::device::DeviceAction;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Create a chunked NDJSON response, one action per line
pub fn ndjson_stream<S>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = DeviceAction> + Send + 'static,
{
    let byte_stream = stream.map(|action| encode_line(&action));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn encode_line(action: &DeviceAction) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(action)?;
    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Stream the live outbox feed until the outbox goes away.
/// A slow reader skips what it missed rather than ending the stream.
pub fn stream_from_receiver(mut rx: broadcast::Receiver<DeviceAction>) -> impl IntoResponse {
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(action) => yield action,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("outbox stream lagged, {} actions skipped", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    match ndjson_stream(stream) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
