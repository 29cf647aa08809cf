// Chunked NDJSON streaming utilities
use crate::infrastructure::http_response::brotli_compress;
use crate::infrastructure::json_mapper::StreamMessage;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Create a chunked response with one JSON message per line
pub async fn chunked_json_stream<S>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = StreamMessage> + Send + 'static,
{
    let byte_stream = stream.then(move |msg| async move { serialize_chunk(&msg, compress).await });
    let body = Body::from_stream(byte_stream);

    // Chunks are compressed one by one, so the response carries no
    // Content-Encoding; a compressed chunk is prefixed with its length.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single StreamMessage to a chunk
async fn serialize_chunk(msg: &StreamMessage, compress: bool) -> Result<Bytes, std::io::Error> {
    let mut line = serde_json::to_vec(msg)?;
    line.push(b'\n');

    if !compress {
        return Ok(Bytes::from(line));
    }

    let payload = brotli_compress(&line).await?;
    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(payload.len() as u32);
    chunk.put_slice(&payload);
    Ok(chunk.freeze())
}

/// Helper to create a streaming response from a receiver
pub async fn stream_from_receiver(
    mut rx: tokio::sync::mpsc::Receiver<StreamMessage>,
    compress: bool,
) -> impl IntoResponse {
    let stream = async_stream::stream! {
        while let Some(msg) = rx.recv().await {
            yield msg;
        }
    };

    match chunked_json_stream(stream, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
