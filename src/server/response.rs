//! Chunk stream -> axum response conversion
//!
//! Each [`UnifiedChunk`](crate::protocol::UnifiedChunk) becomes one body
//! frame, so hyper writes it to the socket as soon as the adapter yields it.

use std::convert::Infallible;
use std::pin::Pin;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use futures::{Stream, StreamExt};

use crate::streaming::ChatStream;

/// Content type of the unified stream protocol.
pub const PROTOCOL_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Encode a chunk stream as protocol lines.
pub fn to_protocol_lines(
    stream: ChatStream,
) -> Pin<Box<dyn Stream<Item = Result<String, Infallible>> + Send>> {
    Box::pin(stream.map(|chunk| Ok(chunk.encode())))
}

/// Build the streaming `200` response for a chat request.
pub fn to_protocol_response(stream: ChatStream) -> Response {
    let mut response = Response::new(Body::from_stream(to_protocol_lines(stream)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(PROTOCOL_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::UnifiedChunk;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn one_line_per_chunk() {
        let stream: ChatStream = Box::pin(futures::stream::iter(vec![
            UnifiedChunk::text("He said \"hi\""),
            UnifiedChunk::stop(),
        ]));
        let response = to_protocol_response(stream);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PROTOCOL_CONTENT_TYPE);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "0:\"He said \\\"hi\\\"\"\nd:{\"finishReason\":\"stop\",\"usage\":{\"promptTokens\":0,\"completionTokens\":0}}\n"
        );
    }
}
