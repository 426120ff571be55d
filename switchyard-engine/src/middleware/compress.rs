//! Gzip response compression.

use std::io::Write;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{HeaderValue, CONTENT_ENCODING, VARY};

use switchyard_wire::{RequestContext, Response};

use crate::config::DEFAULT_COMPRESSION_MIN_SIZE;
use crate::middleware::{Middleware, Next};

/// Compresses response bodies with gzip.
///
/// A response is compressed only when the client declared gzip support,
/// the body is at least `minimum_size` bytes, and no other encoding is
/// already set. `vary: accept-encoding` is appended either way once the
/// client qualified, so caches key on the negotiation.
pub struct CompressionMiddleware {
    minimum_size: usize,
    level: Compression,
}

impl CompressionMiddleware {
    /// Stock settings: 500-byte minimum, level 6.
    #[must_use]
    pub fn new() -> Self {
        Self::with_minimum_size(DEFAULT_COMPRESSION_MIN_SIZE)
    }

    #[must_use]
    pub fn with_minimum_size(minimum_size: usize) -> Self {
        Self { minimum_size, level: Compression::new(6) }
    }
}

impl Default for CompressionMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for CompressionMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let accepts_gzip = ctx
            .header("accept-encoding")
            .is_some_and(|encodings| encodings.contains("gzip"));

        let mut response = next.run(ctx).await;
        if !accepts_gzip {
            return response;
        }

        if response.body.len() >= self.minimum_size
            && !response.headers.contains_key(CONTENT_ENCODING)
        {
            if let Some(compressed) = gzip(&response.body, self.level) {
                response.body = compressed;
                response
                    .headers
                    .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            }
        }
        response
            .headers
            .append(VARY, HeaderValue::from_static("accept-encoding"));
        response
    }
}

/// Compresses `body`, or `None` when the encoder fails (the response is
/// then sent uncompressed).
fn gzip(body: &[u8], level: Compression) -> Option<Bytes> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), level);
    encoder.write_all(body).ok()?;
    encoder.finish().ok().map(Bytes::from)
}
