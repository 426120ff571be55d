//! Handlers and the closed result-coercion union.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde_json::Value;

use switchyard_wire::{RequestContext, Response};

use crate::error::HandlerError;

/// An application endpoint.
///
/// Handlers receive the request context exclusively for the duration of
/// one call and return anything [`Reply`] can coerce. Faults become a
/// generic 500 at the dispatch boundary; they never cross to other
/// requests.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> Result<Reply, HandlerError>;
}

/// Adapts a plain function to [`Handler`].
///
/// The function must return a boxed future so the borrow of the context
/// has a nameable lifetime; free functions returning
/// `Box::pin(async move { .. })` satisfy the bound directly.
pub struct HandlerFn<F>(pub F);

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<Reply, HandlerError>>
        + Send
        + Sync,
{
    async fn call(&self, ctx: &mut RequestContext) -> Result<Reply, HandlerError> {
        (self.0)(ctx).await
    }
}

/// Everything a handler may return, as a closed union.
///
/// Coercion is a fixed decision table, not an open type hierarchy: a
/// ready response passes through untouched, JSON values and strings get
/// the conventional content types, raw bytes become an octet stream, and
/// anything else is stringified into `Text` by the caller.
#[derive(Debug)]
pub enum Reply {
    /// Pass through unchanged, status and headers included.
    Response(Response),
    /// 200 with an `application/json` body.
    Json(Value),
    /// 200 with a `text/html` body.
    Html(String),
    /// 200 with an `application/octet-stream` body.
    Bytes(Bytes),
    /// 200 with a `text/plain` body, the stringify fallback.
    Text(String),
}

impl Reply {
    /// Runs the coercion table.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Response(response) => response,
            Self::Json(value) => Response::json(&value),
            Self::Html(body) => Response::html(body),
            Self::Bytes(body) => Response::bytes(body),
            Self::Text(body) => Response::text(body),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Strings coerce to HTML, mirroring the framework convention that
/// handlers returning markup just return the string.
impl From<String> for Reply {
    fn from(body: String) -> Self {
        Self::Html(body)
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Self::Html(body.to_owned())
    }
}

impl From<Bytes> for Reply {
    fn from(body: Bytes) -> Self {
        Self::Bytes(body)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(body: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(body))
    }
}
