//! Result assembly: success envelopes, cursor metadata and the final response.
//!
//! ```json
//! { "posts": [ ... ], "meta": { "cursor": { "current": 10, "next": 15, "count": 37 } } }
//! { "post": { ... } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::filtering::{Limit, PageWindow};

/// Window bounds of a collection response and the total number of matches,
/// counted without the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Cursor {
    /// Offset of this page.
    pub current: i64,
    /// Offset of the following page.
    pub next: i64,
    /// Total matching records.
    pub count: u64,
}

impl Cursor {
    /// Cursor for `window`, or `None` when the window is unbounded.
    #[must_use]
    pub fn for_window(window: &PageWindow, total: u64) -> Option<Self> {
        match window.limit {
            Limit::Bounded(limit) => Some(Self {
                current: window.offset,
                next: window.offset.saturating_add_unsigned(limit),
                count: total,
            }),
            Limit::Unbounded => None,
        }
    }
}

/// A success body before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Item {
        key: String,
        data: Value,
    },
    Collection {
        key: String,
        data: Vec<Value>,
        cursor: Option<Cursor>,
    },
}

impl Envelope {
    pub fn item(key: impl Into<String>, data: Value) -> Self {
        Self::Item {
            key: key.into(),
            data,
        }
    }

    pub fn collection(key: impl Into<String>, data: Vec<Value>, cursor: Option<Cursor>) -> Self {
        Self::Collection {
            key: key.into(),
            data,
            cursor,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        let mut body = Map::new();
        match self {
            Self::Item { key, data } => {
                body.insert(key, data);
            }
            Self::Collection { key, data, cursor } => {
                body.insert(key, Value::Array(data));
                if let Some(cursor) = cursor {
                    body.insert("meta".to_string(), json!({ "cursor": cursor }));
                }
            }
        }
        Value::Object(body)
    }
}

/// A rendered body plus its status code.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    #[must_use]
    pub fn ok(envelope: Envelope) -> Self {
        Self {
            status: StatusCode::OK,
            body: envelope.into_value(),
        }
    }

    /// `{"message": text}` with status 200.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "message": text.into() }),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
