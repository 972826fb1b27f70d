use serde::{Deserialize, Serialize};

/// Standard success envelope: `{ success, data, message? }`.
///
/// `data` is kept as raw JSON here; the client decodes it into the
/// concrete type after checking `success`, so one envelope struct
/// serves every endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub message: Option<String>,
    /// Present only on list endpoints.
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Error envelope: `{ code, message, details? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One decoded page of a cursor-paged list resource.
///
/// `next_cursor == None` means the list is exhausted; the cursor value
/// itself is opaque and is passed back to the server verbatim.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    /// A page with no items and no continuation.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}
