//! Wire and view types for the storage proxy.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical operation selected by the `path` field of a proxy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyOperation {
    /// Aggregate quota and usage statistics.
    Usage,
    /// Metadata for every file stored in the project.
    List,
}

impl ProxyOperation {
    /// Wire name of the operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ProxyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body POSTed to the proxy endpoint. Built per call and dropped once encoded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProxyRequest<'a> {
    pub project_id: &'a str,
    pub token: &'a str,
    pub path: ProxyOperation,
    pub params: Map<String, Value>,
}

impl<'a> ProxyRequest<'a> {
    pub(crate) fn new(project_id: &'a str, token: &'a str, path: ProxyOperation) -> Self {
        Self {
            project_id,
            token,
            path,
            params: Map::new(),
        }
    }
}

/// Usage statistics as documented by the proxy.
///
/// This is a lenient view for display. The client never requires a usage
/// response to match it; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Bytes currently stored.
    #[serde(default)]
    pub total_bytes: Option<u64>,
    /// Number of stored files.
    #[serde(default)]
    pub file_count: Option<u64>,
    /// Storage quota in bytes.
    #[serde(default)]
    pub quota_bytes: Option<u64>,
}

impl UsageStats {
    /// Interpret a usage response.
    ///
    /// Each field is read on its own, so one oddly typed value does not hide
    /// the others. Returns `None` when the response carries none of the usage
    /// fields (an error payload from the proxy, for instance).
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !["total_bytes", "file_count", "quota_bytes"]
            .iter()
            .any(|key| obj.contains_key(*key))
        {
            return None;
        }
        Some(Self {
            total_bytes: obj.get("total_bytes").and_then(as_count),
            file_count: obj.get("file_count").and_then(as_count),
            quota_bytes: obj.get("quota_bytes").and_then(as_count),
        })
    }

    /// Bytes left before the quota is reached.
    pub fn remaining_bytes(&self) -> Option<u64> {
        Some(self.quota_bytes?.saturating_sub(self.total_bytes?))
    }
}

/// One file record from a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Stored file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// MIME type recorded at upload.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Download URL, when the proxy names it `url`.
    #[serde(default)]
    pub url: Option<String>,
    /// Public URL, for files that are publicly readable.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl FileMetadata {
    /// Interpret a list response.
    ///
    /// Accepts a bare array or an object wrapping one under `files`. Elements
    /// that are not objects are skipped.
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        let items = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(obj) => obj
                .get("files")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
            _ => &[][..],
        };
        items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_owned);
                Self {
                    filename: text("filename"),
                    size: obj.get("size").and_then(as_count),
                    content_type: text("content_type"),
                    url: text("url"),
                    public_url: text("public_url"),
                }
            })
            .collect()
    }

    /// Public link for the file, if the proxy exposes one.
    pub fn link(&self) -> Option<&str> {
        self.public_url.as_deref().or(self.url.as_deref())
    }
}

/// Read a non-negative whole number, accepting integral floats like `1024.0`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn as_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    let in_range = f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64;
    in_range.then_some(f as u64)
}

/// Render a byte count with binary units, e.g. `1.5 KiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
