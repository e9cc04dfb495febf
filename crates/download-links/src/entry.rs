use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row of a download-links block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub filename: String,
    /// Provider label, e.g. the name of a cloud drive.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source: String,
    /// Access code shown next to the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Icon overriding the provider's default one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl LinkEntry {
    pub fn new(
        url: impl Into<String>,
        filename: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            source: source.into(),
            code: None,
            icon: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// The label shown for the entry: the filename, or the url when the
    /// filename is blank.
    pub fn display_name(&self) -> &str {
        if self.filename.trim().is_empty() {
            &self.url
        } else {
            &self.filename
        }
    }
}

/// Decode the `data-links` attribute. A missing, empty or malformed value
/// yields an empty list; this never fails.
pub fn decode_links(data: Option<&str>) -> Vec<LinkEntry> {
    let Some(data) = data.filter(|d| !d.is_empty()) else {
        return Vec::new();
    };
    serde_json::from_str(data).unwrap_or_else(|err| {
        tracing::trace!(%err, "discarding malformed data-links attribute");
        Vec::new()
    })
}

pub fn encode_links(links: &[LinkEntry]) -> String {
    serde_json::to_string(links).unwrap_or_else(|_| "[]".to_string())
}

/// Read a `links` model attribute. `None` when the value is not a valid
/// list of entries.
pub fn links_from_value(value: &Value) -> Option<Vec<LinkEntry>> {
    if !value.is_array() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

pub fn links_to_value(links: &[LinkEntry]) -> Value {
    serde_json::to_value(links).unwrap_or_else(|_| Value::Array(Vec::new()))
}
