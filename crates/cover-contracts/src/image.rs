use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MEDIA_TYPE: &str = "image/png";

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Encoded image payload as exchanged with the model gateway.
///
/// `payload` is base64 text. It is kept exactly as received; callers that
/// need the bare payload (the edit request) go through [`ImageData::bare_payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    media_type: String,
    payload: String,
}

impl ImageData {
    pub fn new(media_type: Option<&str>, payload: impl Into<String>) -> Self {
        let media_type = media_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_MEDIA_TYPE)
            .to_string();
        Self {
            media_type,
            payload: payload.into(),
        }
    }

    pub fn from_bytes(media_type: Option<&str>, bytes: &[u8]) -> Self {
        Self::new(media_type, BASE64.encode(bytes))
    }

    /// Parses `data:<type>;base64,<payload>`. Returns `None` for anything else.
    pub fn from_data_url(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix(DATA_URL_SCHEME)?;
        let (media_type, payload) = rest.split_once(BASE64_MARKER)?;
        if payload.is_empty() {
            return None;
        }
        Some(Self::new(Some(media_type), payload))
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn bare_payload(&self) -> &str {
        strip_data_url_prefix(&self.payload)
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "{DATA_URL_SCHEME}{}{BASE64_MARKER}{}",
            self.media_type,
            self.bare_payload()
        )
    }

    pub fn decode_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = BASE64.decode(self.bare_payload().trim().as_bytes())?;
        Ok(bytes)
    }

    pub fn file_extension(&self) -> &'static str {
        extension_for_media_type(&self.media_type)
    }
}

/// Drops a leading `data:...;base64,` prefix if present.
pub fn strip_data_url_prefix(raw: &str) -> &str {
    if !raw.starts_with(DATA_URL_SCHEME) {
        return raw;
    }
    match raw.find(BASE64_MARKER) {
        Some(idx) => &raw[idx + BASE64_MARKER.len()..],
        None => raw,
    }
}

pub fn extension_for_media_type(media_type: &str) -> &'static str {
    let lowered = media_type.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    if lowered.contains("gif") {
        return "gif";
    }
    "png"
}
