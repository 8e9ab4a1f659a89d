use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
}

/// Inline image payload, kept apart from the records that reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub media_type: String,
    /// Base64 body without the `data:` prefix.
    pub data: String,
}

impl ImageData {
    /// Parses a `data:<media-type>;base64,<body>` URL.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (media_type, data) = rest.split_once(";base64,")?;
        if media_type.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self {
            media_type: media_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_urls() {
        let image = ImageData::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.data, "iVBORw0KGgo=");
        assert_eq!(image.to_data_url(), "data:image/png;base64,iVBORw0KGgo=");

        assert!(ImageData::from_data_url("image/png;base64,abc").is_none());
        assert!(ImageData::from_data_url("data:;base64,abc").is_none());
        assert!(ImageData::from_data_url("data:image/png,abc").is_none());
    }
}
