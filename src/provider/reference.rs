//! The opaque token handed out with content details and redeemed by
//! `resolve_links`. Callers round-trip it as a JSON string; internally it is a
//! provider-tagged payload so the issuing adapter can be checked on the way back.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReference {
    /// Id of the provider that minted this reference
    pub provider: String,
    #[serde(flatten)]
    pub target: LinkTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinkTarget {
    /// Candidate hosting URLs, each resolved through the extractor registry
    Sources { sources: Vec<SourceRef> },
    /// A title in a provider's own playlist API
    Playlist { id: String, title: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl LinkReference {
    pub fn sources(provider: &str, sources: Vec<SourceRef>) -> Self {
        Self {
            provider: provider.to_string(),
            target: LinkTarget::Sources { sources },
        }
    }

    pub fn playlist(provider: &str, id: &str, title: &str) -> Self {
        Self {
            provider: provider.to_string(),
            target: LinkTarget::Playlist {
                id: id.to_string(),
                title: title.to_string(),
            },
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(token: &str) -> Result<Self> {
        serde_json::from_str(token).map_err(|e| Error::InvalidReference(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_token_shape() {
        let reference = LinkReference::sources(
            "moviesdrive",
            vec![SourceRef {
                url: "https://drive.google.com/file/d/abc".to_string(),
                quality: Some("1080p".to_string()),
            }],
        );
        let token = reference.encode().unwrap();
        let json: serde_json::Value = serde_json::from_str(&token).unwrap();

        assert_eq!(json["provider"], "moviesdrive");
        assert_eq!(json["kind"], "sources");
        assert_eq!(json["sources"][0]["quality"], "1080p");
        assert_eq!(LinkReference::decode(&token).unwrap(), reference);
    }

    #[test]
    fn test_playlist_token_decodes() {
        let token = r#"{"provider":"netflixmirror","kind":"playlist","id":"8100","title":"Dark"}"#;
        let reference = LinkReference::decode(token).unwrap();
        assert_eq!(
            reference.target,
            LinkTarget::Playlist {
                id: "8100".to_string(),
                title: "Dark".to_string()
            }
        );
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        assert!(matches!(
            LinkReference::decode("not json"),
            Err(Error::InvalidReference(_))
        ));
        assert!(matches!(
            LinkReference::decode(r#"{"provider":"x","kind":"magnet"}"#),
            Err(Error::InvalidReference(_))
        ));
    }
}
