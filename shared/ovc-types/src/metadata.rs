//! Off-chain metadata documents referenced by `ipfs://` URIs.

use serde::{Deserialize, Serialize};

/// Uploaded when a payment request is created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Uploaded when a payment request is rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Department profile stored as the DAO's user metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parse a cached metadata string; malformed documents read as absent.
pub fn parse_cached<T: for<'de> Deserialize<'de>>(cached: Option<&str>) -> Option<T> {
    cached.and_then(|raw| serde_json::from_str(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_metadata_is_lenient() {
        let ok: Option<PaymentMetadata> = parse_cached(Some(r#"{"title":"Bob: June"}"#));
        assert_eq!(ok.and_then(|m| m.title).as_deref(), Some("Bob: June"));

        let broken: Option<PaymentMetadata> = parse_cached(Some("{not json"));
        assert!(broken.is_none());

        let missing: Option<RejectionMetadata> = parse_cached(None);
        assert!(missing.is_none());
    }

    #[test]
    fn upload_documents_have_expected_shape() {
        let doc = serde_json::to_value(PaymentMetadata {
            title: Some("t".into()),
            description: Some("d".into()),
        })
        .unwrap();
        assert_eq!(doc, serde_json::json!({"title": "t", "description": "d"}));

        let reason = serde_json::to_value(RejectionMetadata {
            reason: Some("out of scope".into()),
        })
        .unwrap();
        assert_eq!(reason, serde_json::json!({"reason": "out of scope"}));
    }
}
