//! Binary metadata payloads.
//!
//! Uploaders send a flat JSON object of metadata fields. Only the
//! keys modeled by [`BinaryFields`] are recognized; anything else is
//! ignored so that older servers accept payloads from newer clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata fields a client may set on a binary.
///
/// Absent keys and explicit `null`s both leave the corresponding
/// field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryFields {
    /// Location of the artifact on the server's filesystem.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub distro: Option<String>,

    #[serde(default)]
    pub distro_version: Option<String>,

    #[serde(default)]
    pub arch: Option<String>,

    /// The source revision the artifact was built from.
    #[serde(rename = "ref")]
    #[serde(default)]
    pub git_ref: Option<String>,

    /// Identity of the builder that produced the artifact.
    #[serde(default)]
    pub built_by: Option<String>,

    /// Size of the artifact in bytes.
    #[serde(default)]
    pub size: Option<i64>,
}

/// The public representation of a binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryInfo {
    pub name: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,

    pub signed: bool,

    pub size: i64,

    pub path: Option<String>,

    /// Human-readable time since the binary last changed.
    pub last_changed: String,

    pub built_by: Option<String>,

    pub distro: String,

    pub distro_version: String,

    /// Hexadecimal SHA-512 of the artifact file.
    pub checksum: Option<String>,

    pub arch: String,

    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_ignore_unknown_keys() {
        let json = r#"{
            "distro": "ubuntu",
            "distro_version": "20.04",
            "ref": "main",
            "size": 1024,
            "sha1": "deadbeef",
            "extra": { "nested": true }
        }"#;

        let fields: BinaryFields = serde_json::from_str(json).unwrap();

        assert_eq!(
            BinaryFields {
                distro: Some("ubuntu".to_string()),
                distro_version: Some("20.04".to_string()),
                git_ref: Some("main".to_string()),
                size: Some(1024),
                ..Default::default()
            },
            fields
        );
    }

    #[test]
    fn test_fields_null_is_absent() {
        let fields: BinaryFields = serde_json::from_str(r#"{"path": null}"#).unwrap();
        assert_eq!(BinaryFields::default(), fields);
    }

    #[test]
    fn test_info_fields() {
        let now = Utc::now();
        let info = BinaryInfo {
            name: "ceph.deb".to_string(),
            created: now,
            modified: now,
            signed: false,
            size: 0,
            path: None,
            last_changed: "just now".to_string(),
            built_by: None,
            distro: "ubuntu".to_string(),
            distro_version: "20.04".to_string(),
            checksum: None,
            arch: "amd64".to_string(),
            git_ref: None,
        };

        let value = serde_json::to_value(&info).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();

        assert_eq!(
            vec![
                "arch",
                "built_by",
                "checksum",
                "created",
                "distro",
                "distro_version",
                "last_changed",
                "modified",
                "name",
                "path",
                "ref",
                "signed",
                "size",
            ],
            keys
        );
        assert!(value["checksum"].is_null());
        assert!(value["ref"].is_null());
    }
}
