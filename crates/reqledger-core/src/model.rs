//! Entity model: the asset aggregate and its separately stored sub-records.
//!
//! Field names on the wire are the compact lower-case forms shared with
//! existing ledger data (`contentid`, `depid`, `isaccessed`, ...).

use serde::{Deserialize, Serialize};

/// Full name of an asset owner. Embedded by value; no identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
}

impl Owner {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Mutable text body of an asset, stored under its own key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "contentid")]
    pub content_id: String,
    pub text: String,
}

/// Out-edges of one asset: the ordered IDs it depends on.
///
/// IDs are not checked against the ledger; dangling entries are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    #[serde(rename = "depid")]
    pub dep_id: String,
    #[serde(rename = "depids")]
    pub dep_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Created,
    Shared,
}

/// A requirement asset: the primary aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub owner: Owner,
    #[serde(rename = "contentid")]
    pub content_id: String,
    pub status: AssetStatus,
    #[serde(rename = "createtime")]
    pub create_time: String,
    #[serde(rename = "sharetime")]
    pub share_time: String,
    #[serde(rename = "accesstime")]
    pub access_time: String,
    #[serde(rename = "depid")]
    pub dep_id: String,
    #[serde(rename = "isaccessed")]
    pub is_accessed: bool,
}

impl Asset {
    /// A freshly created asset: `Created`, never accessed, not yet shared.
    pub fn new(
        id: impl Into<String>,
        owner: Owner,
        content_id: impl Into<String>,
        dep_id: impl Into<String>,
        create_time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner,
            content_id: content_id.into(),
            status: AssetStatus::Created,
            create_time: create_time.into(),
            share_time: String::new(),
            access_time: String::new(),
            dep_id: dep_id.into(),
            is_accessed: false,
        }
    }

    /// Reassign the owner and move to `Shared`. Repeating keeps `Shared`
    /// but refreshes owner and share time.
    pub fn share(&mut self, owner: Owner, now: impl Into<String>) {
        self.owner = owner;
        self.status = AssetStatus::Shared;
        self.share_time = now.into();
    }

    /// Latch the first access. Returns `false` when already latched.
    pub fn mark_accessed(&mut self, now: impl Into<String>) -> bool {
        if self.is_accessed {
            return false;
        }
        self.is_accessed = true;
        self.access_time = now.into();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> Asset {
        Asset::new("req-1", Owner::new("Ada", "Lovelace"), "content-1", "deps-2", "100")
    }

    #[test]
    fn asset_round_trips_with_wire_field_names() {
        let original = asset();
        let raw = serde_json::to_value(&original).expect("asset should serialize");
        assert_eq!(raw["contentid"], "content-1");
        assert_eq!(raw["depid"], "deps-2");
        assert_eq!(raw["status"], "created");
        assert_eq!(raw["isaccessed"], false);
        assert_eq!(raw["owner"]["firstname"], "Ada");

        let back: Asset = serde_json::from_value(raw).expect("asset should deserialize");
        assert_eq!(back, original);
    }

    #[test]
    fn content_and_dependency_set_round_trip() {
        let content = Content {
            content_id: "content-1".to_string(),
            text: "The brake shall engage within 50ms.".to_string(),
        };
        let bytes = serde_json::to_vec(&content).expect("content should serialize");
        assert_eq!(
            serde_json::from_slice::<Content>(&bytes).expect("content should deserialize"),
            content
        );

        let deps = DependencySet {
            dep_id: "deps-2".to_string(),
            dep_ids: vec!["req-9".to_string(), "req-3".to_string()],
        };
        let raw = serde_json::to_string(&deps).expect("deps should serialize");
        assert_eq!(raw, r#"{"depid":"deps-2","depids":["req-9","req-3"]}"#);
        assert_eq!(
            serde_json::from_str::<DependencySet>(&raw).expect("deps should deserialize"),
            deps
        );
    }

    #[test]
    fn missing_fields_do_not_default() {
        let raw = r#"{"id":"req-1","owner":{"firstname":"A","lastname":"B"},"status":"created"}"#;
        assert!(serde_json::from_str::<Asset>(raw).is_err());
    }

    #[test]
    fn share_is_idempotent_in_status_only() {
        let mut item = asset();
        item.share(Owner::new("Grace", "Hopper"), "200");
        item.share(Owner::new("Alan", "Turing"), "300");
        assert_eq!(item.status, AssetStatus::Shared);
        assert_eq!(item.share_time, "300");
        assert_eq!(item.owner.last_name, "Turing");
    }

    #[test]
    fn access_latch_flips_once() {
        let mut item = asset();
        assert!(item.mark_accessed("150"));
        assert!(!item.mark_accessed("160"));
        assert!(item.is_accessed);
        assert_eq!(item.access_time, "150");
    }
}
