//! Event payloads: one flat record per lifecycle transition.

use serde::{Deserialize, Serialize};

/// Fixed event names handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    NewAsset,
    AssetShared,
    AssetModified,
    AssetAccessed,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::NewAsset => "newAsset",
            EventName::AssetShared => "assetShared",
            EventName::AssetModified => "assetModified",
            EventName::AssetAccessed => "assetAccessed",
        }
    }
}

/// A payload type bound to the event name it is emitted under.
pub trait EventPayload: Serialize {
    const NAME: EventName;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssetPayload {
    #[serde(rename = "assetid")]
    pub asset_id: String,
    #[serde(rename = "createtime")]
    pub create_time: String,
}

impl EventPayload for NewAssetPayload {
    const NAME: EventName = EventName::NewAsset;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSharedPayload {
    #[serde(rename = "assetid")]
    pub asset_id: String,
    #[serde(rename = "sharetime")]
    pub share_time: String,
    pub dependents: Vec<String>,
}

impl EventPayload for AssetSharedPayload {
    const NAME: EventName = EventName::AssetShared;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetModifiedPayload {
    #[serde(rename = "source")]
    pub source_id: String,
    pub dependents: Vec<String>,
}

impl EventPayload for AssetModifiedPayload {
    const NAME: EventName = EventName::AssetModified;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAccessedPayload {
    #[serde(rename = "assetid")]
    pub asset_id: String,
    #[serde(rename = "sharetime")]
    pub share_time: String,
    #[serde(rename = "readtime")]
    pub read_time: String,
}

impl EventPayload for AssetAccessedPayload {
    const NAME: EventName = EventName::AssetAccessed;
}
