use std::fmt;

use bevy::prelude::*;
use serde::Serialize;

use crate::engine::loading::asset_request::ViewerLoadError;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadStatus {
    #[default]
    Pending,
    Loaded,
    Failed(ViewerLoadError),
}

impl LoadStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, LoadStatus::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadStatus::Pending => "pending",
            LoadStatus::Loaded => "loaded",
            LoadStatus::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedAsset {
    Manifest,
    Model,
    Environment,
}

impl fmt::Display for TrackedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrackedAsset::Manifest => "manifest",
            TrackedAsset::Model => "model",
            TrackedAsset::Environment => "environment",
        })
    }
}

/// Sent once per tracked asset when its load settles.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AssetLoadFinished {
    pub asset: TrackedAsset,
    pub result: Result<(), ViewerLoadError>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct LoadingProgress {
    pub manifest: LoadStatus,
    pub model: LoadStatus,
    pub environment: LoadStatus,
}

impl LoadingProgress {
    pub fn status(&self, asset: TrackedAsset) -> &LoadStatus {
        match asset {
            TrackedAsset::Manifest => &self.manifest,
            TrackedAsset::Model => &self.model,
            TrackedAsset::Environment => &self.environment,
        }
    }

    /// Record a settled load. Returns the completion event, or `None` when the
    /// asset had already settled.
    pub fn settle(&mut self, asset: TrackedAsset, status: LoadStatus) -> Option<AssetLoadFinished> {
        let slot = match asset {
            TrackedAsset::Manifest => &mut self.manifest,
            TrackedAsset::Model => &mut self.model,
            TrackedAsset::Environment => &mut self.environment,
        };
        if slot.is_settled() || !status.is_settled() {
            return None;
        }

        let result = match &status {
            LoadStatus::Failed(error) => Err(error.clone()),
            _ => Ok(()),
        };
        *slot = status;
        Some(AssetLoadFinished { asset, result })
    }

    /// The scene is ready to run once both the model and the environment are
    /// done, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.model.is_settled() && self.environment.is_settled()
    }

    pub fn as_json(&self) -> serde_json::Value {
        serde_json::json!({
            "manifest": self.manifest.label(),
            "model": self.model.label(),
            "environment": self.environment.label(),
        })
    }
}

/// Log every settled load; model and environment failures are errors.
pub fn log_load_results(mut finished: EventReader<AssetLoadFinished>) {
    for event in finished.read() {
        match (&event.result, event.asset) {
            (Ok(()), asset) => info!("✓ {asset} loaded"),
            (Err(error), TrackedAsset::Manifest) => {
                warn!("Scene manifest unavailable, using built-in scene: {error}")
            }
            (Err(error), asset) => error!("✗ {asset} failed to load: {error}"),
        }
    }
}
