use bevy::asset::LoadState;
use bevy::prelude::*;
use thiserror::Error;

use crate::engine::loading::progress::LoadStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerLoadError {
    #[error("failed to load `{path}`: {reason}")]
    Asset { path: String, reason: String },
    #[error("`{path}` reported loaded but is not in the asset store")]
    Missing { path: String },
    #[error("`{path}` contains no scenes")]
    NoScene { path: String },
    #[error("environment map `{path}` is unusable: {reason}")]
    Environment { path: String, reason: String },
    #[error("`{path}` requires glTF extension `{extension}`, which the loader cannot decode; re-export the model without it")]
    UnsupportedExtension { path: String, extension: String },
}

impl ViewerLoadError {
    /// Narrow a generic glTF failure to the required extension the loader
    /// rejected, if that is what the reason reports.
    pub fn into_model_error(self) -> Self {
        match self {
            ViewerLoadError::Asset { path, reason } => match rejected_extension(&reason) {
                Some(extension) => ViewerLoadError::UnsupportedExtension {
                    path,
                    extension: extension.to_string(),
                },
                None => ViewerLoadError::Asset { path, reason },
            },
            other => other,
        }
    }
}

/// Pull the extension name out of a glTF validation report such as
/// `extensionsRequired[0] = "KHR_draco_mesh_compression": Unsupported extension`.
fn rejected_extension(reason: &str) -> Option<&str> {
    reason
        .split("extensionsRequired[")
        .skip(1)
        .find_map(|entry| {
            let (_, rest) = entry.split_once("= \"")?;
            let (extension, rest) = rest.split_once('"')?;
            rest.trim_start_matches(':')
                .trim_start()
                .starts_with("Unsupported extension")
                .then_some(extension)
        })
}

/// Map the asset server's view of a load onto the viewer's status.
///
/// Unknown and in-flight loads are pending; the viewer never retries.
pub fn status_from_load_state(path: &str, state: Option<LoadState>) -> LoadStatus {
    match state {
        Some(LoadState::Loaded) => LoadStatus::Loaded,
        Some(LoadState::Failed(error)) => LoadStatus::Failed(ViewerLoadError::Asset {
            path: path.to_string(),
            reason: error.to_string(),
        }),
        Some(LoadState::NotLoaded | LoadState::Loading) | None => LoadStatus::Pending,
    }
}

/// A load started by the viewer, remembered with the path it was asked for.
#[derive(Debug, Clone)]
pub struct AssetRequest<A: Asset> {
    path: String,
    handle: Handle<A>,
}

impl<A: Asset> AssetRequest<A> {
    pub fn load(asset_server: &AssetServer, path: impl Into<String>) -> Self {
        let path = path.into();
        let handle = asset_server.load(path.clone());
        Self { path, handle }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handle(&self) -> &Handle<A> {
        &self.handle
    }

    pub fn poll(&self, asset_server: &AssetServer) -> LoadStatus {
        status_from_load_state(&self.path, asset_server.get_load_state(&self.handle))
    }

    #[cfg(test)]
    pub(crate) fn tracked(path: impl Into<String>, handle: Handle<A>) -> Self {
        Self {
            path: path.into(),
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::asset::AssetLoadError;
    use bevy::asset::io::AssetReaderError;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn in_flight_loads_are_pending() {
        assert_eq!(status_from_load_state("pot.glb", None), LoadStatus::Pending);
        assert_eq!(
            status_from_load_state("pot.glb", Some(LoadState::Loading)),
            LoadStatus::Pending
        );
        assert_eq!(
            status_from_load_state("pot.glb", Some(LoadState::Loaded)),
            LoadStatus::Loaded
        );
    }

    #[test]
    fn failures_carry_path_and_reason() {
        let error = AssetLoadError::from(AssetReaderError::NotFound(PathBuf::from(
            "env-metal-1.hdr",
        )));
        let status =
            status_from_load_state("env-metal-1.hdr", Some(LoadState::Failed(Arc::new(error))));

        let LoadStatus::Failed(ViewerLoadError::Asset { path, reason }) = status else {
            panic!("expected an asset failure, got {status:?}");
        };
        assert_eq!(path, "env-metal-1.hdr");
        assert!(reason.contains("env-metal-1.hdr"));
    }

    #[test]
    fn draco_models_name_the_extension() {
        let reason = "Failed to load asset 'pot.glb': invalid glTF: \
            extensionsRequired[0] = \"KHR_draco_mesh_compression\": Unsupported extension;";
        let error = ViewerLoadError::Asset {
            path: "pot.glb".to_string(),
            reason: reason.to_string(),
        }
        .into_model_error();

        assert_eq!(
            error,
            ViewerLoadError::UnsupportedExtension {
                path: "pot.glb".to_string(),
                extension: "KHR_draco_mesh_compression".to_string(),
            }
        );
        assert!(error.to_string().contains("KHR_draco_mesh_compression"));
    }

    #[test]
    fn other_model_failures_are_kept() {
        let error = ViewerLoadError::Asset {
            path: "pot.glb".to_string(),
            reason: "Path not found: pot.glb".to_string(),
        };
        assert_eq!(error.clone().into_model_error(), error);

        // An extension listed as required but accepted is not the culprit.
        let reason = "invalid glTF: extensionsRequired[1] = \"EXT_x\": Invalid value;";
        assert_eq!(rejected_extension(reason), None);
    }
}
