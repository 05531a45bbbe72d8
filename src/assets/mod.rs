use crate::engine::{Entity, ModelData, ModelFormat};
use crate::error::SceneError;
use crate::scene::{AssetSource, Model};
use crate::state::{lock, LoadState, SceneStates};
use crate::strand::{Completion, Strand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    pub name: String,
    pub root_entity: Entity,
    pub animation_names: Vec<String>,
    pub is_fallback: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF JSON: {path}")]
    ParseGltf { path: String },
    #[error("glTF resource '{uri}' not found at {path}")]
    MissingResource { uri: String, path: String },
}

/// Reads model files from the asset root and loads them on the strand.
pub struct ModelLoader {
    strand: Arc<Strand>,
    states: Arc<SceneStates>,
    assets_path: PathBuf,
    loaded_assets: Arc<Mutex<Vec<LoadedAsset>>>,
}

impl ModelLoader {
    pub fn new(strand: Arc<Strand>, states: Arc<SceneStates>, assets_path: impl Into<PathBuf>) -> Self {
        Self {
            strand,
            states,
            assets_path: assets_path.into(),
            loaded_assets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn loaded_assets(&self) -> Vec<LoadedAsset> {
        lock(&self.loaded_assets).clone()
    }

    /// Reads the model and, for glTF, checks that every external resource
    /// resolves under `pathPrefix` + uri + `pathPostfix`.
    pub fn read_model(&self, model: &Model, is_fallback: bool) -> Result<ModelData, SceneError> {
        let path = match &model.source {
            AssetSource::Asset(path) => path,
            AssetSource::Url(url) => {
                log::warn!("Model URL '{url}' requested");
                return Err(SceneError::NotImplemented("Model loading from URL"));
            }
        };
        let file = self.assets_path.join(path);
        let bytes = std::fs::read(&file).map_err(|source| AssetError::Read {
            path: file.display().to_string(),
            source,
        })?;
        if model.format == ModelFormat::Gltf {
            self.check_gltf_resources(&bytes, &file, model)?;
        }
        let name = Path::new(path)
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("model")
            .to_string();
        Ok(ModelData {
            name,
            format: model.format,
            bytes,
            scale: model.scale,
            center_position: model.center_position,
            is_fallback,
        })
    }

    fn check_gltf_resources(&self, bytes: &[u8], file: &Path, model: &Model) -> Result<(), AssetError> {
        let document: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|_| AssetError::ParseGltf {
                path: file.display().to_string(),
            })?;
        let base = match &model.path_prefix {
            Some(prefix) => self.assets_path.join(prefix),
            None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let postfix = model.path_postfix.as_deref().unwrap_or("");
        let uris = ["buffers", "images"]
            .iter()
            .filter_map(|key| document.get(*key).and_then(serde_json::Value::as_array))
            .flatten()
            .filter_map(|entry| entry.get("uri").and_then(serde_json::Value::as_str))
            .filter(|uri| !uri.starts_with("data:"));
        for uri in uris {
            let resource = base.join(format!("{uri}{postfix}"));
            if !resource.is_file() {
                return Err(AssetError::MissingResource {
                    uri: uri.to_string(),
                    path: resource.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Reads `model` on the caller's thread and loads it on the strand.
    pub fn load_model(&self, model: &Model, is_fallback: bool) -> Completion<Result<LoadedAsset, SceneError>> {
        self.states.model.set(LoadState::Loading);
        let data = match self.read_model(model, is_fallback) {
            Ok(data) => data,
            Err(e) => {
                self.states.model.set(LoadState::Error);
                return Completion::ready(Err(e));
            }
        };
        let states = Arc::clone(&self.states);
        let loaded_assets = Arc::clone(&self.loaded_assets);
        self.strand.submit(move |engine| {
            match engine.load_model(&data) {
                Ok(loaded) => {
                    let asset = LoadedAsset {
                        name: data.name.clone(),
                        root_entity: loaded.root,
                        animation_names: loaded.animation_names,
                        is_fallback: data.is_fallback,
                    };
                    log::info!(
                        "Loaded model {} ({} animations)",
                        asset.name,
                        asset.animation_names.len()
                    );
                    lock(&loaded_assets).push(asset.clone());
                    states.model.set(LoadState::Loaded);
                    Ok(asset)
                }
                Err(e) => {
                    states.model.set(LoadState::Error);
                    Err(e.into())
                }
            }
        })
    }

    /// Loads `model`, trying its fallback once if the primary fails.
    /// Returns the asset and whichever model produced it.
    pub fn load_with_fallback<'m>(&self, model: &'m Model) -> Result<(LoadedAsset, &'m Model), SceneError> {
        let primary = self.load_model(model, false).wait().and_then(|r| r);
        let error = match primary {
            Ok(asset) => return Ok((asset, model)),
            Err(e) => e,
        };
        let Some(fallback) = model.fallback.as_deref() else {
            log::error!("Model {} failed: {error}", model.source.describe());
            return Err(error);
        };
        log::warn!(
            "Model {} failed ({error}); loading fallback {}",
            model.source.describe(),
            fallback.source.describe()
        );
        match self.load_model(fallback, true).wait().and_then(|r| r) {
            Ok(asset) => Ok((asset, fallback)),
            Err(e) => {
                log::error!("Fallback model {} failed: {e}", fallback.source.describe());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetError, ModelLoader};
    use crate::engine::{glb_bytes, EngineInspector, HeadlessEngine};
    use crate::error::{ErrorKind, SceneError};
    use crate::scene::Model;
    use crate::state::{LoadState, SceneStates};
    use crate::strand::Strand;
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        loader: ModelLoader,
        inspector: EngineInspector,
        states: Arc<SceneStates>,
        assets: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let engine = HeadlessEngine::new(32, 32);
        let inspector = engine.inspector();
        let states = Arc::new(SceneStates::default());
        let assets = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new(
            Arc::new(Strand::spawn(Box::new(engine)).unwrap()),
            Arc::clone(&states),
            assets.path(),
        );
        Fixture {
            loader,
            inspector,
            states,
            assets,
        }
    }

    fn model(value: serde_json::Value) -> Model {
        Model::deserialize(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn glb_model_is_loaded_into_the_scene() {
        let f = fixture();
        std::fs::write(
            f.assets.path().join("fox.glb"),
            glb_bytes(r#"{"asset":{"version":"2.0"},"animations":[{"name":"Run"}]}"#),
        )
        .unwrap();
        let asset = f
            .loader
            .load_model(&model(json!({"assetPath": "fox.glb"})), false)
            .wait()
            .unwrap()
            .unwrap();
        assert_eq!(asset.name, "fox.glb");
        assert_eq!(asset.animation_names, vec!["Run"]);
        assert_eq!(f.states.model.get(), LoadState::Loaded);
        assert!(f.inspector.snapshot().in_scene(asset.root_entity));
        assert_eq!(f.loader.loaded_assets(), vec![asset]);
    }

    #[test]
    fn fallback_loads_when_primary_is_missing() {
        let f = fixture();
        std::fs::write(
            f.assets.path().join("box.glb"),
            glb_bytes(r#"{"asset":{"version":"2.0"}}"#),
        )
        .unwrap();
        let declared = model(json!({
            "assetPath": "missing.glb",
            "fallback": {"assetPath": "box.glb", "animation": {"autoPlay": true, "index": 2}}
        }));
        let (asset, used) = f.loader.load_with_fallback(&declared).unwrap();
        assert!(asset.is_fallback);
        assert_eq!(used.animation.as_ref().and_then(|a| a.start_index()), Some(2));
        assert_eq!(f.inspector.snapshot().models.len(), 1);
    }

    #[test]
    fn failures_without_fallback_surface() {
        let f = fixture();
        let err = f
            .loader
            .load_with_fallback(&model(json!({"assetPath": "none.glb"})))
            .unwrap_err();
        assert!(matches!(err, SceneError::Asset(AssetError::Read { .. })));
        assert_eq!(f.states.model.get(), LoadState::Error);

        let url = f
            .loader
            .load_with_fallback(&model(json!({"url": "https://host/a.glb"})))
            .unwrap_err();
        assert_eq!(url.kind(), ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn gltf_resources_resolve_with_prefix_and_postfix() {
        let f = fixture();
        let gltf = r#"{"asset":{"version":"2.0"},"buffers":[{"uri":"mesh.bin"},{"uri":"data:application/octet-stream;base64,AAAA"}]}"#;
        std::fs::write(f.assets.path().join("scene.gltf"), gltf).unwrap();
        std::fs::create_dir(f.assets.path().join("res")).unwrap();
        std::fs::write(f.assets.path().join("res").join("mesh.bin.v2"), b"bin").unwrap();

        let missing = f
            .loader
            .read_model(&model(json!({"assetPath": "scene.gltf", "isGlb": false})), false)
            .unwrap_err();
        assert!(matches!(
            missing,
            SceneError::Asset(AssetError::MissingResource { .. })
        ));

        let found = model(json!({
            "assetPath": "scene.gltf", "isGlb": false, "pathPrefix": "res", "pathPostfix": ".v2"
        }));
        let asset = f.loader.load_model(&found, false).wait().unwrap().unwrap();
        assert_eq!(asset.name, "scene.gltf");
    }
}
