use crate::scene::CreationParams;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("creation parameters must be a JSON object, got {0}")]
    NotAMap(&'static str),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// Viewer-level settings that are not part of the scene description.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Root directory every `assetPath` is resolved against.
    pub assets_path: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub post_processing: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            assets_path: PathBuf::from("."),
            viewport_width: 1280,
            viewport_height: 720,
            post_processing: true,
        }
    }
}

pub fn parse_creation_params(bytes: &[u8]) -> Result<CreationParams> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let map = value
        .as_object()
        .ok_or(SerializationError::NotAMap(crate::value::kind_of(&value)))?;
    Ok(CreationParams::deserialize(map))
}

pub fn load_creation_params_from_file(path: &Path) -> Result<CreationParams> {
    let bytes = std::fs::read(path)?;
    parse_creation_params(&bytes)
}

pub fn load_viewer_settings_from_file(path: &Path) -> Result<ViewerSettings> {
    let json = std::fs::read_to_string(path)?;
    let settings: ViewerSettings = serde_json::from_str(&json)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::{
        load_creation_params_from_file, load_viewer_settings_from_file, parse_creation_params,
        SerializationError, ViewerSettings,
    };
    use std::io::Write;

    #[test]
    fn creation_params_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"models": [{{"assetPath": "helmet.glb", "animation": {{"autoPlay": true, "index": 1}}}}],
                "scene": {{"light": {{"type": "POINT"}}}}}}"#
        )
        .unwrap();
        let params = load_creation_params_from_file(file.path()).unwrap();
        assert_eq!(params.models.len(), 1);
        assert_eq!(
            params.models[0].animation.as_ref().and_then(|a| a.start_index()),
            Some(1)
        );
        assert!(params.scene.light.is_some());
    }

    #[test]
    fn non_object_params_are_rejected() {
        assert!(matches!(
            parse_creation_params(b"[1, 2]"),
            Err(SerializationError::NotAMap("list"))
        ));
        assert!(matches!(
            parse_creation_params(b"{not json"),
            Err(SerializationError::Json(_))
        ));
    }

    #[test]
    fn viewer_settings_fill_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"assets_path": "/srv/assets", "viewport_width": 640}}"#).unwrap();
        let settings = load_viewer_settings_from_file(file.path()).unwrap();
        assert_eq!(settings.viewport_width, 640);
        assert_eq!(settings.viewport_height, ViewerSettings::default().viewport_height);
        assert!(settings.post_processing);
    }
}
