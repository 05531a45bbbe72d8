use super::environment::AssetSource;
use crate::engine::ModelFormat;
use crate::value::{bool_of, f32_of, map_of, set, string_of, u32_of, vec3_of, visit, FieldError, ValueMap};
use glam::Vec3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub auto_play: bool,
    pub index: Option<u32>,
    pub name: Option<String>,
}

impl Animation {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        let mut auto_play = None;
        visit("Animation", map, |key, value| match key {
            "autoPlay" => set(&mut auto_play, bool_of(value)),
            "index" => set(&mut out.index, u32_of(value)),
            "name" => set(&mut out.name, string_of(value)),
            _ => Err(FieldError::Unknown),
        });
        out.auto_play = auto_play.unwrap_or(false);
        out
    }

    /// Animation to start once the model is loaded. Names are not resolved
    /// against the model yet and select the first animation.
    pub fn start_index(&self) -> Option<u32> {
        if !self.auto_play {
            return None;
        }
        match (&self.index, &self.name) {
            (Some(index), _) => Some(*index),
            (None, Some(name)) if !name.is_empty() => Some(0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub format: ModelFormat,
    pub source: AssetSource,
    pub path_prefix: Option<String>,
    pub path_postfix: Option<String>,
    pub scale: f32,
    pub center_position: Option<Vec3>,
    pub animation: Option<Animation>,
    pub fallback: Option<Box<Model>>,
}

impl Model {
    pub fn deserialize(map: &ValueMap) -> Option<Self> {
        Self::parse(map, true)
    }

    fn parse(map: &ValueMap, allow_fallback: bool) -> Option<Self> {
        let mut is_glb = None;
        let mut asset_path = None;
        let mut url = None;
        let mut path_prefix = None;
        let mut path_postfix = None;
        let mut scale = None;
        let mut center_position = None;
        let mut animation = None;
        let mut fallback = None;
        visit("Model", map, |key, value| match key {
            "isGlb" => set(&mut is_glb, bool_of(value)),
            "assetPath" => set(&mut asset_path, string_of(value)),
            "url" => set(&mut url, string_of(value)),
            "pathPrefix" => set(&mut path_prefix, string_of(value)),
            "pathPostfix" => set(&mut path_postfix, string_of(value)),
            "scale" => set(&mut scale, f32_of(value)),
            "centerPosition" => set(&mut center_position, vec3_of(value)),
            "animation" => set(&mut animation, map_of(value).map(Animation::deserialize)),
            "fallback" if !allow_fallback => {
                log::warn!("Nested model fallback ignored");
                Ok(())
            }
            "fallback" => set(
                &mut fallback,
                map_of(value).map(|m| Self::parse(m, false).map(Box::new)),
            ),
            _ => Err(FieldError::Unknown),
        });

        let Some(source) = AssetSource::pick(asset_path, url) else {
            log::warn!("Model has neither assetPath nor url");
            return None;
        };
        let format = if is_glb.unwrap_or(true) {
            ModelFormat::Glb
        } else {
            ModelFormat::Gltf
        };
        Some(Self {
            format,
            source,
            path_prefix,
            path_postfix,
            scale: scale.unwrap_or(1.0),
            center_position,
            animation,
            fallback: fallback.flatten(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Animation, Model};
    use crate::engine::ModelFormat;
    use crate::scene::AssetSource;
    use serde_json::json;

    #[test]
    fn gltf_with_fallback() {
        let value = json!({
            "isGlb": false,
            "assetPath": "models/car.gltf",
            "pathPrefix": "models/",
            "scale": 2.0,
            "fallback": {"assetPath": "models/box.glb", "fallback": {"assetPath": "deeper.glb"}}
        });
        let model = Model::deserialize(value.as_object().unwrap()).unwrap();
        assert_eq!(model.format, ModelFormat::Gltf);
        assert_eq!(model.scale, 2.0);
        let fallback = model.fallback.unwrap();
        assert_eq!(fallback.source, AssetSource::Asset("models/box.glb".to_string()));
        assert_eq!(fallback.format, ModelFormat::Glb);
        assert!(fallback.fallback.is_none());
    }

    #[test]
    fn model_without_source_is_dropped() {
        assert!(Model::deserialize(json!({"isGlb": true}).as_object().unwrap()).is_none());
    }

    #[test]
    fn animation_start_index() {
        let by_index = Animation { auto_play: true, index: Some(2), name: None };
        let by_name = Animation { auto_play: true, index: None, name: Some("Run".to_string()) };
        let manual = Animation { auto_play: false, index: Some(1), name: None };
        assert_eq!(by_index.start_index(), Some(2));
        assert_eq!(by_name.start_index(), Some(0));
        assert_eq!(manual.start_index(), None);
    }
}
