//! Declarative scene description built from the host's creation parameters.
//!
//! Everything here is plain data: no engine access, only diagnostic logging.

pub mod camera;
pub mod environment;
pub mod ground;
pub mod light;
pub mod material;
pub mod model;
pub mod serialization;
pub mod shape;

pub use camera::{Camera, Exposure, LensProjection, ManipulatorMode, Projection};
pub use environment::{AssetSource, DefaultIndirectLight, IndirectLight, Skybox};
pub use ground::Ground;
pub use light::Light;
pub use material::MaterialRef;
pub use model::{Animation, Model};
pub use shape::Shape;

use crate::value::{list_of, map_of, set, visit, FieldError, ValueMap};

/// Optional scene-wide configuration, fixed after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub skybox: Option<Skybox>,
    pub light: Option<Light>,
    pub indirect_light: Option<IndirectLight>,
    pub camera: Option<Camera>,
    pub ground: Option<Ground>,
}

impl Scene {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        visit("Scene", map, |key, value| match key {
            "skybox" => map_of(value).map(|m| out.skybox = Skybox::deserialize(m)),
            "light" => set(&mut out.light, map_of(value).map(Light::deserialize)),
            "indirectLight" => {
                map_of(value).map(|m| out.indirect_light = IndirectLight::deserialize(m))
            }
            "camera" => set(&mut out.camera, map_of(value).map(Camera::deserialize)),
            "ground" => set(&mut out.ground, map_of(value).map(Ground::deserialize)),
            _ => Err(FieldError::Unknown),
        });
        out
    }

    pub fn log(&self, tag: &str) {
        log::debug!(
            "{tag} (Scene) skybox={} light={} indirectLight={} camera={} ground={}",
            self.skybox.is_some(),
            self.light.is_some(),
            self.indirect_light.is_some(),
            self.camera.is_some(),
            self.ground.is_some()
        );
        if let Some(light) = &self.light {
            light.log(tag);
        }
    }
}

/// Everything the host hands over when a view is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationParams {
    pub models: Vec<Model>,
    pub scene: Scene,
    pub shapes: Vec<Shape>,
}

impl CreationParams {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        visit("CreationParams", map, |key, value| match key {
            "models" => list_of(value).map(|items| {
                out.models.extend(
                    items
                        .iter()
                        .filter_map(|item| map_of(item).ok().and_then(Model::deserialize)),
                )
            }),
            "model" => {
                log::warn!("'model' is deprecated; use 'models'");
                map_of(value).map(|m| out.models.extend(Model::deserialize(m)))
            }
            "scene" => map_of(value).map(|m| out.scene = Scene::deserialize(m)),
            "shapes" => list_of(value).map(|items| {
                out.shapes.extend(
                    items
                        .iter()
                        .filter_map(|item| map_of(item).ok().and_then(Shape::deserialize)),
                )
            }),
            _ => Err(FieldError::Unknown),
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{CreationParams, Scene};
    use crate::engine::LightType;
    use serde_json::json;

    #[test]
    fn scene_collects_present_parts() {
        let value = json!({
            "light": {"type": "SUN", "intensity": 110000.0},
            "skybox": {"skyboxType": 3, "color": "#000000"},
            "camera": {"exposure": {"sensitivity": 50}},
            "ground": "flat",
            "extra": 1
        });
        let scene = Scene::deserialize(value.as_object().unwrap());
        assert_eq!(scene.light.as_ref().unwrap().light_type, LightType::Sun);
        assert!(scene.skybox.is_some());
        assert!(scene.camera.is_some());
        assert!(scene.ground.is_none());
        assert!(scene.indirect_light.is_none());
    }

    #[test]
    fn creation_params_merge_deprecated_model() {
        let value = json!({
            "model": {"assetPath": "a.glb"},
            "models": [{"assetPath": "b.glb"}, {"isGlb": true}, 3],
            "shapes": [{"shapeType": 1}, {"shapeType": 3}],
            "scene": {}
        });
        let params = CreationParams::deserialize(value.as_object().unwrap());
        assert_eq!(params.models.len(), 2);
        assert_eq!(params.shapes.len(), 2);
        assert_eq!(params.scene, Scene::default());
    }
}
