use crate::engine::Entity;
use crate::error::{Outcome, SceneError};
use crate::scene::Light;
use crate::state::lock;
use crate::strand::{Completion, Strand};
use std::sync::{Arc, Mutex};

/// Owns the scene's single direct light entity.
pub struct LightManager {
    strand: Arc<Strand>,
    entity: Arc<Mutex<Option<Entity>>>,
}

impl LightManager {
    pub fn new(strand: Arc<Strand>) -> Self {
        Self {
            strand,
            entity: Arc::new(Mutex::new(None)),
        }
    }

    /// Builds the default light and waits for it.
    pub fn set_default_light(&self) -> Outcome {
        self.change_light(Some(&Light::default())).resolve()
    }

    /// Rebuilds the light onto the one entity this manager owns, creating it
    /// on first use. The entity is removed from the scene before it is added
    /// back so it is never registered twice.
    pub fn change_light(&self, light: Option<&Light>) -> Completion<Outcome> {
        let Some(light) = light else {
            return Completion::ready(Err(SceneError::MustBeProvided("Light type")));
        };
        let params = match light.to_params() {
            Ok(params) => params,
            Err(e) => {
                log::warn!("Light not changed: {e}");
                return Completion::ready(Err(e));
            }
        };
        if light.has_zero_spot_direction() {
            log::warn!(
                "{} light has a zero direction vector; its appearance is undefined",
                light.light_type.as_text()
            );
        }
        light.log("change_light");

        let slot = Arc::clone(&self.entity);
        self.strand.submit(move |engine| -> Outcome {
            let mut slot = lock(&slot);
            let entity = *slot.get_or_insert_with(|| engine.create_entity());
            engine.build_light(entity, &params)?;
            engine.remove_entity(entity);
            engine.add_entity(entity);
            log::debug!("Light {} built as {:?}", entity.id, params.light_type);
            Ok("Light created successfully".to_string())
        })
    }

    pub fn entity(&self) -> Completion<Option<Entity>> {
        let slot = Arc::clone(&self.entity);
        self.strand.submit(move |_engine| *lock(&slot))
    }
}

#[cfg(test)]
mod tests {
    use super::LightManager;
    use crate::engine::{EngineInspector, HeadlessEngine, LightType};
    use crate::error::ErrorKind;
    use crate::scene::Light;
    use crate::strand::Strand;
    use glam::Vec3;
    use std::sync::Arc;

    fn manager() -> (LightManager, EngineInspector) {
        let engine = HeadlessEngine::new(64, 64);
        let inspector = engine.inspector();
        let strand = Arc::new(Strand::spawn(Box::new(engine)).unwrap());
        (LightManager::new(strand), inspector)
    }

    #[test]
    fn repeated_changes_keep_one_registration() {
        let (manager, inspector) = manager();
        let light = Light::deserialize(
            serde_json::json!({"type": "POINT", "intensity": 500.0, "position": [0, 2, 0]})
                .as_object()
                .unwrap(),
        );
        assert_eq!(
            manager.change_light(Some(&light)).resolve().unwrap(),
            "Light created successfully"
        );
        manager.change_light(Some(&light)).resolve().unwrap();
        let snapshot = inspector.snapshot();
        let lights = snapshot.scene_lights();
        assert_eq!(lights.len(), 1);
        assert_eq!(snapshot.lights.len(), 1);
        assert_eq!(snapshot.lights[&lights[0]].intensity, Some(500.0));
        assert_eq!(manager.entity().wait().unwrap(), Some(lights[0]));
    }

    #[test]
    fn missing_light_is_rejected() {
        let (manager, inspector) = manager();
        let err = manager.change_light(None).resolve().unwrap_err();
        assert_eq!(err.to_string(), "Light type must be provided");
        assert!(inspector.snapshot().lights.is_empty());
    }

    #[test]
    fn invalid_color_builds_nothing() {
        let (manager, inspector) = manager();
        let mut light = Light::default();
        light.change_color("#12");
        let err = manager.change_light(Some(&light)).resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(manager.entity().wait().unwrap().is_none());
        assert!(inspector.snapshot().scene.is_empty());
    }

    #[test]
    fn zero_direction_spot_still_builds() {
        let (manager, inspector) = manager();
        let mut spot = Light::new(LightType::Spot);
        spot.direction = Some(Vec3::ZERO);
        manager.change_light(Some(&spot)).resolve().unwrap();
        assert_eq!(inspector.snapshot().scene_lights().len(), 1);
    }

    #[test]
    fn default_light_then_change_reuses_entity() {
        let (manager, inspector) = manager();
        manager.set_default_light().unwrap();
        let first = manager.entity().wait().unwrap();
        let mut light = Light::default();
        light.change_intensity(42.0);
        light.change_color("#00FF00");
        manager.change_light(Some(&light)).resolve().unwrap();
        assert_eq!(manager.entity().wait().unwrap(), first);
        let snapshot = inspector.snapshot();
        let params = &snapshot.lights[&first.unwrap()];
        assert_eq!(params.color, Some(Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(params.light_type, LightType::Directional);
    }
}
