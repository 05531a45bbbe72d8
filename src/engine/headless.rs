use super::{
    BlendMode, Engine, EngineError, Entity, ExposureSettings, GroundParams, HdrImage,
    IndirectLightId, IndirectLightParams, LightParams, LoadedModel, ModelData, ModelFormat,
    ProjectionSettings, ShapeParams, SkyboxId, SkyboxParams, TextureId, Viewport,
};
use crate::state::lock;
use glam::{DVec2, Vec3};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const CUBEMAP_FACE_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Equirect,
    Cubemap,
    Reflections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRecord {
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub levels: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    pub exposure: Option<ExposureSettings>,
    pub projection: Option<ProjectionSettings>,
    pub shift: DVec2,
    pub scaling: DVec2,
    pub look_at: Option<(Vec3, Vec3, Vec3)>,
}

impl Default for CameraRecord {
    fn default() -> Self {
        Self {
            exposure: None,
            projection: None,
            shift: DVec2::ZERO,
            scaling: DVec2::ONE,
            look_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    pub name: String,
    pub root: Entity,
    pub animation_names: Vec<String>,
    pub is_fallback: bool,
}

/// Everything the headless engine knows, cloned out by [`EngineInspector`].
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub viewport: Viewport,
    pub post_processing: bool,
    pub blend_mode: BlendMode,
    pub clear_enabled: bool,
    pub entities: BTreeSet<Entity>,
    /// Scene registrations in insertion order; duplicates are kept.
    pub scene: Vec<Entity>,
    pub cameras: BTreeMap<Entity, CameraRecord>,
    pub view_camera: Option<Entity>,
    pub lights: BTreeMap<Entity, LightParams>,
    pub textures: BTreeMap<TextureId, TextureRecord>,
    pub indirect_lights: BTreeMap<IndirectLightId, IndirectLightParams>,
    pub indirect_light: Option<IndirectLightId>,
    pub skyboxes: BTreeMap<SkyboxId, SkyboxParams>,
    pub skybox: Option<SkyboxId>,
    pub models: Vec<ModelRecord>,
    pub grounds: BTreeMap<Entity, GroundParams>,
    pub shapes: BTreeMap<Entity, ShapeParams>,
}

impl EngineSnapshot {
    fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            post_processing: true,
            blend_mode: BlendMode::Opaque,
            clear_enabled: false,
            entities: BTreeSet::new(),
            scene: Vec::new(),
            cameras: BTreeMap::new(),
            view_camera: None,
            lights: BTreeMap::new(),
            textures: BTreeMap::new(),
            indirect_lights: BTreeMap::new(),
            indirect_light: None,
            skyboxes: BTreeMap::new(),
            skybox: None,
            models: Vec::new(),
            grounds: BTreeMap::new(),
            shapes: BTreeMap::new(),
        }
    }

    pub fn scene_count(&self, entity: Entity) -> usize {
        self.scene.iter().filter(|e| **e == entity).count()
    }

    pub fn in_scene(&self, entity: Entity) -> bool {
        self.scene_count(entity) > 0
    }

    /// Light entities currently registered in the scene, with duplicates.
    pub fn scene_lights(&self) -> Vec<Entity> {
        self.scene
            .iter()
            .copied()
            .filter(|e| self.lights.contains_key(e))
            .collect()
    }

    pub fn view_camera_record(&self) -> Option<&CameraRecord> {
        self.view_camera.and_then(|e| self.cameras.get(&e))
    }

    pub fn active_indirect_light(&self) -> Option<&IndirectLightParams> {
        self.indirect_light.and_then(|id| self.indirect_lights.get(&id))
    }

    pub fn active_skybox(&self) -> Option<&SkyboxParams> {
        self.skybox.and_then(|id| self.skyboxes.get(&id))
    }
}

/// Cloneable read handle over a [`HeadlessEngine`]'s state.
#[derive(Clone)]
pub struct EngineInspector {
    state: Arc<Mutex<EngineSnapshot>>,
}

impl EngineInspector {
    pub fn snapshot(&self) -> EngineSnapshot {
        lock(&self.state).clone()
    }
}

/// In-memory engine with no GPU work, in the spirit of Filament's noop backend.
pub struct HeadlessEngine {
    state: Arc<Mutex<EngineSnapshot>>,
    next_id: u32,
    failing_prefilters: u32,
}

impl HeadlessEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineSnapshot::new(Viewport::new(width, height)))),
            next_id: 1,
            failing_prefilters: 0,
        }
    }

    /// The next `count` specular prefilter passes fail, as a driver out of
    /// memory would.
    pub fn fail_prefilters(mut self, count: u32) -> Self {
        self.failing_prefilters = count;
        self
    }

    pub fn inspector(&self) -> EngineInspector {
        EngineInspector {
            state: Arc::clone(&self.state),
        }
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn state(&self) -> MutexGuard<'_, EngineSnapshot> {
        lock(&self.state)
    }

    fn with_camera<F>(&mut self, camera: Entity, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut CameraRecord),
    {
        let mut state = self.state();
        let record = state
            .cameras
            .get_mut(&camera)
            .ok_or(EngineError::NoCamera(camera))?;
        f(record);
        Ok(())
    }

    fn require_texture(&self, texture: TextureId) -> Result<TextureRecord, EngineError> {
        self.state()
            .textures
            .get(&texture)
            .copied()
            .ok_or(EngineError::UnknownTexture(texture))
    }
}

impl Engine for HeadlessEngine {
    fn viewport(&self) -> Viewport {
        self.state().viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state().viewport = viewport;
    }

    fn set_post_processing_enabled(&mut self, enabled: bool) {
        self.state().post_processing = enabled;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state().blend_mode = mode;
    }

    fn set_clear_enabled(&mut self, clear: bool) {
        self.state().clear_enabled = clear;
    }

    fn create_entity(&mut self) -> Entity {
        let entity = Entity { id: self.next() };
        self.state().entities.insert(entity);
        entity
    }

    fn destroy_entity(&mut self, entity: Entity) {
        let mut state = self.state();
        state.entities.remove(&entity);
        state.scene.retain(|e| *e != entity);
        state.lights.remove(&entity);
        state.grounds.remove(&entity);
        state.shapes.remove(&entity);
    }

    fn add_entity(&mut self, entity: Entity) {
        self.state().scene.push(entity);
    }

    fn remove_entity(&mut self, entity: Entity) {
        self.state().scene.retain(|e| *e != entity);
    }

    fn create_camera(&mut self, entity: Entity) -> Result<(), EngineError> {
        let mut state = self.state();
        if !state.entities.contains(&entity) {
            return Err(EngineError::UnknownEntity(entity));
        }
        state.cameras.insert(entity, CameraRecord::default());
        Ok(())
    }

    fn destroy_camera(&mut self, entity: Entity) {
        let mut state = self.state();
        state.cameras.remove(&entity);
        if state.view_camera == Some(entity) {
            state.view_camera = None;
        }
    }

    fn set_view_camera(&mut self, entity: Entity) -> Result<(), EngineError> {
        let mut state = self.state();
        if !state.cameras.contains_key(&entity) {
            return Err(EngineError::NoCamera(entity));
        }
        state.view_camera = Some(entity);
        Ok(())
    }

    fn set_exposure(&mut self, camera: Entity, exposure: ExposureSettings) -> Result<(), EngineError> {
        self.with_camera(camera, |record| record.exposure = Some(exposure))
    }

    fn set_projection(
        &mut self,
        camera: Entity,
        projection: ProjectionSettings,
    ) -> Result<(), EngineError> {
        self.with_camera(camera, |record| record.projection = Some(projection))
    }

    fn set_shift(&mut self, camera: Entity, shift: DVec2) -> Result<(), EngineError> {
        self.with_camera(camera, |record| record.shift = shift)
    }

    fn set_scaling(&mut self, camera: Entity, scaling: DVec2) -> Result<(), EngineError> {
        self.with_camera(camera, |record| record.scaling = scaling)
    }

    fn look_at(&mut self, camera: Entity, eye: Vec3, center: Vec3, up: Vec3) -> Result<(), EngineError> {
        self.with_camera(camera, |record| record.look_at = Some((eye, center, up)))
    }

    fn build_light(&mut self, entity: Entity, params: &LightParams) -> Result<(), EngineError> {
        let mut state = self.state();
        if !state.entities.contains(&entity) {
            return Err(EngineError::UnknownEntity(entity));
        }
        state.lights.insert(entity, params.clone());
        Ok(())
    }

    fn create_hdr_texture(&mut self, image: &HdrImage) -> Result<TextureId, EngineError> {
        let expected = image.width as usize * image.height as usize * 3;
        if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            return Err(EngineError::InvalidTexture(format!(
                "{}x{} image with {} floats",
                image.width,
                image.height,
                image.pixels.len()
            )));
        }
        let id = TextureId(self.next());
        self.state().textures.insert(
            id,
            TextureRecord {
                kind: TextureKind::Equirect,
                width: image.width,
                height: image.height,
                levels: 1,
            },
        );
        Ok(id)
    }

    fn equirect_to_cubemap(&mut self, equirect: TextureId) -> Result<TextureId, EngineError> {
        let source = self.require_texture(equirect)?;
        if source.kind != TextureKind::Equirect {
            return Err(EngineError::InvalidTexture(format!(
                "texture {} is not equirectangular",
                equirect.0
            )));
        }
        let id = TextureId(self.next());
        self.state().textures.insert(
            id,
            TextureRecord {
                kind: TextureKind::Cubemap,
                width: CUBEMAP_FACE_SIZE,
                height: CUBEMAP_FACE_SIZE,
                levels: CUBEMAP_FACE_SIZE.ilog2() + 1,
            },
        );
        Ok(id)
    }

    fn prefilter_specular(&mut self, cubemap: TextureId) -> Result<TextureId, EngineError> {
        let source = self.require_texture(cubemap)?;
        if source.kind != TextureKind::Cubemap {
            return Err(EngineError::InvalidTexture(format!(
                "texture {} is not a cube map",
                cubemap.0
            )));
        }
        if self.failing_prefilters > 0 {
            self.failing_prefilters -= 1;
            return Err(EngineError::InvalidTexture(format!(
                "prefilter of cube map {} failed",
                cubemap.0
            )));
        }
        let id = TextureId(self.next());
        self.state().textures.insert(
            id,
            TextureRecord {
                kind: TextureKind::Reflections,
                ..source
            },
        );
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.state().textures.remove(&texture);
    }

    fn create_indirect_light(
        &mut self,
        params: &IndirectLightParams,
    ) -> Result<IndirectLightId, EngineError> {
        if let super::IblSource::Reflections(texture) = params.source {
            self.require_texture(texture)?;
        }
        let id = IndirectLightId(self.next());
        self.state().indirect_lights.insert(id, params.clone());
        Ok(id)
    }

    fn set_indirect_light_intensity(
        &mut self,
        light: IndirectLightId,
        intensity: f32,
    ) -> Result<(), EngineError> {
        let mut state = self.state();
        let params = state
            .indirect_lights
            .get_mut(&light)
            .ok_or(EngineError::UnknownIndirectLight(light))?;
        params.intensity = intensity;
        Ok(())
    }

    fn set_indirect_light(&mut self, light: Option<IndirectLightId>) {
        self.state().indirect_light = light;
    }

    fn destroy_indirect_light(&mut self, light: IndirectLightId) {
        let mut state = self.state();
        state.indirect_lights.remove(&light);
        if state.indirect_light == Some(light) {
            state.indirect_light = None;
        }
    }

    fn create_skybox(&mut self, params: &SkyboxParams) -> Result<SkyboxId, EngineError> {
        if let SkyboxParams::Environment { cubemap, .. } = params {
            self.require_texture(*cubemap)?;
        }
        let id = SkyboxId(self.next());
        self.state().skyboxes.insert(id, *params);
        Ok(id)
    }

    fn set_skybox(&mut self, skybox: Option<SkyboxId>) {
        self.state().skybox = skybox;
    }

    fn destroy_skybox(&mut self, skybox: SkyboxId) {
        let mut state = self.state();
        state.skyboxes.remove(&skybox);
        if state.skybox == Some(skybox) {
            state.skybox = None;
        }
    }

    fn load_model(&mut self, model: &ModelData) -> Result<LoadedModel, EngineError> {
        let json = match model.format {
            ModelFormat::Glb => glb_json_chunk(&model.bytes),
            ModelFormat::Gltf => Ok(model.bytes.as_slice()),
        }
        .map_err(|reason| EngineError::ParseModel {
            name: model.name.clone(),
            reason,
        })?;
        let document: serde_json::Value =
            serde_json::from_slice(json).map_err(|e| EngineError::ParseModel {
                name: model.name.clone(),
                reason: e.to_string(),
            })?;
        if document.get("asset").is_none() {
            return Err(EngineError::ParseModel {
                name: model.name.clone(),
                reason: "missing 'asset' object".to_string(),
            });
        }
        let animation_names = animation_names(&document);

        let root = self.create_entity();
        self.add_entity(root);
        self.state().models.push(ModelRecord {
            name: model.name.clone(),
            root,
            animation_names: animation_names.clone(),
            is_fallback: model.is_fallback,
        });
        Ok(LoadedModel {
            root,
            animation_names,
        })
    }

    fn create_ground(&mut self, params: &GroundParams) -> Result<Entity, EngineError> {
        let entity = self.create_entity();
        self.state().grounds.insert(entity, params.clone());
        Ok(entity)
    }

    fn create_shape(&mut self, params: &ShapeParams) -> Result<Entity, EngineError> {
        let entity = self.create_entity();
        self.state().shapes.insert(entity, params.clone());
        Ok(entity)
    }
}

fn glb_json_chunk(bytes: &[u8]) -> Result<&[u8], String> {
    let word = |offset: usize| -> Result<u32, String> {
        bytes
            .get(offset..offset + 4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or_else(|| format!("truncated GLB at byte {offset}"))
    };
    if bytes.get(0..4) != Some(GLB_MAGIC.as_slice()) {
        return Err("missing GLB magic".to_string());
    }
    let version = word(4)?;
    if version != 2 {
        return Err(format!("unsupported GLB version {version}"));
    }
    let chunk_len = word(12)? as usize;
    if word(16)? != GLB_CHUNK_JSON {
        return Err("first GLB chunk is not JSON".to_string());
    }
    bytes
        .get(20..20 + chunk_len)
        .ok_or_else(|| "truncated GLB JSON chunk".to_string())
}

fn animation_names(document: &serde_json::Value) -> Vec<String> {
    document
        .get("animations")
        .and_then(serde_json::Value::as_array)
        .map(|animations| {
            animations
                .iter()
                .enumerate()
                .map(|(i, animation)| {
                    animation
                        .get("name")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("animation_{i}"))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn glb_bytes(json: &str) -> Vec<u8> {
    let mut chunk = json.as_bytes().to_vec();
    while chunk.len() % 4 != 0 {
        chunk.push(b' ');
    }
    let total = 12 + 8 + chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&chunk);
    out
}

#[cfg(test)]
mod tests {
    use super::{glb_bytes, HeadlessEngine, TextureKind};
    use crate::engine::{Engine, HdrImage, ModelData, ModelFormat};

    fn model(format: ModelFormat, bytes: Vec<u8>) -> ModelData {
        ModelData {
            name: "test".to_string(),
            format,
            bytes,
            scale: 1.0,
            center_position: None,
            is_fallback: false,
        }
    }

    #[test]
    fn scene_keeps_duplicate_registrations_until_removed() {
        let mut engine = HeadlessEngine::new(64, 64);
        let inspector = engine.inspector();
        let entity = engine.create_entity();
        engine.add_entity(entity);
        engine.add_entity(entity);
        assert_eq!(inspector.snapshot().scene_count(entity), 2);
        engine.remove_entity(entity);
        assert!(!inspector.snapshot().in_scene(entity));
    }

    #[test]
    fn glb_animations_are_reported() {
        let mut engine = HeadlessEngine::new(64, 64);
        let bytes = glb_bytes(r#"{"asset":{"version":"2.0"},"animations":[{"name":"Walk"},{}]}"#);
        let loaded = engine.load_model(&model(ModelFormat::Glb, bytes)).unwrap();
        assert_eq!(loaded.animation_names, vec!["Walk", "animation_1"]);
        assert!(engine.inspector().snapshot().in_scene(loaded.root));
    }

    #[test]
    fn garbage_model_is_rejected() {
        let mut engine = HeadlessEngine::new(64, 64);
        assert!(engine
            .load_model(&model(ModelFormat::Glb, b"not a model".to_vec()))
            .is_err());
        assert!(engine
            .load_model(&model(ModelFormat::Gltf, b"{}".to_vec()))
            .is_err());
    }

    #[test]
    fn texture_pipeline_checks_kinds() {
        let mut engine = HeadlessEngine::new(64, 64);
        let image = HdrImage {
            width: 2,
            height: 1,
            pixels: vec![1.0; 6],
        };
        let equirect = engine.create_hdr_texture(&image).unwrap();
        assert!(engine.prefilter_specular(equirect).is_err());
        let cubemap = engine.equirect_to_cubemap(equirect).unwrap();
        let reflections = engine.prefilter_specular(cubemap).unwrap();
        let snapshot = engine.inspector().snapshot();
        assert_eq!(snapshot.textures[&reflections].kind, TextureKind::Reflections);
    }

    #[test]
    fn injected_prefilter_failures_run_out() {
        let mut engine = HeadlessEngine::new(64, 64).fail_prefilters(1);
        let image = HdrImage {
            width: 2,
            height: 1,
            pixels: vec![1.0; 6],
        };
        let equirect = engine.create_hdr_texture(&image).unwrap();
        let cubemap = engine.equirect_to_cubemap(equirect).unwrap();
        assert!(engine.prefilter_specular(cubemap).is_err());
        assert!(engine.prefilter_specular(cubemap).is_ok());
    }
}
