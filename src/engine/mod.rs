//! Rendering-engine collaborator boundary.
//!
//! Everything the scene managers need from Filament is expressed as the
//! [`Engine`] trait. An implementation is moved onto the engine strand at
//! startup and is only ever touched from that thread, so it needs `Send`
//! but never `Sync`.
//!
//! Handles are plain ids; ownership and destruction stay with the managers
//! that created them.

mod headless;

pub use headless::{
    CameraRecord, EngineInspector, EngineSnapshot, HeadlessEngine, ModelRecord, TextureKind,
    TextureRecord,
};
#[cfg(test)]
pub(crate) use headless::glb_bytes;

use crate::scene::MaterialRef;
use glam::{DVec2, Mat3, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndirectLightId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkyboxId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub left: i32,
    pub bottom: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            bottom: 0,
            width,
            height,
        }
    }

    /// Width over height, with zero dimensions clamped to one pixel.
    pub fn aspect(&self) -> f64 {
        f64::from(self.width.max(1)) / f64::from(self.height.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    Translucent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExposureSettings {
    /// Exposure set directly; aperture and shutter are left to the engine.
    Direct(f32),
    Manual {
        aperture: f32,
        shutter_speed: f32,
        sensitivity: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Perspective,
    Ortho,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FovDirection {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionSettings {
    Frustum {
        kind: ProjectionKind,
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
        near: f64,
        far: f64,
    },
    Fov {
        degrees: f64,
        aspect: f64,
        near: f64,
        far: f64,
        direction: FovDirection,
    },
    Lens {
        focal_length: f64,
        aspect: f64,
        near: f64,
        far: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Sun,
    Directional,
    Point,
    FocusedSpot,
    Spot,
}

impl LightType {
    pub fn is_spot(self) -> bool {
        matches!(self, Self::Spot | Self::FocusedSpot)
    }
}

/// Everything a light builder accepts. Absent fields keep engine defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct LightParams {
    pub light_type: LightType,
    pub color: Option<Vec3>,
    pub intensity: Option<f32>,
    pub position: Option<Vec3>,
    pub direction: Option<Vec3>,
    pub cast_light: Option<bool>,
    pub cast_shadows: Option<bool>,
    pub falloff: Option<f32>,
    pub spot_light_cone: Option<(f32, f32)>,
    pub sun_angular_radius: Option<f32>,
    pub sun_halo_size: Option<f32>,
    pub sun_halo_falloff: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IblSource {
    SphericalHarmonics {
        radiance: Vec<Vec3>,
        irradiance: Vec<Vec3>,
    },
    Reflections(TextureId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndirectLightParams {
    pub intensity: f32,
    pub source: IblSource,
    pub rotation: Option<Mat3>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkyboxParams {
    Color(Vec4),
    Environment { cubemap: TextureId, show_sun: bool },
}

/// Decoded equirectangular HDR image, tightly packed RGB32F.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Glb,
    Gltf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub name: String,
    pub format: ModelFormat,
    pub bytes: Vec<u8>,
    pub scale: f32,
    pub center_position: Option<Vec3>,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub root: Entity,
    pub animation_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundParams {
    pub center: Vec3,
    pub normal: Vec3,
    pub size: Vec3,
    pub is_below_model: bool,
    pub material: Option<MaterialRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Plane,
    Cube,
    Sphere,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeParams {
    pub kind: ShapeKind,
    pub center: Vec3,
    pub normal: Vec3,
    pub size: Vec3,
    pub scale: Vec3,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub double_sided: bool,
    pub material: Option<MaterialRef>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown entity {}", .0.id)]
    UnknownEntity(Entity),
    #[error("entity {} has no camera component", .0.id)]
    NoCamera(Entity),
    #[error("unknown texture {}", .0 .0)]
    UnknownTexture(TextureId),
    #[error("unknown indirect light {}", .0 .0)]
    UnknownIndirectLight(IndirectLightId),
    #[error("invalid texture data: {0}")]
    InvalidTexture(String),
    #[error("failed to parse model '{name}': {reason}")]
    ParseModel { name: String, reason: String },
    #[error("{0}")]
    Backend(String),
}

pub trait Engine: Send {
    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);
    fn set_post_processing_enabled(&mut self, enabled: bool);
    fn set_blend_mode(&mut self, mode: BlendMode);
    fn set_clear_enabled(&mut self, clear: bool);

    fn create_entity(&mut self) -> Entity;
    fn destroy_entity(&mut self, entity: Entity);
    /// Adds `entity` to the scene. Adding twice registers it twice.
    fn add_entity(&mut self, entity: Entity);
    /// Removes every registration of `entity` from the scene.
    fn remove_entity(&mut self, entity: Entity);

    fn create_camera(&mut self, entity: Entity) -> Result<(), EngineError>;
    fn destroy_camera(&mut self, entity: Entity);
    fn set_view_camera(&mut self, entity: Entity) -> Result<(), EngineError>;
    fn set_exposure(&mut self, camera: Entity, exposure: ExposureSettings) -> Result<(), EngineError>;
    fn set_projection(
        &mut self,
        camera: Entity,
        projection: ProjectionSettings,
    ) -> Result<(), EngineError>;
    fn set_shift(&mut self, camera: Entity, shift: DVec2) -> Result<(), EngineError>;
    fn set_scaling(&mut self, camera: Entity, scaling: DVec2) -> Result<(), EngineError>;
    fn look_at(&mut self, camera: Entity, eye: Vec3, center: Vec3, up: Vec3) -> Result<(), EngineError>;

    fn build_light(&mut self, entity: Entity, params: &LightParams) -> Result<(), EngineError>;

    fn create_hdr_texture(&mut self, image: &HdrImage) -> Result<TextureId, EngineError>;
    fn equirect_to_cubemap(&mut self, equirect: TextureId) -> Result<TextureId, EngineError>;
    fn prefilter_specular(&mut self, cubemap: TextureId) -> Result<TextureId, EngineError>;
    fn destroy_texture(&mut self, texture: TextureId);

    fn create_indirect_light(
        &mut self,
        params: &IndirectLightParams,
    ) -> Result<IndirectLightId, EngineError>;
    fn set_indirect_light_intensity(
        &mut self,
        light: IndirectLightId,
        intensity: f32,
    ) -> Result<(), EngineError>;
    fn set_indirect_light(&mut self, light: Option<IndirectLightId>);
    fn destroy_indirect_light(&mut self, light: IndirectLightId);

    fn create_skybox(&mut self, params: &SkyboxParams) -> Result<SkyboxId, EngineError>;
    fn set_skybox(&mut self, skybox: Option<SkyboxId>);
    fn destroy_skybox(&mut self, skybox: SkyboxId);

    fn load_model(&mut self, model: &ModelData) -> Result<LoadedModel, EngineError>;
    fn create_ground(&mut self, params: &GroundParams) -> Result<Entity, EngineError>;
    fn create_shape(&mut self, params: &ShapeParams) -> Result<Entity, EngineError>;
}
