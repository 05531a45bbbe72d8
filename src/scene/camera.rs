use crate::engine::{ExposureSettings, FovDirection, ProjectionKind, ProjectionSettings};
use crate::error::SceneError;
use crate::value::{
    bool_of, dvec2_of, enum_of, f32_of, f64_of, map_of, set, u32_of, vec3_of, vec4_of, visit,
    FieldError, ValueMap,
};
use glam::{DVec2, Vec2, Vec3, Vec4};

pub const DEFAULT_APERTURE: f32 = 16.0;
pub const DEFAULT_SHUTTER_SPEED: f32 = 1.0 / 125.0;
pub const DEFAULT_SENSITIVITY: f32 = 100.0;
pub const DEFAULT_NEAR_PLANE: f64 = 0.05;
pub const DEFAULT_FAR_PLANE: f64 = 1000.0;
pub const DEFAULT_FOCAL_LENGTH: f64 = 28.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManipulatorMode {
    #[default]
    Orbit,
    Map,
    FreeFlight,
}

impl ManipulatorMode {
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "ORBIT" => Some(Self::Orbit),
            "MAP" => Some(Self::Map),
            "FREE_FLIGHT" => Some(Self::FreeFlight),
            _ => None,
        }
    }
}

impl ProjectionKind {
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "PERSPECTIVE" => Some(Self::Perspective),
            "ORTHO" => Some(Self::Ortho),
            _ => None,
        }
    }
}

impl FovDirection {
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "VERTICAL" => Some(Self::Vertical),
            "HORIZONTAL" => Some(Self::Horizontal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exposure {
    pub exposure: Option<f32>,
    pub aperture: Option<f32>,
    pub shutter_speed: Option<f32>,
    pub sensitivity: Option<f32>,
}

impl Exposure {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        visit("Exposure", map, |key, value| match key {
            "exposure" => set(&mut out.exposure, f32_of(value)),
            "aperture" => set(&mut out.aperture, f32_of(value)),
            "shutterSpeed" => set(&mut out.shutter_speed, f32_of(value)),
            "sensitivity" => set(&mut out.sensitivity, f32_of(value)),
            _ => Err(FieldError::Unknown),
        });
        out
    }

    /// A direct exposure value wins; otherwise absent components take the named defaults.
    pub fn resolve(&self) -> ExposureSettings {
        if let Some(exposure) = self.exposure {
            return ExposureSettings::Direct(exposure);
        }
        ExposureSettings::Manual {
            aperture: self.aperture.unwrap_or(DEFAULT_APERTURE),
            shutter_speed: self.shutter_speed.unwrap_or(DEFAULT_SHUTTER_SPEED),
            sensitivity: self.sensitivity.unwrap_or(DEFAULT_SENSITIVITY),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub projection: Option<ProjectionKind>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub top: Option<f64>,
    pub near: Option<f64>,
    pub far: Option<f64>,
    pub fov_in_degrees: Option<f64>,
    pub fov_direction: Option<FovDirection>,
    pub aspect: Option<f64>,
}

impl Projection {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        visit("Projection", map, |key, value| match key {
            "projection" => set(
                &mut out.projection,
                enum_of(value, ProjectionKind::from_text, "PERSPECTIVE or ORTHO"),
            ),
            "left" => set(&mut out.left, f64_of(value)),
            "right" => set(&mut out.right, f64_of(value)),
            "bottom" => set(&mut out.bottom, f64_of(value)),
            "top" => set(&mut out.top, f64_of(value)),
            "near" => set(&mut out.near, f64_of(value)),
            "far" => set(&mut out.far, f64_of(value)),
            "fovInDegrees" => set(&mut out.fov_in_degrees, f64_of(value)),
            "fovDirection" => set(
                &mut out.fov_direction,
                enum_of(value, FovDirection::from_text, "VERTICAL or HORIZONTAL"),
            ),
            "aspect" => set(&mut out.aspect, f64_of(value)),
            _ => Err(FieldError::Unknown),
        });
        out
    }

    fn has_frustum_data(&self) -> bool {
        [self.left, self.right, self.bottom, self.top]
            .iter()
            .any(Option::is_some)
    }

    /// Picks the frustum form when all six bounds are present, else the
    /// field-of-view form when degrees and direction are present.
    pub fn resolve(&self, viewport_aspect: f64) -> Result<ProjectionSettings, SceneError> {
        if let (Some(left), Some(right), Some(bottom), Some(top), Some(near), Some(far)) = (
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        ) {
            return Ok(ProjectionSettings::Frustum {
                kind: self.projection.unwrap_or(ProjectionKind::Perspective),
                left,
                right,
                bottom,
                top,
                near,
                far,
            });
        }
        if self.has_frustum_data() {
            log::warn!("Projection has partial frustum bounds; ignoring them");
        }
        if let (Some(degrees), Some(direction)) = (self.fov_in_degrees, self.fov_direction) {
            return Ok(ProjectionSettings::Fov {
                degrees,
                aspect: self.aspect.unwrap_or(viewport_aspect),
                near: self.near.unwrap_or(DEFAULT_NEAR_PLANE),
                far: self.far.unwrap_or(DEFAULT_FAR_PLANE),
                direction,
            });
        }
        Err(SceneError::MustBeProvided("Projection info"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LensProjection {
    pub focal_length: Option<f64>,
    pub aspect: Option<f64>,
    pub near: Option<f64>,
    pub far: Option<f64>,
}

impl LensProjection {
    pub fn new(focal_length: f64, aspect: f64) -> Self {
        Self {
            focal_length: Some(focal_length),
            aspect: Some(aspect),
            near: None,
            far: None,
        }
    }

    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        visit("LensProjection", map, |key, value| match key {
            "focalLength" => set(&mut out.focal_length, f64_of(value)),
            "aspect" => set(&mut out.aspect, f64_of(value)),
            "near" => set(&mut out.near, f64_of(value)),
            "far" => set(&mut out.far, f64_of(value)),
            _ => Err(FieldError::Unknown),
        });
        out
    }

    pub fn resolve(&self, viewport_aspect: f64) -> Result<ProjectionSettings, SceneError> {
        let focal_length = self
            .focal_length
            .ok_or(SceneError::MustBeProvided("Lens projection info"))?;
        Ok(ProjectionSettings::Lens {
            focal_length,
            aspect: self.aspect.unwrap_or(viewport_aspect),
            near: self.near.unwrap_or(DEFAULT_NEAR_PLANE),
            far: self.far.unwrap_or(DEFAULT_FAR_PLANE),
        })
    }
}

/// Declarative camera: optional lens settings plus manipulator parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub exposure: Option<Exposure>,
    pub projection: Option<Projection>,
    pub lens_projection: Option<LensProjection>,
    pub shift: Option<DVec2>,
    pub scaling: Option<DVec2>,
    pub mode: Option<ManipulatorMode>,
    pub target_position: Option<Vec3>,
    pub up_vector: Option<Vec3>,
    pub zoom_speed: Option<f32>,
    pub orbit_home_position: Option<Vec3>,
    pub orbit_speed: Option<Vec2>,
    pub fov_direction: Option<FovDirection>,
    pub fov_degrees: Option<f32>,
    pub far_plane: Option<f32>,
    pub map_extent: Option<Vec2>,
    pub map_min_distance: Option<f32>,
    pub flight_start_position: Option<Vec3>,
    /// Pitch then yaw, in radians.
    pub flight_start_orientation: Option<Vec2>,
    pub flight_move_damping: Option<f32>,
    pub flight_speed_steps: Option<u32>,
    pub flight_max_move_speed: Option<f32>,
    pub ground_plane: Option<Vec4>,
}

fn vec2_of(value: &serde_json::Value) -> Result<Vec2, FieldError> {
    dvec2_of(value).map(|v| v.as_vec2())
}

impl Camera {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        visit("Camera", map, |key, value| match key {
            "exposure" => set(&mut out.exposure, map_of(value).map(Exposure::deserialize)),
            "projection" => set(&mut out.projection, map_of(value).map(Projection::deserialize)),
            "lensProjection" => set(
                &mut out.lens_projection,
                map_of(value).map(LensProjection::deserialize),
            ),
            "shift" => set(&mut out.shift, dvec2_of(value)),
            "scaling" => set(&mut out.scaling, dvec2_of(value)),
            "mode" => set(
                &mut out.mode,
                enum_of(value, ManipulatorMode::from_text, "ORBIT, MAP or FREE_FLIGHT"),
            ),
            "targetPosition" => set(&mut out.target_position, vec3_of(value)),
            "upVector" => set(&mut out.up_vector, vec3_of(value)),
            "zoomSpeed" => set(&mut out.zoom_speed, f32_of(value)),
            "orbitHomePosition" => set(&mut out.orbit_home_position, vec3_of(value)),
            "orbitSpeed" => set(&mut out.orbit_speed, vec2_of(value)),
            "fovDirection" => set(
                &mut out.fov_direction,
                enum_of(value, FovDirection::from_text, "VERTICAL or HORIZONTAL"),
            ),
            "fovDegrees" => set(&mut out.fov_degrees, f32_of(value)),
            "farPlane" => set(&mut out.far_plane, f32_of(value)),
            "mapExtent" => set(&mut out.map_extent, vec2_of(value)),
            "mapMinDistance" => set(&mut out.map_min_distance, f32_of(value)),
            "flightStartPosition" => set(&mut out.flight_start_position, vec3_of(value)),
            "flightStartOrientation" => set(&mut out.flight_start_orientation, vec2_of(value)),
            "flightMoveDamping" => set(&mut out.flight_move_damping, f32_of(value)),
            "flightSpeedSteps" => set(&mut out.flight_speed_steps, u32_of(value)),
            "flightMaxMoveSpeed" => set(&mut out.flight_max_move_speed, f32_of(value)),
            "groundPlane" => set(&mut out.ground_plane, vec4_of(value)),
            // Auto-orbit and other per-frame camera features are not driven from here.
            "isPrimary" | "autoOrbit" => bool_of(value).map(|_| ()),
            _ => Err(FieldError::Unknown),
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera, Exposure, LensProjection, ManipulatorMode, Projection};
    use crate::engine::{ExposureSettings, FovDirection, ProjectionKind, ProjectionSettings};
    use crate::error::ErrorKind;
    use glam::{DVec2, Vec3};
    use serde_json::json;

    fn projection(value: serde_json::Value) -> Projection {
        Projection::deserialize(value.as_object().unwrap())
    }

    #[test]
    fn exposure_fills_missing_components() {
        let only_iso = Exposure {
            sensitivity: Some(50.0),
            ..Exposure::default()
        };
        assert_eq!(
            only_iso.resolve(),
            ExposureSettings::Manual {
                aperture: 16.0,
                shutter_speed: 1.0 / 125.0,
                sensitivity: 50.0,
            }
        );
        let direct = Exposure {
            exposure: Some(1.5),
            aperture: Some(2.0),
            shutter_speed: Some(0.5),
            sensitivity: Some(800.0),
        };
        assert_eq!(direct.resolve(), ExposureSettings::Direct(1.5));
    }

    #[test]
    fn full_frustum_resolves_with_perspective_default() {
        let full = projection(json!({
            "left": -1.0, "right": 1.0, "bottom": -1.0, "top": 1.0, "near": 0.1, "far": 10.0
        }));
        match full.resolve(2.0).unwrap() {
            ProjectionSettings::Frustum { kind, near, far, .. } => {
                assert_eq!(kind, ProjectionKind::Perspective);
                assert_eq!((near, far), (0.1, 10.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn every_proper_frustum_subset_is_rejected() {
        let keys = ["left", "right", "bottom", "top", "near", "far"];
        for mask in 0u32..(1 << keys.len()) - 1 {
            let mut map = serde_json::Map::new();
            for (bit, key) in keys.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    map.insert(key.to_string(), json!(1.0));
                }
            }
            let err = Projection::deserialize(&map).resolve(1.0).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedInput, "mask {mask:b}");
            assert_eq!(err.to_string(), "Projection info must be provided");
        }
    }

    #[test]
    fn fov_form_uses_viewport_aspect_and_default_planes() {
        let fov = projection(json!({"fovInDegrees": 45.0, "fovDirection": "HORIZONTAL"}));
        assert_eq!(
            fov.resolve(1.5).unwrap(),
            ProjectionSettings::Fov {
                degrees: 45.0,
                aspect: 1.5,
                near: 0.05,
                far: 1000.0,
                direction: FovDirection::Horizontal,
            }
        );
    }

    #[test]
    fn lens_requires_focal_length() {
        assert!(LensProjection::default().resolve(1.0).is_err());
        assert_eq!(
            LensProjection::new(35.0, 2.0).resolve(1.0).unwrap(),
            ProjectionSettings::Lens {
                focal_length: 35.0,
                aspect: 2.0,
                near: 0.05,
                far: 1000.0,
            }
        );
    }

    #[test]
    fn camera_parses_nested_objects_and_skips_bad_keys() {
        let map = json!({
            "exposure": {"aperture": 2.8},
            "projection": "wide",
            "shift": [0.1, 0.2],
            "mode": "FREE_FLIGHT",
            "targetPosition": {"x": 1.0, "y": 2.0, "z": 3.0},
            "flightSpeedSteps": 40,
            "unknownKey": 3
        });
        let camera = Camera::deserialize(map.as_object().unwrap());
        assert_eq!(camera.exposure.unwrap().aperture, Some(2.8));
        assert!(camera.projection.is_none());
        assert_eq!(camera.shift, Some(DVec2::new(0.1, 0.2)));
        assert_eq!(camera.mode, Some(ManipulatorMode::FreeFlight));
        assert_eq!(camera.target_position, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(camera.flight_speed_steps, Some(40));
    }
}
