use crate::color::{cct, color_of};
use crate::engine::{LightParams, LightType};
use crate::error::SceneError;
use crate::value::{bool_of, enum_of, f32_of, set, string_of, vec3_of, visit, FieldError, ValueMap};
use glam::Vec3;

pub const DEFAULT_LIGHT_TEMPERATURE: f32 = 6_500.0;
pub const DEFAULT_LIGHT_INTENSITY: f32 = 100_000.0;
pub const DEFAULT_LIGHT_DIRECTION: Vec3 = Vec3::new(0.0, -1.0, 0.0);

impl LightType {
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "SUN" => Some(Self::Sun),
            "DIRECTIONAL" => Some(Self::Directional),
            "POINT" => Some(Self::Point),
            "FOCUSED_SPOT" => Some(Self::FocusedSpot),
            "SPOT" => Some(Self::Spot),
            _ => None,
        }
    }

    pub fn as_text(self) -> &'static str {
        match self {
            Self::Sun => "SUN",
            Self::Directional => "DIRECTIONAL",
            Self::Point => "POINT",
            Self::FocusedSpot => "FOCUSED_SPOT",
            Self::Spot => "SPOT",
        }
    }
}

/// Declarative light. [`Light::default`] is the scene's fallback sun-like light.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub color: Option<String>,
    pub color_temperature: Option<f32>,
    pub intensity: Option<f32>,
    pub position: Option<Vec3>,
    pub direction: Option<Vec3>,
    pub cast_light: Option<bool>,
    pub cast_shadows: Option<bool>,
    pub falloff_radius: Option<f32>,
    pub spot_light_cone_inner: Option<f32>,
    pub spot_light_cone_outer: Option<f32>,
    pub sun_angular_radius: Option<f32>,
    pub sun_halo_size: Option<f32>,
    pub sun_halo_falloff: Option<f32>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            color_temperature: Some(DEFAULT_LIGHT_TEMPERATURE),
            intensity: Some(DEFAULT_LIGHT_INTENSITY),
            direction: Some(DEFAULT_LIGHT_DIRECTION),
            cast_shadows: Some(true),
            ..Self::new(LightType::Directional)
        }
    }
}

impl Light {
    /// A light of `light_type` with every property left to the engine.
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            color: None,
            color_temperature: None,
            intensity: None,
            position: None,
            direction: None,
            cast_light: None,
            cast_shadows: None,
            falloff_radius: None,
            spot_light_cone_inner: None,
            spot_light_cone_outer: None,
            sun_angular_radius: None,
            sun_halo_size: None,
            sun_halo_falloff: None,
        }
    }

    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::new(LightType::Directional);
        let mut light_type = None;
        visit("Light", map, |key, value| match key {
            "type" => set(
                &mut light_type,
                enum_of(value, LightType::from_text, "SUN, DIRECTIONAL, POINT, FOCUSED_SPOT or SPOT"),
            ),
            "color" => set(&mut out.color, string_of(value)),
            "colorTemperature" => set(&mut out.color_temperature, f32_of(value)),
            "intensity" => set(&mut out.intensity, f32_of(value)),
            "position" => set(&mut out.position, vec3_of(value)),
            "direction" => set(&mut out.direction, vec3_of(value)),
            "castLight" => set(&mut out.cast_light, bool_of(value)),
            "castShadows" => set(&mut out.cast_shadows, bool_of(value)),
            "falloffRadius" => set(&mut out.falloff_radius, f32_of(value)),
            "spotLightConeInner" => set(&mut out.spot_light_cone_inner, f32_of(value)),
            "spotLightConeOuter" => set(&mut out.spot_light_cone_outer, f32_of(value)),
            "sunAngularRadius" => set(&mut out.sun_angular_radius, f32_of(value)),
            "sunHaloSize" => set(&mut out.sun_halo_size, f32_of(value)),
            "sunHaloFalloff" => set(&mut out.sun_halo_falloff, f32_of(value)),
            _ => Err(FieldError::Unknown),
        });
        if let Some(light_type) = light_type {
            out.light_type = light_type;
        }
        out
    }

    pub fn change_color(&mut self, color: impl Into<String>) {
        self.color = Some(color.into());
    }

    pub fn change_intensity(&mut self, intensity: f32) {
        self.intensity = Some(intensity);
    }

    /// Explicit colour text wins over colour temperature; neither means engine default.
    pub fn resolved_color(&self) -> Result<Option<Vec3>, SceneError> {
        if let Some(text) = &self.color {
            return color_of(text).map(|rgba| Some(rgba.truncate()));
        }
        Ok(self.color_temperature.map(cct))
    }

    pub fn has_zero_spot_direction(&self) -> bool {
        self.light_type.is_spot() && self.direction == Some(Vec3::ZERO)
    }

    pub fn to_params(&self) -> Result<LightParams, SceneError> {
        let spot_light_cone = match (self.spot_light_cone_inner, self.spot_light_cone_outer) {
            (Some(inner), Some(outer)) => Some((inner, outer)),
            (None, None) => None,
            _ => {
                log::warn!("Spot light cone needs both inner and outer angles; ignoring it");
                None
            }
        };
        Ok(LightParams {
            light_type: self.light_type,
            color: self.resolved_color()?,
            intensity: self.intensity,
            position: self.position,
            direction: self.direction,
            cast_light: self.cast_light,
            cast_shadows: self.cast_shadows,
            falloff: self.falloff_radius,
            spot_light_cone,
            sun_angular_radius: self.sun_angular_radius,
            sun_halo_size: self.sun_halo_size,
            sun_halo_falloff: self.sun_halo_falloff,
        })
    }

    pub fn log(&self, tag: &str) {
        log::debug!(
            "{tag} (Light) type={} color={:?} temperature={:?} intensity={:?} position={:?} direction={:?}",
            self.light_type.as_text(),
            self.color,
            self.color_temperature,
            self.intensity,
            self.position,
            self.direction
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Light, DEFAULT_LIGHT_INTENSITY};
    use crate::engine::LightType;
    use glam::Vec3;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Light {
        Light::deserialize(value.as_object().unwrap())
    }

    #[test]
    fn wrong_shaped_value_matches_absent_key() {
        let with_bad = parse(json!({
            "type": "POINT", "intensity": "oops", "color": "#FFFFFF", "position": [1, 2, 3]
        }));
        let without = parse(json!({"type": "POINT", "color": "#FFFFFF", "position": [1, 2, 3]}));
        assert_eq!(with_bad, without);
        assert_eq!(with_bad.light_type, LightType::Point);
        assert_eq!(with_bad.position, Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn parsing_is_repeatable() {
        let value = json!({"type": "SUN", "sunHaloSize": 10.0, "castShadows": true});
        assert_eq!(parse(value.clone()), parse(value));
    }

    #[test]
    fn unknown_type_keeps_directional() {
        assert_eq!(parse(json!({"type": "AREA"})).light_type, LightType::Directional);
    }

    #[test]
    fn color_text_overrides_temperature() {
        let mut light = Light::default();
        let from_temperature = light.resolved_color().unwrap().unwrap();
        assert!(from_temperature.min_element() > 0.8);
        light.change_color("#FF0000");
        assert_eq!(light.resolved_color().unwrap(), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(Light::new(LightType::Point).resolved_color().unwrap(), None);
    }

    #[test]
    fn params_keep_halo_falloff_separate_from_size() {
        let mut light = Light::new(LightType::Sun);
        light.sun_halo_size = Some(10.0);
        light.sun_halo_falloff = Some(80.0);
        let params = light.to_params().unwrap();
        assert_eq!(params.sun_halo_size, Some(10.0));
        assert_eq!(params.sun_halo_falloff, Some(80.0));
    }

    #[test]
    fn default_light_values() {
        let light = Light::default();
        assert_eq!(light.light_type, LightType::Directional);
        assert_eq!(light.intensity, Some(DEFAULT_LIGHT_INTENSITY));
        assert_eq!(light.direction, Some(Vec3::new(0.0, -1.0, 0.0)));
        assert_eq!(light.cast_shadows, Some(true));
        assert!(!light.has_zero_spot_direction());
        let mut spot = Light::new(LightType::Spot);
        spot.direction = Some(Vec3::ZERO);
        assert!(spot.has_zero_spot_direction());
    }

    #[test]
    fn invalid_color_text_fails_params() {
        let mut light = Light::new(LightType::Point);
        light.change_color("teal");
        assert!(light.to_params().is_err());
        light.change_intensity(5.0);
        assert_eq!(light.intensity, Some(5.0));
    }
}
