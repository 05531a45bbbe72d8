use crate::value::{
    bool_of, f32_list_of, f32_of, i64_of, list_of, set, string_of, vec3_of, visit, Field,
    FieldError, ValueMap,
};
use glam::{Mat3, Vec3};
use serde_json::Value;

pub const DEFAULT_INDIRECT_LIGHT_INTENSITY: f32 = 30_000.0;

/// Where a model or environment file comes from. Asset paths are relative
/// to the viewer's asset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Asset(String),
    Url(String),
}

impl AssetSource {
    /// Asset path wins over URL; empty strings count as absent.
    pub(crate) fn pick(asset_path: Option<String>, url: Option<String>) -> Option<Self> {
        match (asset_path.filter(|p| !p.is_empty()), url.filter(|u| !u.is_empty())) {
            (Some(path), _) => Some(Self::Asset(path)),
            (None, Some(url)) => Some(Self::Url(url)),
            (None, None) => None,
        }
    }

    pub fn describe(&self) -> &str {
        match self {
            Self::Asset(path) => path,
            Self::Url(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Skybox {
    Color(String),
    Ktx(AssetSource),
    Hdr {
        source: AssetSource,
        show_sun: bool,
    },
}

impl Skybox {
    pub fn deserialize(map: &ValueMap) -> Option<Self> {
        let mut skybox_type = None;
        let mut asset_path = None;
        let mut url = None;
        let mut color = None;
        let mut show_sun = None;
        visit("Skybox", map, |key, value| match key {
            "skyboxType" => set(&mut skybox_type, i64_of(value)),
            "assetPath" => set(&mut asset_path, string_of(value)),
            "url" => set(&mut url, string_of(value)),
            "color" => set(&mut color, string_of(value)),
            "showSun" => set(&mut show_sun, bool_of(value)),
            _ => Err(FieldError::Unknown),
        });

        let skybox = match skybox_type {
            Some(1) => AssetSource::pick(asset_path, url).map(Self::Ktx),
            Some(2) => AssetSource::pick(asset_path, url).map(|source| Self::Hdr {
                source,
                show_sun: show_sun.unwrap_or(false),
            }),
            Some(3) => color.filter(|c| !c.is_empty()).map(Self::Color),
            Some(other) => {
                log::warn!("Unknown skyboxType {other}");
                return None;
            }
            None => {
                log::warn!("Skybox without skyboxType");
                return None;
            }
        };
        if skybox.is_none() {
            log::warn!("Skybox has no usable source; using the default skybox");
        }
        skybox
    }

    /// True when both are HDR environments loaded from the same asset path or URL.
    pub fn shares_source_with(&self, light: &IndirectLight) -> bool {
        match (self, light) {
            (Self::Hdr { source, .. }, IndirectLight::Hdr { source: other, .. }) => source == other,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultIndirectLight {
    pub intensity: f32,
    pub radiance: Vec<Vec3>,
    pub irradiance: Vec<Vec3>,
    pub rotation: Option<Mat3>,
}

impl Default for DefaultIndirectLight {
    fn default() -> Self {
        Self {
            intensity: DEFAULT_INDIRECT_LIGHT_INTENSITY,
            radiance: vec![Vec3::ONE],
            irradiance: vec![Vec3::ONE],
            rotation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndirectLight {
    Default(DefaultIndirectLight),
    Ktx {
        source: AssetSource,
        intensity: f32,
    },
    Hdr {
        source: AssetSource,
        intensity: f32,
    },
}

impl Default for IndirectLight {
    fn default() -> Self {
        Self::Default(DefaultIndirectLight::default())
    }
}

/// Spherical-harmonics coefficients: flat numbers grouped in RGB triples, or a list of 3-vectors.
fn coefficients_of(value: &Value) -> Field<Vec<Vec3>> {
    const EXPECTED: &str = "RGB coefficient list";
    let list = list_of(value)?;
    if list.iter().all(Value::is_number) {
        let flat = f32_list_of(value)?;
        if flat.is_empty() || flat.len() % 3 != 0 {
            return Err(FieldError::Expected(EXPECTED));
        }
        return Ok(flat.chunks_exact(3).map(Vec3::from_slice).collect());
    }
    list.iter()
        .map(|item| vec3_of(item).map_err(|_| FieldError::Expected(EXPECTED)))
        .collect()
}

fn rotation_of(value: &Value) -> Field<Mat3> {
    let values = f32_list_of(value)?;
    let cols: [f32; 9] = values
        .try_into()
        .map_err(|_| FieldError::Expected("list of 9 numbers"))?;
    Ok(Mat3::from_cols_array(&cols))
}

impl IndirectLight {
    pub fn deserialize(map: &ValueMap) -> Option<Self> {
        let mut light_type = None;
        let mut asset_path = None;
        let mut url = None;
        let mut intensity = None;
        let mut radiance = None;
        let mut irradiance = None;
        let mut rotation = None;
        visit("IndirectLight", map, |key, value| match key {
            "lightType" => set(&mut light_type, i64_of(value)),
            "assetPath" => set(&mut asset_path, string_of(value)),
            "url" => set(&mut url, string_of(value)),
            "intensity" => set(&mut intensity, f32_of(value)),
            "radiance" => set(&mut radiance, coefficients_of(value)),
            "irradiance" => set(&mut irradiance, coefficients_of(value)),
            "rotation" => set(&mut rotation, rotation_of(value)),
            _ => Err(FieldError::Unknown),
        });
        let intensity = intensity.unwrap_or(DEFAULT_INDIRECT_LIGHT_INTENSITY);

        let light = match light_type {
            Some(1) => AssetSource::pick(asset_path, url)
                .map(|source| Self::Ktx { source, intensity }),
            Some(2) => AssetSource::pick(asset_path, url)
                .map(|source| Self::Hdr { source, intensity }),
            Some(3) | None => {
                let defaults = DefaultIndirectLight::default();
                Some(Self::Default(DefaultIndirectLight {
                    intensity,
                    radiance: radiance.unwrap_or(defaults.radiance),
                    irradiance: irradiance.unwrap_or(defaults.irradiance),
                    rotation,
                }))
            }
            Some(other) => {
                log::warn!("Unknown indirect lightType {other}");
                return None;
            }
        };
        if light.is_none() {
            log::warn!("Indirect light has no usable source; using the default indirect light");
        }
        light
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Self::Default(light) => light.intensity,
            Self::Ktx { intensity, .. } | Self::Hdr { intensity, .. } => *intensity,
        }
    }

    pub fn set_intensity(&mut self, value: f32) {
        match self {
            Self::Default(light) => light.intensity = value,
            Self::Ktx { intensity, .. } | Self::Hdr { intensity, .. } => *intensity = value,
        }
    }

    pub fn source(&self) -> Option<&AssetSource> {
        match self {
            Self::Default(_) => None,
            Self::Ktx { source, .. } | Self::Hdr { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetSource, IndirectLight, Skybox, DEFAULT_INDIRECT_LIGHT_INTENSITY};
    use glam::{Mat3, Vec3};
    use serde_json::json;

    fn skybox(value: serde_json::Value) -> Option<Skybox> {
        Skybox::deserialize(value.as_object().unwrap())
    }

    fn light(value: serde_json::Value) -> Option<IndirectLight> {
        IndirectLight::deserialize(value.as_object().unwrap())
    }

    #[test]
    fn skybox_variants() {
        assert_eq!(
            skybox(json!({"skyboxType": 3, "color": "#112233"})),
            Some(Skybox::Color("#112233".to_string()))
        );
        assert_eq!(
            skybox(json!({"skyboxType": 2, "assetPath": "env.hdr", "url": "http://x", "showSun": true})),
            Some(Skybox::Hdr {
                source: AssetSource::Asset("env.hdr".to_string()),
                show_sun: true,
            })
        );
        assert_eq!(
            skybox(json!({"skyboxType": 1, "url": "http://host/sky.ktx"})),
            Some(Skybox::Ktx(AssetSource::Url("http://host/sky.ktx".to_string())))
        );
        assert_eq!(skybox(json!({"skyboxType": 2, "assetPath": ""})), None);
        assert_eq!(skybox(json!({"color": "#112233"})), None);
    }

    #[test]
    fn same_hdr_path_couples_skybox_and_light() {
        let sky = skybox(json!({"skyboxType": 2, "assetPath": "envs/lobby.hdr"})).unwrap();
        let same = light(json!({"lightType": 2, "assetPath": "envs/lobby.hdr"})).unwrap();
        let other = light(json!({"lightType": 2, "assetPath": "envs/park.hdr"})).unwrap();
        let by_url = light(json!({"lightType": 2, "url": "envs/lobby.hdr"})).unwrap();
        assert!(sky.shares_source_with(&same));
        assert!(!sky.shares_source_with(&other));
        assert!(!sky.shares_source_with(&by_url));
        assert!(!sky.shares_source_with(&IndirectLight::default()));
    }

    #[test]
    fn default_light_groups_coefficients() {
        let parsed = light(json!({
            "lightType": 3,
            "intensity": 12000,
            "irradiance": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            "radiance": [[1, 1, 1]],
            "rotation": [1, 0, 0, 0, 1, 0, 0, 0, 1]
        }))
        .unwrap();
        match parsed {
            IndirectLight::Default(light) => {
                assert_eq!(light.intensity, 12000.0);
                assert_eq!(light.irradiance.len(), 2);
                assert_eq!(light.irradiance[1], Vec3::new(0.4, 0.5, 0.6));
                assert_eq!(light.radiance, vec![Vec3::ONE]);
                assert_eq!(light.rotation, Some(Mat3::IDENTITY));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_coefficients_keep_defaults() {
        let parsed = light(json!({"irradiance": [0.1, 0.2]})).unwrap();
        assert_eq!(parsed, IndirectLight::default());
        assert_eq!(parsed.intensity(), DEFAULT_INDIRECT_LIGHT_INTENSITY);
    }

    #[test]
    fn intensity_is_mutable_for_every_variant() {
        let mut hdr = light(json!({"lightType": 2, "assetPath": "a.hdr", "intensity": 5})).unwrap();
        hdr.set_intensity(9.0);
        assert_eq!(hdr.intensity(), 9.0);
        assert_eq!(hdr.source(), Some(&AssetSource::Asset("a.hdr".to_string())));
        assert_eq!(light(json!({"lightType": 1})), None);
    }
}
