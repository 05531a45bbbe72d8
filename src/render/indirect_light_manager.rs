use super::ibl::IblPrefilter;
use crate::engine::{Engine, IblSource, IndirectLightId, IndirectLightParams, TextureId};
use crate::error::{Outcome, SceneError};
use crate::scene::{AssetSource, DefaultIndirectLight, IndirectLight};
use crate::state::{lock, LoadState, SceneStates};
use crate::strand::{Completion, Strand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Installed {
    light: Option<IndirectLightId>,
    reflections: Option<TextureId>,
}

/// The scene's single live indirect light.
///
/// Shared with the skybox manager so an HDR skybox can install the light
/// from its own cube map. Every method runs on the strand.
#[derive(Default)]
pub struct IndirectLightSlot {
    installed: Mutex<Installed>,
}

impl IndirectLightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<IndirectLightId> {
        lock(&self.installed).light
    }

    /// Destroys the previous light and its reflections, then binds `light`.
    pub fn swap(
        &self,
        engine: &mut dyn Engine,
        light: IndirectLightId,
        reflections: Option<TextureId>,
    ) {
        let mut installed = lock(&self.installed);
        if let Some(old) = installed.light.take() {
            engine.destroy_indirect_light(old);
        }
        if let Some(old) = installed.reflections.take() {
            engine.destroy_texture(old);
        }
        engine.set_indirect_light(Some(light));
        *installed = Installed {
            light: Some(light),
            reflections,
        };
    }

    /// Prefilters `cubemap` into reflections and installs a light over them.
    /// The cube map itself stays with the caller.
    pub fn install_from_cubemap(
        &self,
        engine: &mut dyn Engine,
        prefilter: &IblPrefilter,
        cubemap: TextureId,
        intensity: f32,
    ) -> Result<(), SceneError> {
        let reflections = prefilter.light_reflections(engine, cubemap)?;
        let params = IndirectLightParams {
            intensity,
            source: IblSource::Reflections(reflections),
            rotation: None,
        };
        match engine.create_indirect_light(&params) {
            Ok(light) => {
                self.swap(engine, light, Some(reflections));
                Ok(())
            }
            Err(e) => {
                engine.destroy_texture(reflections);
                Err(e.into())
            }
        }
    }
}

/// Records the outcome of a light load in `states.light`.
pub(crate) fn finish_light(states: &SceneStates, result: Result<(), SceneError>, success: &str) -> Outcome {
    match result {
        Ok(()) => {
            states.light.set(LoadState::Loaded);
            log::info!("{success}");
            Ok(success.to_string())
        }
        Err(e) => {
            states.light.set(LoadState::Error);
            log::error!("Indirect light failed: {e}");
            Err(e)
        }
    }
}

/// Resolves `path` under `assets_path`, rejecting empty and missing paths.
pub(crate) fn asset_file(assets_path: &Path, path: &str) -> Result<PathBuf, SceneError> {
    if path.is_empty() {
        return Err(SceneError::InvalidAssetPath(PathBuf::new()));
    }
    let full = assets_path.join(path);
    if !full.is_file() {
        return Err(SceneError::InvalidAssetPath(full));
    }
    Ok(full)
}

pub struct IndirectLightManager {
    strand: Arc<Strand>,
    prefilter: Arc<IblPrefilter>,
    slot: Arc<IndirectLightSlot>,
    states: Arc<SceneStates>,
    assets_path: PathBuf,
}

impl IndirectLightManager {
    pub fn new(
        strand: Arc<Strand>,
        prefilter: Arc<IblPrefilter>,
        slot: Arc<IndirectLightSlot>,
        states: Arc<SceneStates>,
        assets_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strand,
            prefilter,
            slot,
            states,
            assets_path: assets_path.into(),
        }
    }

    fn fail(&self, error: SceneError) -> Completion<Outcome> {
        Completion::ready(finish_light(&self.states, Err(error), ""))
    }

    /// Installs the default spherical-harmonics light and waits for it.
    pub fn set_default_indirect_light(&self) -> Outcome {
        self.set_indirect_light(Some(&DefaultIndirectLight::default()))
            .resolve()
    }

    /// Dispatches on the declared variant.
    pub fn apply(&self, light: &IndirectLight) -> Completion<Outcome> {
        match light {
            IndirectLight::Default(light) => self.set_indirect_light(Some(light)),
            IndirectLight::Ktx {
                source: AssetSource::Asset(path),
                intensity,
            } => self.set_indirect_light_from_ktx_asset(path, *intensity),
            IndirectLight::Ktx {
                source: AssetSource::Url(url),
                intensity,
            } => self.set_indirect_light_from_ktx_url(url, *intensity),
            IndirectLight::Hdr {
                source: AssetSource::Asset(path),
                intensity,
            } => self.set_indirect_light_from_hdr_asset(path, *intensity),
            IndirectLight::Hdr {
                source: AssetSource::Url(url),
                intensity,
            } => self.set_indirect_light_from_hdr_url(url, *intensity),
        }
    }

    pub fn set_indirect_light(&self, light: Option<&DefaultIndirectLight>) -> Completion<Outcome> {
        self.states.light.set(LoadState::Loading);
        let Some(light) = light else {
            return self.fail(SceneError::NotFound("Indirect light"));
        };
        let params = IndirectLightParams {
            intensity: light.intensity,
            source: IblSource::SphericalHarmonics {
                radiance: light.radiance.clone(),
                irradiance: light.irradiance.clone(),
            },
            rotation: light.rotation,
        };
        let slot = Arc::clone(&self.slot);
        let states = Arc::clone(&self.states);
        self.strand.submit(move |engine| -> Outcome {
            let result = engine
                .create_indirect_light(&params)
                .map(|light| slot.swap(engine, light, None))
                .map_err(SceneError::from);
            finish_light(&states, result, "Indirect light changed successfully")
        })
    }

    pub fn set_indirect_light_from_ktx_asset(&self, path: &str, _intensity: f32) -> Completion<Outcome> {
        self.states.light.set(LoadState::Loading);
        log::debug!("KTX indirect light requested from asset '{path}'");
        self.fail(SceneError::NotImplemented("KTX indirect light from asset"))
    }

    pub fn set_indirect_light_from_ktx_url(&self, url: &str, _intensity: f32) -> Completion<Outcome> {
        self.states.light.set(LoadState::Loading);
        log::debug!("KTX indirect light requested from '{url}'");
        self.fail(SceneError::NotImplemented("KTX indirect light from URL"))
    }

    pub fn set_indirect_light_from_hdr_url(&self, url: &str, _intensity: f32) -> Completion<Outcome> {
        self.states.light.set(LoadState::Loading);
        log::debug!("HDR indirect light requested from '{url}'");
        self.fail(SceneError::NotImplemented("HDR indirect light from URL"))
    }

    /// Decodes the HDR file on the caller's thread, then prefilters and
    /// swaps the light in on the strand. Any failure leaves the previous
    /// light bound.
    pub fn set_indirect_light_from_hdr_asset(&self, path: &str, intensity: f32) -> Completion<Outcome> {
        self.states.light.set(LoadState::Loading);
        let image = match asset_file(&self.assets_path, path)
            .and_then(|file| self.prefilter.load_hdr(&file))
        {
            Ok(image) => image,
            Err(e) => return self.fail(e),
        };
        let prefilter = Arc::clone(&self.prefilter);
        let slot = Arc::clone(&self.slot);
        let states = Arc::clone(&self.states);
        self.strand.submit(move |engine| -> Outcome {
            let result = prefilter.create_cubemap(engine, &image).and_then(|cubemap| {
                let installed = slot.install_from_cubemap(engine, &prefilter, cubemap, intensity);
                engine.destroy_texture(cubemap);
                installed
            });
            finish_light(&states, result, "Indirect light loaded successfully")
        })
    }

    /// Changes the intensity of whatever light is currently bound.
    pub fn set_intensity(&self, intensity: f32) -> Completion<Outcome> {
        let slot = Arc::clone(&self.slot);
        self.strand.submit(move |engine| -> Outcome {
            let light = slot
                .current()
                .ok_or(SceneError::NotInitialized("Indirect light"))?;
            engine.set_indirect_light_intensity(light, intensity)?;
            Ok("Indirect light intensity updated successfully".to_string())
        })
    }
}
