use super::ibl::IblPrefilter;
use super::indirect_light_manager::{asset_file, finish_light, IndirectLightSlot};
use crate::color::color_of;
use crate::engine::{Engine, SkyboxId, SkyboxParams, TextureId};
use crate::error::{Outcome, SceneError};
use crate::scene::{AssetSource, Skybox};
use crate::state::{lock, LoadState, SceneStates};
use crate::strand::{Completion, Strand};
use glam::Vec4;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Installed {
    skybox: Option<SkyboxId>,
    cubemap: Option<TextureId>,
}

impl Installed {
    fn swap(&mut self, engine: &mut dyn Engine, skybox: SkyboxId, cubemap: Option<TextureId>) {
        if let Some(old) = self.skybox.take() {
            engine.destroy_skybox(old);
        }
        if let Some(old) = self.cubemap.take() {
            engine.destroy_texture(old);
        }
        engine.set_skybox(Some(skybox));
        self.skybox = Some(skybox);
        self.cubemap = cubemap;
    }
}

fn finish_skybox(states: &SceneStates, result: Result<(), SceneError>, success: &str) -> Outcome {
    match result {
        Ok(()) => {
            states.skybox.set(LoadState::Loaded);
            log::info!("{success}");
            Ok(success.to_string())
        }
        Err(e) => {
            states.skybox.set(LoadState::Error);
            log::error!("Skybox failed: {e}");
            Err(e)
        }
    }
}

pub struct SkyboxManager {
    strand: Arc<Strand>,
    prefilter: Arc<IblPrefilter>,
    light_slot: Arc<IndirectLightSlot>,
    states: Arc<SceneStates>,
    assets_path: PathBuf,
    installed: Arc<Mutex<Installed>>,
}

impl SkyboxManager {
    pub fn new(
        strand: Arc<Strand>,
        prefilter: Arc<IblPrefilter>,
        light_slot: Arc<IndirectLightSlot>,
        states: Arc<SceneStates>,
        assets_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strand,
            prefilter,
            light_slot,
            states,
            assets_path: assets_path.into(),
            installed: Arc::new(Mutex::new(Installed::default())),
        }
    }

    fn fail(&self, error: SceneError) -> Completion<Outcome> {
        Completion::ready(finish_skybox(&self.states, Err(error), ""))
    }

    /// Dispatches on the declared variant. `should_update_light` asks an HDR
    /// skybox to install the indirect light from the same cube map.
    pub fn apply(
        &self,
        skybox: &Skybox,
        should_update_light: bool,
        light_intensity: f32,
    ) -> Completion<Outcome> {
        match skybox {
            Skybox::Color(color) => self.set_skybox_from_color(color),
            Skybox::Ktx(AssetSource::Asset(path)) => self.set_skybox_from_ktx_asset(path),
            Skybox::Ktx(AssetSource::Url(url)) => self.set_skybox_from_ktx_url(url),
            Skybox::Hdr {
                source: AssetSource::Asset(path),
                show_sun,
            } => self.set_skybox_from_hdr_asset(path, *show_sun, should_update_light, light_intensity),
            Skybox::Hdr {
                source: AssetSource::Url(url),
                ..
            } => self.set_skybox_from_hdr_url(url),
        }
    }

    /// Fully transparent colour skybox.
    pub fn set_default_skybox(&self) -> Completion<Outcome> {
        self.install_color(Vec4::ZERO, "Default skybox set successfully")
    }

    pub fn set_skybox_from_color(&self, color: &str) -> Completion<Outcome> {
        self.states.skybox.set(LoadState::Loading);
        match color_of(color) {
            Ok(rgba) => self.install_color(rgba, "Skybox color set successfully"),
            Err(e) => self.fail(e),
        }
    }

    fn install_color(&self, rgba: Vec4, success: &'static str) -> Completion<Outcome> {
        self.states.skybox.set(LoadState::Loading);
        let installed = Arc::clone(&self.installed);
        let states = Arc::clone(&self.states);
        self.strand.submit(move |engine| -> Outcome {
            let result = engine
                .create_skybox(&SkyboxParams::Color(rgba))
                .map(|skybox| lock(&installed).swap(engine, skybox, None))
                .map_err(SceneError::from);
            finish_skybox(&states, result, success)
        })
    }

    pub fn set_skybox_from_ktx_asset(&self, path: &str) -> Completion<Outcome> {
        self.states.skybox.set(LoadState::Loading);
        log::debug!("KTX skybox requested from asset '{path}'");
        self.fail(SceneError::NotImplemented("KTX skybox from asset"))
    }

    pub fn set_skybox_from_ktx_url(&self, url: &str) -> Completion<Outcome> {
        self.states.skybox.set(LoadState::Loading);
        log::debug!("KTX skybox requested from '{url}'");
        self.fail(SceneError::NotImplemented("KTX skybox from URL"))
    }

    pub fn set_skybox_from_hdr_url(&self, url: &str) -> Completion<Outcome> {
        self.states.skybox.set(LoadState::Loading);
        log::debug!("HDR skybox requested from '{url}'");
        self.fail(SceneError::NotImplemented("HDR skybox from URL"))
    }

    /// Builds an environment skybox from an HDR asset and, when
    /// `should_update_light` is set, an indirect light from the same cube map.
    pub fn set_skybox_from_hdr_asset(
        &self,
        path: &str,
        show_sun: bool,
        should_update_light: bool,
        light_intensity: f32,
    ) -> Completion<Outcome> {
        self.states.skybox.set(LoadState::Loading);
        if should_update_light {
            self.states.light.set(LoadState::Loading);
        }
        let image = match asset_file(&self.assets_path, path)
            .and_then(|file| self.prefilter.load_hdr(&file))
        {
            Ok(image) => image,
            Err(e) => {
                if should_update_light {
                    self.states.light.set(LoadState::Error);
                }
                return self.fail(e);
            }
        };

        let prefilter = Arc::clone(&self.prefilter);
        let light_slot = Arc::clone(&self.light_slot);
        let installed = Arc::clone(&self.installed);
        let states = Arc::clone(&self.states);
        self.strand.submit(move |engine| -> Outcome {
            let cubemap = match prefilter.create_cubemap(engine, &image) {
                Ok(cubemap) => cubemap,
                Err(e) => {
                    if should_update_light {
                        states.light.set(LoadState::Error);
                    }
                    return finish_skybox(&states, Err(e), "");
                }
            };
            let skybox = match engine.create_skybox(&SkyboxParams::Environment { cubemap, show_sun }) {
                Ok(skybox) => skybox,
                Err(e) => {
                    engine.destroy_texture(cubemap);
                    if should_update_light {
                        states.light.set(LoadState::Error);
                    }
                    return finish_skybox(&states, Err(e.into()), "");
                }
            };
            lock(&installed).swap(engine, skybox, Some(cubemap));

            if should_update_light {
                let light = light_slot.install_from_cubemap(engine, &prefilter, cubemap, light_intensity);
                // The skybox stays in place; a light failure is left in the light state.
                let _ = finish_light(&states, light, "Indirect light loaded from skybox");
            }
            finish_skybox(&states, Ok(()), "Skybox loaded successfully")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SkyboxManager;
    use crate::engine::{EngineInspector, HeadlessEngine, IblSource, SkyboxParams};
    use crate::error::ErrorKind;
    use crate::render::ibl::{hdr_bytes, IblPrefilter};
    use crate::render::indirect_light_manager::IndirectLightSlot;
    use crate::scene::{AssetSource, Skybox};
    use crate::state::{LoadState, SceneStates};
    use crate::strand::Strand;
    use glam::Vec4;
    use std::sync::Arc;

    fn fixture() -> (SkyboxManager, EngineInspector, Arc<SceneStates>, tempfile::TempDir) {
        let engine = HeadlessEngine::new(64, 64);
        let inspector = engine.inspector();
        let strand = Arc::new(Strand::spawn(Box::new(engine)).unwrap());
        let states = Arc::new(SceneStates::default());
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join("park.hdr"), hdr_bytes(4, 2)).unwrap();
        let manager = SkyboxManager::new(
            strand,
            Arc::new(IblPrefilter::new()),
            Arc::new(IndirectLightSlot::new()),
            Arc::clone(&states),
            assets.path(),
        );
        (manager, inspector, states, assets)
    }

    #[test]
    fn default_and_color_skyboxes() {
        let (manager, inspector, states, _assets) = fixture();
        manager.set_default_skybox().resolve().unwrap();
        assert_eq!(
            inspector.snapshot().active_skybox(),
            Some(&SkyboxParams::Color(Vec4::ZERO))
        );
        manager.set_skybox_from_color("#FF0000").resolve().unwrap();
        let snapshot = inspector.snapshot();
        assert_eq!(snapshot.skyboxes.len(), 1);
        assert_eq!(
            snapshot.active_skybox(),
            Some(&SkyboxParams::Color(Vec4::new(1.0, 0.0, 0.0, 1.0)))
        );
        assert_eq!(states.skybox.get(), LoadState::Loaded);

        let err = manager.set_skybox_from_color("nope").resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert_eq!(states.skybox.get(), LoadState::Error);
    }

    #[test]
    fn hdr_skybox_can_install_the_light() {
        let (manager, inspector, states, _assets) = fixture();
        let sky = Skybox::Hdr {
            source: AssetSource::Asset("park.hdr".to_string()),
            show_sun: true,
        };
        manager.apply(&sky, true, 12_000.0).resolve().unwrap();
        assert_eq!(states.skybox.get(), LoadState::Loaded);
        assert_eq!(states.light.get(), LoadState::Loaded);
        let snapshot = inspector.snapshot();
        match snapshot.active_skybox() {
            Some(SkyboxParams::Environment { cubemap, show_sun }) => {
                assert!(*show_sun);
                assert!(snapshot.textures.contains_key(cubemap));
            }
            other => panic!("unexpected {other:?}"),
        }
        let light = snapshot.active_indirect_light().unwrap();
        assert_eq!(light.intensity, 12_000.0);
        assert!(matches!(light.source, IblSource::Reflections(_)));
    }

    #[test]
    fn hdr_skybox_alone_leaves_light_untouched() {
        let (manager, inspector, states, _assets) = fixture();
        manager
            .set_skybox_from_hdr_asset("park.hdr", false, false, 1.0)
            .resolve()
            .unwrap();
        assert_eq!(states.light.get(), LoadState::None);
        assert!(inspector.snapshot().indirect_light.is_none());

        let missing = manager
            .set_skybox_from_hdr_asset("gone.hdr", false, true, 1.0)
            .resolve()
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::ResourceFailure);
        assert_eq!(states.skybox.get(), LoadState::Error);
        assert_eq!(states.light.get(), LoadState::Error);
        assert!(inspector.snapshot().skybox.is_some());
    }

    #[test]
    fn ktx_skyboxes_are_not_implemented() {
        let (manager, _inspector, _states, _assets) = fixture();
        let err = manager
            .apply(&Skybox::Ktx(AssetSource::Url("http://host/sky.ktx".into())), false, 0.0)
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }
}
