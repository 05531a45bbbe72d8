mod input;

pub use input::TouchEvent;

use crate::assets::ModelLoader;
use crate::engine::{BlendMode, Engine, Viewport};
use crate::error::{Outcome, SceneError};
use crate::render::{
    CameraManager, GestureStep, GroundManager, IblPrefilter, IndirectLightManager,
    IndirectLightSlot, LightManager, ShapeManager, SkyboxManager,
};
use crate::scene::serialization::ViewerSettings;
use crate::scene::{Camera, CreationParams, IndirectLight, Light, Model, Scene, Shape};
use crate::state::{lock, LoadState, SceneStates};
use crate::strand::{Completion, Strand};
use std::sync::{Arc, Mutex};

/// Owns one rendering session: the strand, every manager, and the scene
/// they were configured from.
///
/// Startup runs each step to completion before the next one begins. After
/// that every public method takes `&self` and may be called from any thread.
pub struct SceneController {
    strand: Arc<Strand>,
    settings: ViewerSettings,
    scene: Scene,
    models: Vec<Model>,
    shapes: Vec<Shape>,
    states: Arc<SceneStates>,
    model_loader: ModelLoader,
    prefilter: Arc<IblPrefilter>,
    camera_manager: CameraManager,
    light_manager: LightManager,
    indirect_light_manager: IndirectLightManager,
    skybox_manager: SkyboxManager,
    ground_manager: GroundManager,
    shape_manager: ShapeManager,
    light: Mutex<Option<Light>>,
    indirect_light: Mutex<IndirectLight>,
    animation_index: Mutex<Option<u32>>,
}

impl SceneController {
    /// Starts the strand over `engine` and runs the full startup sequence.
    /// Individual step failures are logged and recorded in [`SceneStates`];
    /// only a strand that cannot start is an error.
    pub fn new(
        engine: Box<dyn Engine>,
        settings: ViewerSettings,
        params: CreationParams,
    ) -> Result<Self, SceneError> {
        let strand = Arc::new(Strand::spawn(engine)?);
        let states = Arc::new(SceneStates::default());
        let prefilter = Arc::new(IblPrefilter::new());
        let light_slot = Arc::new(IndirectLightSlot::new());
        let assets = settings.assets_path.clone();

        let CreationParams {
            models,
            scene,
            shapes,
        } = params;
        scene.log("SceneController");

        let controller = Self {
            model_loader: ModelLoader::new(Arc::clone(&strand), Arc::clone(&states), &assets),
            camera_manager: CameraManager::new(Arc::clone(&strand)),
            light_manager: LightManager::new(Arc::clone(&strand)),
            indirect_light_manager: IndirectLightManager::new(
                Arc::clone(&strand),
                Arc::clone(&prefilter),
                Arc::clone(&light_slot),
                Arc::clone(&states),
                &assets,
            ),
            skybox_manager: SkyboxManager::new(
                Arc::clone(&strand),
                Arc::clone(&prefilter),
                light_slot,
                Arc::clone(&states),
                &assets,
            ),
            ground_manager: GroundManager::new(Arc::clone(&strand), Arc::clone(&states)),
            shape_manager: ShapeManager::new(Arc::clone(&strand), Arc::clone(&states)),
            light: Mutex::new(scene.light.clone()),
            indirect_light: Mutex::new(scene.indirect_light.clone().unwrap_or_default()),
            animation_index: Mutex::new(None),
            strand,
            settings,
            scene,
            models,
            shapes,
            states,
            prefilter,
        };
        controller.start();
        Ok(controller)
    }

    fn start(&self) {
        self.set_up_viewer();
        self.set_up_models();
        self.set_up_ground();
        self.set_up_camera();
        let skybox_installed_light = self.set_up_skybox();
        self.set_up_light();
        self.set_up_indirect_light(skybox_installed_light);
        self.set_up_shapes();
        log::info!("Scene ready: {}", self.states.summary());
    }

    fn set_up_viewer(&self) {
        let viewport = Viewport::new(self.settings.viewport_width, self.settings.viewport_height);
        let post_processing = self.settings.post_processing;
        let viewer = self.strand.submit(move |engine| {
            engine.set_viewport(viewport);
            engine.set_post_processing_enabled(post_processing);
        });
        if let Err(e) = viewer.wait() {
            log::error!("Viewer setup failed: {e}");
        }
    }

    fn set_up_models(&self) {
        for model in &self.models {
            match self.model_loader.load_with_fallback(model) {
                Ok((asset, used)) => {
                    // A model without an animation keeps the earlier selection.
                    let Some(animation) = &used.animation else {
                        continue;
                    };
                    let index = animation.start_index();
                    if let Some(index) = index {
                        log::debug!("Model {} will animate from index {index}", asset.name);
                    }
                    *lock(&self.animation_index) = index;
                }
                Err(e) => log::error!("Model setup failed: {e}"),
            }
        }
    }

    fn set_up_ground(&self) {
        let Some(ground) = &self.scene.ground else {
            log::debug!("Scene has no ground");
            return;
        };
        report("Ground", self.ground_manager.create_ground(Some(ground)).resolve());
    }

    fn set_up_camera(&self) {
        if !report("Default camera", self.camera_manager.set_default_camera().resolve()) {
            return;
        }
        let Some(camera) = &self.scene.camera else {
            log::error!("Camera failed to load: the scene declares no camera");
            return;
        };
        self.camera_manager.set_primary_camera(camera.clone());
        report("Camera", self.camera_manager.update_camera(Some(camera)).resolve());
    }

    /// Returns true when the skybox step also installed the indirect light.
    /// A failed install leaves the light state at `Error`, and the indirect
    /// light step then runs on its own.
    fn set_up_skybox(&self) -> bool {
        let Some(skybox) = &self.scene.skybox else {
            report("Default skybox", self.skybox_manager.set_default_skybox().resolve());
            self.make_surface_transparent();
            return false;
        };
        let coupled = self
            .scene
            .indirect_light
            .as_ref()
            .is_some_and(|light| skybox.shares_source_with(light));
        let intensity = lock(&self.indirect_light).intensity();
        let installed = report(
            "Skybox",
            self.skybox_manager.apply(skybox, coupled, intensity).resolve(),
        );
        log::debug!(
            "Skybox step done (HDR sources decoded: {})",
            self.prefilter.decoded_sources()
        );
        coupled && installed && self.states.light.get() == LoadState::Loaded
    }

    fn make_surface_transparent(&self) {
        let unit = self.strand.submit(|engine| {
            engine.set_blend_mode(BlendMode::Translucent);
            engine.set_clear_enabled(true);
        });
        if let Err(e) = unit.wait() {
            log::error!("Could not make the surface transparent: {e}");
        }
    }

    fn set_up_light(&self) {
        let outcome = match &self.scene.light {
            Some(light) => self.light_manager.change_light(Some(light)).resolve(),
            None => self.light_manager.set_default_light(),
        };
        report("Light", outcome);
    }

    fn set_up_indirect_light(&self, installed_by_skybox: bool) {
        if installed_by_skybox {
            log::debug!("Indirect light already installed from the skybox source");
            return;
        }
        let outcome = match &self.scene.indirect_light {
            Some(light) => self.indirect_light_manager.apply(light).resolve(),
            None => self.indirect_light_manager.set_default_indirect_light(),
        };
        report("Indirect light", outcome);
    }

    fn set_up_shapes(&self) {
        if self.shapes.is_empty() {
            return;
        }
        report("Shapes", self.shape_manager.add_shapes(&self.shapes).resolve());
    }

    /// Recolours the scene's declared light. Without one there is nothing
    /// to change.
    pub fn change_light_properties(&self, color: &str, intensity: f32) -> Completion<Outcome> {
        let mut stored = lock(&self.light);
        let Some(current) = stored.as_ref() else {
            log::warn!("change_light_properties: the scene declares no light");
            return Completion::ready(Err(SceneError::NotFound("Scene light")));
        };
        log::info!("Changing light to color {color}, intensity {intensity}");
        let mut light = current.clone();
        light.change_color(color);
        light.change_intensity(intensity);
        if let Err(e) = light.to_params() {
            log::error!("Light change rejected: {e}");
            return Completion::ready(Err(e));
        }
        let completion = self.light_manager.change_light(Some(&light));
        *stored = Some(light);
        completion
    }

    /// The default light is rebuilt with the new intensity; asset-backed
    /// lights keep their textures and only change intensity.
    pub fn change_indirect_light_properties(&self, intensity: f32) -> Completion<Outcome> {
        let mut light = lock(&self.indirect_light);
        light.set_intensity(intensity);
        match &*light {
            IndirectLight::Default(light) => self.indirect_light_manager.set_indirect_light(Some(light)),
            _ => self.indirect_light_manager.set_intensity(intensity),
        }
    }

    pub fn on_touch(&self, action: i32, point_count: usize, point_data: &[f64]) -> Completion<GestureStep> {
        match TouchEvent::parse(action, point_count, point_data) {
            Some(event) => {
                let point = event.primary();
                self.camera_manager.on_action(event.action, point.x, point.y)
            }
            None => Completion::ready(GestureStep::Ignored),
        }
    }

    /// Resizes the view, then recomputes the camera projection for the new aspect.
    pub fn resize(&self, width: u32, height: u32) -> Completion<Outcome> {
        let viewport = Viewport::new(width, height);
        if let Err(e) = self.strand.post(move |engine| engine.set_viewport(viewport)) {
            return Completion::ready(Err(e));
        }
        self.camera_manager.update_camera_on_resize(width, height)
    }

    pub fn toggle_all_shapes(&self, visible: bool) -> Completion<Outcome> {
        self.shape_manager.toggle_all(visible)
    }

    pub fn set_default_camera(&self) -> Completion<Outcome> {
        self.camera_manager.set_default_camera()
    }

    pub fn update_camera(&self, camera: Option<&Camera>) -> Completion<Outcome> {
        if let Some(camera) = camera {
            self.camera_manager.set_primary_camera(camera.clone());
        }
        self.camera_manager.update_camera(camera)
    }

    pub fn camera_manager(&self) -> &CameraManager {
        &self.camera_manager
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn states(&self) -> &SceneStates {
        &self.states
    }

    /// Animation selected by the most recently loaded model that declares one,
    /// if it autoplays.
    pub fn animation_index(&self) -> Option<u32> {
        *lock(&self.animation_index)
    }
}

/// Logs a startup step and returns whether it succeeded.
fn report(step: &str, outcome: Outcome) -> bool {
    match outcome {
        Ok(message) => {
            log::info!("{step}: {message}");
            true
        }
        Err(e) => {
            log::error!("{step} failed: {e}");
            false
        }
    }
}
