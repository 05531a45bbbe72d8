use super::manipulator::{Manipulator, ManipulatorBuilder};
use crate::engine::{Engine, Entity, ExposureSettings, Viewport};
use crate::error::{ErrorKind, Outcome, SceneError, StepStatus};
use crate::scene::camera::{
    DEFAULT_APERTURE, DEFAULT_FOCAL_LENGTH, DEFAULT_SENSITIVITY, DEFAULT_SHUTTER_SPEED,
};
use crate::scene::{Camera, Exposure, LensProjection, ManipulatorMode, Projection};
use crate::state::lock;
use crate::strand::{Completion, Strand};
use glam::{DVec2, Vec3};
use std::sync::{Arc, Mutex};

/// Where the default camera looks: just in front of the origin.
pub const DEFAULT_OBJECT_POSITION: Vec3 = Vec3::new(0.0, 0.0, -4.0);

/// Pointer down or moved.
pub const ACTION_BEGIN_OR_UPDATE: i32 = 0;
/// Pointer released.
pub const ACTION_END: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureStep {
    Began,
    Updated,
    Ended,
    Ignored,
}

struct CameraState {
    entity: Option<Entity>,
    manipulator: Option<Manipulator>,
    focal_length: f64,
    last_action: Option<i32>,
}

impl CameraState {
    fn camera(&self) -> Result<Entity, SceneError> {
        self.entity.ok_or(SceneError::NotInitialized("Camera"))
    }

    fn apply_look_at(&self, engine: &mut dyn Engine) -> Result<(), SceneError> {
        if let (Some(entity), Some(manipulator)) = (self.entity, &self.manipulator) {
            let (eye, target, up) = manipulator.look_at();
            engine.look_at(entity, eye, target, up)?;
        }
        Ok(())
    }

    fn destroy(&mut self, engine: &mut dyn Engine) {
        if let Some(entity) = self.entity.take() {
            engine.destroy_camera(entity);
            engine.destroy_entity(entity);
        }
        self.manipulator = None;
        self.last_action = None;
    }

    /// Action 0 begins a grab on its first event and updates it afterwards;
    /// action 1 ends the grab and re-arms the begin.
    fn gesture(&mut self, action: i32, x: f32, y: f32) -> GestureStep {
        let Some(manipulator) = self.manipulator.as_mut() else {
            log::warn!("Gesture received before the camera exists; ignoring");
            return GestureStep::Ignored;
        };
        match action {
            ACTION_BEGIN_OR_UPDATE => {
                let step = if self.last_action == Some(ACTION_BEGIN_OR_UPDATE) {
                    manipulator.grab_update(x, y);
                    GestureStep::Updated
                } else {
                    manipulator.grab_begin(x, y, false);
                    GestureStep::Began
                };
                self.last_action = Some(action);
                step
            }
            ACTION_END => {
                manipulator.grab_end();
                self.last_action = None;
                GestureStep::Ended
            }
            other => {
                log::debug!("Ignoring gesture action {other}");
                GestureStep::Ignored
            }
        }
    }
}

fn apply_exposure(
    engine: &mut dyn Engine,
    camera: Entity,
    exposure: Option<&Exposure>,
) -> StepStatus {
    let exposure = exposure.ok_or(SceneError::NotFound("Exposure"))?;
    let settings = exposure.resolve();
    log::debug!("Exposure resolved to {settings:?}");
    engine.set_exposure(camera, settings)?;
    Ok("Exposure updated successfully")
}

fn apply_projection(
    engine: &mut dyn Engine,
    camera: Entity,
    projection: Option<&Projection>,
) -> StepStatus {
    let projection = projection.ok_or(SceneError::NotFound("Projection"))?;
    let settings = projection.resolve(engine.viewport().aspect())?;
    log::debug!("Projection resolved to {settings:?}");
    engine.set_projection(camera, settings)?;
    Ok("Projection updated successfully")
}

fn apply_lens_projection(
    engine: &mut dyn Engine,
    state: &mut CameraState,
    camera: Entity,
    lens: Option<&LensProjection>,
) -> StepStatus {
    let lens = lens.ok_or(SceneError::NotFound("Lens projection"))?;
    let settings = lens.resolve(engine.viewport().aspect())?;
    engine.set_projection(camera, settings)?;
    if let Some(focal_length) = lens.focal_length {
        state.focal_length = focal_length;
    }
    Ok("Lens projection updated successfully")
}

fn apply_shift(engine: &mut dyn Engine, camera: Entity, shift: Option<DVec2>) -> StepStatus {
    let shift = shift.ok_or(SceneError::NotFound("Camera shift"))?;
    engine.set_shift(camera, shift)?;
    Ok("Camera shift updated successfully")
}

fn apply_scaling(engine: &mut dyn Engine, camera: Entity, scaling: Option<DVec2>) -> StepStatus {
    let scaling = scaling.ok_or(SceneError::NotFound("Camera scaling"))?;
    engine.set_scaling(camera, scaling)?;
    Ok("Camera scaling updated successfully")
}

fn log_step(aspect: &str, status: &StepStatus) {
    match status {
        Ok(message) => log::debug!("{message}"),
        Err(e) if e.kind() == ErrorKind::MissingInput => log::debug!("Camera {aspect}: {e}"),
        Err(e) => log::warn!("Camera {aspect} not applied: {e}"),
    }
}

/// Owns the view camera, its manipulator and the gesture state.
///
/// Every method that touches the engine submits one unit to the strand and
/// returns its [`Completion`].
pub struct CameraManager {
    strand: Arc<Strand>,
    state: Arc<Mutex<CameraState>>,
    primary: Mutex<Option<Camera>>,
}

impl CameraManager {
    pub fn new(strand: Arc<Strand>) -> Self {
        Self {
            strand,
            state: Arc::new(Mutex::new(CameraState {
                entity: None,
                manipulator: None,
                focal_length: DEFAULT_FOCAL_LENGTH,
                last_action: None,
            })),
            primary: Mutex::new(None),
        }
    }

    fn camera_step<F>(&self, step: F) -> Completion<Outcome>
    where
        F: FnOnce(&mut dyn Engine, &mut CameraState, Entity) -> StepStatus + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        self.strand.submit(move |engine| -> Outcome {
            let mut state = lock(&state);
            let camera = state.camera()?;
            step(engine, &mut *state, camera).map(str::to_string)
        })
    }

    /// Replaces any live camera with a fresh orbit camera aimed at
    /// [`DEFAULT_OBJECT_POSITION`], with default exposure and lens.
    pub fn set_default_camera(&self) -> Completion<Outcome> {
        let state = Arc::clone(&self.state);
        self.strand.submit(move |engine| -> Outcome {
            let mut state = lock(&state);
            state.destroy(engine);

            let viewport = engine.viewport();
            let entity = engine.create_entity();
            engine.create_camera(entity)?;
            engine.set_view_camera(entity)?;
            engine.set_exposure(
                entity,
                ExposureSettings::Manual {
                    aperture: DEFAULT_APERTURE,
                    shutter_speed: DEFAULT_SHUTTER_SPEED,
                    sensitivity: DEFAULT_SENSITIVITY,
                },
            )?;
            let lens = LensProjection::new(DEFAULT_FOCAL_LENGTH, viewport.aspect());
            engine.set_projection(entity, lens.resolve(viewport.aspect())?)?;

            state.entity = Some(entity);
            state.focal_length = DEFAULT_FOCAL_LENGTH;
            state.manipulator = Some(
                ManipulatorBuilder::new()
                    .target_position(DEFAULT_OBJECT_POSITION)
                    .viewport(viewport.width, viewport.height)
                    .build(ManipulatorMode::Orbit),
            );
            state.apply_look_at(engine)?;
            log::info!("Default camera {} created", entity.id);
            Ok("Default camera updated successfully".to_string())
        })
    }

    /// Applies exposure, projection, lens projection, shift and scaling in
    /// that order, then rebuilds the manipulator. A missing or invalid aspect
    /// leaves that engine property untouched without failing the update.
    pub fn update_camera(&self, camera: Option<&Camera>) -> Completion<Outcome> {
        let Some(camera) = camera else {
            return Completion::ready(Err(SceneError::NotFound("Camera")));
        };
        let config = camera.clone();
        let state = Arc::clone(&self.state);
        self.strand.submit(move |engine| -> Outcome {
            let mut state = lock(&state);
            let entity = state.camera()?;

            let exposure = apply_exposure(engine, entity, config.exposure.as_ref());
            log_step("exposure", &exposure);
            let projection = apply_projection(engine, entity, config.projection.as_ref());
            log_step("projection", &projection);
            let lens = apply_lens_projection(engine, &mut *state, entity, config.lens_projection.as_ref());
            log_step("lens projection", &lens);
            log_step("shift", &apply_shift(engine, entity, config.shift));
            log_step("scaling", &apply_scaling(engine, entity, config.scaling));

            let viewport = engine.viewport();
            let manipulator = ManipulatorBuilder::from_camera(&config)
                .target_position(config.target_position.unwrap_or(DEFAULT_OBJECT_POSITION))
                .viewport(viewport.width, viewport.height)
                .build(config.mode.unwrap_or_default());
            state.manipulator = Some(manipulator);
            state.last_action = None;
            state.apply_look_at(engine)?;
            Ok("Camera updated successfully".to_string())
        })
    }

    pub fn update_exposure(&self, exposure: Option<Exposure>) -> Completion<Outcome> {
        self.camera_step(move |engine, _state, camera| {
            apply_exposure(engine, camera, exposure.as_ref())
        })
    }

    pub fn update_projection(&self, projection: Option<Projection>) -> Completion<Outcome> {
        self.camera_step(move |engine, _state, camera| {
            apply_projection(engine, camera, projection.as_ref())
        })
    }

    pub fn update_lens_projection(&self, lens: Option<LensProjection>) -> Completion<Outcome> {
        self.camera_step(move |engine, state, camera| {
            apply_lens_projection(engine, state, camera, lens.as_ref())
        })
    }

    pub fn update_shift(&self, shift: Option<DVec2>) -> Completion<Outcome> {
        self.camera_step(move |engine, _state, camera| apply_shift(engine, camera, shift))
    }

    pub fn update_scaling(&self, scaling: Option<DVec2>) -> Completion<Outcome> {
        self.camera_step(move |engine, _state, camera| apply_scaling(engine, camera, scaling))
    }

    pub fn on_action(&self, action: i32, x: f32, y: f32) -> Completion<GestureStep> {
        let state = Arc::clone(&self.state);
        self.strand.submit(move |engine| {
            let mut state = lock(&state);
            let step = state.gesture(action, x, y);
            log::trace!("gesture action={action} at ({x}, {y}) -> {step:?}");
            if matches!(step, GestureStep::Began | GestureStep::Updated) {
                if let Err(e) = state.apply_look_at(engine) {
                    log::warn!("Camera did not follow gesture: {e}");
                }
            }
            step
        })
    }

    pub fn scroll(&self, x: f32, y: f32, delta: f32) -> Completion<Outcome> {
        self.camera_step(move |engine, state, _camera| {
            let manipulator = state
                .manipulator
                .as_mut()
                .ok_or(SceneError::NotInitialized("Camera manipulator"))?;
            manipulator.scroll(x, y, delta);
            state.apply_look_at(engine)?;
            Ok("Camera zoomed")
        })
    }

    /// Resizes the manipulator viewport and recomputes the lens projection
    /// from the new aspect ratio and the last focal length.
    pub fn update_camera_on_resize(&self, width: u32, height: u32) -> Completion<Outcome> {
        self.camera_step(move |engine, state, camera| {
            if let Some(manipulator) = state.manipulator.as_mut() {
                manipulator.set_viewport(width, height);
            }
            let aspect = Viewport::new(width, height).aspect();
            let lens = LensProjection::new(state.focal_length, aspect);
            engine.set_projection(camera, lens.resolve(aspect)?)?;
            Ok("Camera resized successfully")
        })
    }

    pub fn set_camera_look_at(&self, eye: Vec3, center: Vec3, up: Vec3) -> Completion<Outcome> {
        self.camera_step(move |engine, _state, camera| {
            engine.look_at(camera, eye, center, up)?;
            Ok("Camera look-at updated successfully")
        })
    }

    pub fn look_at_default_position(&self) -> Completion<Outcome> {
        self.camera_step(|engine, state, _camera| {
            let manipulator = state
                .manipulator
                .as_mut()
                .ok_or(SceneError::NotInitialized("Camera manipulator"))?;
            manipulator.jump_home();
            state.apply_look_at(engine)?;
            Ok("Camera moved to its home position")
        })
    }

    /// Eye, target and up as the manipulator currently sees them.
    pub fn current_look_at(&self) -> Completion<Option<(Vec3, Vec3, Vec3)>> {
        let state = Arc::clone(&self.state);
        self.strand
            .submit(move |_engine| lock(&state).manipulator.as_ref().map(Manipulator::look_at))
    }

    pub fn destroy_camera(&self) -> Completion<Outcome> {
        let state = Arc::clone(&self.state);
        self.strand.submit(move |engine| -> Outcome {
            lock(&state).destroy(engine);
            Ok("Camera destroyed".to_string())
        })
    }

    pub fn set_primary_camera(&self, camera: Camera) {
        *lock(&self.primary) = Some(camera);
    }

    pub fn primary_camera(&self) -> Option<Camera> {
        lock(&self.primary).clone()
    }
}
