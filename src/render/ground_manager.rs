use crate::engine::Entity;
use crate::error::{Outcome, SceneError};
use crate::scene::Ground;
use crate::state::{lock, LoadState, SceneStates};
use crate::strand::{Completion, Strand};
use std::sync::{Arc, Mutex};

pub struct GroundManager {
    strand: Arc<Strand>,
    states: Arc<SceneStates>,
    entity: Arc<Mutex<Option<Entity>>>,
}

impl GroundManager {
    pub fn new(strand: Arc<Strand>, states: Arc<SceneStates>) -> Self {
        Self {
            strand,
            states,
            entity: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces the ground plane. A previous ground is destroyed first.
    pub fn create_ground(&self, ground: Option<&Ground>) -> Completion<Outcome> {
        self.states.ground.set(LoadState::Loading);
        let Some(ground) = ground else {
            self.states.ground.set(LoadState::Error);
            return Completion::ready(Err(SceneError::NotFound("Ground")));
        };
        let params = ground.to_params();
        let slot = Arc::clone(&self.entity);
        let states = Arc::clone(&self.states);
        self.strand.submit(move |engine| -> Outcome {
            let mut slot = lock(&slot);
            if let Some(old) = slot.take() {
                engine.destroy_entity(old);
            }
            match engine.create_ground(&params) {
                Ok(entity) => {
                    engine.add_entity(entity);
                    *slot = Some(entity);
                    states.ground.set(LoadState::Loaded);
                    log::info!("Ground {} created (below model: {})", entity.id, params.is_below_model);
                    Ok("Ground created successfully".to_string())
                }
                Err(e) => {
                    states.ground.set(LoadState::Error);
                    log::error!("Ground creation failed: {e}");
                    Err(e.into())
                }
            }
        })
    }
}
