use crate::engine::Entity;
use crate::error::{Outcome, SceneError};
use crate::scene::Shape;
use crate::state::{lock, LoadState, SceneStates};
use crate::strand::{Completion, Strand};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ShapeEntities {
    entities: Vec<Entity>,
    visible: bool,
}

pub struct ShapeManager {
    strand: Arc<Strand>,
    states: Arc<SceneStates>,
    shapes: Arc<Mutex<ShapeEntities>>,
}

impl ShapeManager {
    pub fn new(strand: Arc<Strand>, states: Arc<SceneStates>) -> Self {
        Self {
            strand,
            states,
            shapes: Arc::new(Mutex::new(ShapeEntities::default())),
        }
    }

    /// Creates one entity per shape and adds them all to the scene. Shapes
    /// the engine rejects are skipped and logged.
    pub fn add_shapes(&self, shapes: &[Shape]) -> Completion<Outcome> {
        self.states.shapes.set(LoadState::Loading);
        let params: Vec<_> = shapes.iter().map(|s| (s.id, s.to_params())).collect();
        let owned = Arc::clone(&self.shapes);
        let states = Arc::clone(&self.states);
        self.strand.submit(move |engine| -> Outcome {
            let mut owned = lock(&owned);
            let mut created = 0usize;
            let mut last_error = None;
            for (id, params) in &params {
                match engine.create_shape(params) {
                    Ok(entity) => {
                        engine.add_entity(entity);
                        owned.entities.push(entity);
                        created += 1;
                    }
                    Err(e) => {
                        log::error!("Shape {id:?} not created: {e}");
                        last_error = Some(e);
                    }
                }
            }
            owned.visible = true;
            if let (0, Some(e)) = (created, last_error) {
                states.shapes.set(LoadState::Error);
                return Err(SceneError::from(e));
            }
            states.shapes.set(LoadState::Loaded);
            Ok(format!("{created} shapes created"))
        })
    }

    /// Adds or removes every shape entity. Repeating a toggle is a no-op.
    pub fn toggle_all(&self, visible: bool) -> Completion<Outcome> {
        let owned = Arc::clone(&self.shapes);
        self.strand.submit(move |engine| -> Outcome {
            let mut owned = lock(&owned);
            if owned.visible == visible {
                return Ok("Shapes unchanged".to_string());
            }
            for entity in &owned.entities {
                if visible {
                    engine.add_entity(*entity);
                } else {
                    engine.remove_entity(*entity);
                }
            }
            owned.visible = visible;
            Ok(format!(
                "Shapes {}",
                if visible { "shown" } else { "hidden" }
            ))
        })
    }

    pub fn shape_count(&self) -> Completion<usize> {
        let owned = Arc::clone(&self.shapes);
        self.strand.submit(move |_engine| lock(&owned).entities.len())
    }
}

#[cfg(test)]
mod tests {
    use super::ShapeManager;
    use crate::engine::HeadlessEngine;
    use crate::scene::Shape;
    use crate::state::{LoadState, SceneStates};
    use crate::strand::Strand;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn toggling_is_idempotent() {
        let engine = HeadlessEngine::new(32, 32);
        let inspector = engine.inspector();
        let states = Arc::new(SceneStates::default());
        let manager = ShapeManager::new(
            Arc::new(Strand::spawn(Box::new(engine)).unwrap()),
            Arc::clone(&states),
        );
        let shapes: Vec<Shape> = [json!({"shapeType": 1}), json!({"shapeType": 3, "id": 7})]
            .iter()
            .filter_map(|v| Shape::deserialize(v.as_object().unwrap()))
            .collect();
        manager.add_shapes(&shapes).resolve().unwrap();
        assert_eq!(states.shapes.get(), LoadState::Loaded);
        assert_eq!(manager.shape_count().wait().unwrap(), 2);
        assert_eq!(inspector.snapshot().scene.len(), 2);

        manager.toggle_all(false).resolve().unwrap();
        manager.toggle_all(false).resolve().unwrap();
        assert!(inspector.snapshot().scene.is_empty());

        manager.toggle_all(true).resolve().unwrap();
        manager.toggle_all(true).resolve().unwrap();
        assert_eq!(inspector.snapshot().scene.len(), 2);
    }
}
