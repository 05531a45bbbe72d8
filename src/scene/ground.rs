use super::material::MaterialRef;
use crate::engine::GroundParams;
use crate::value::{bool_of, map_of, set, vec3_of, visit, FieldError, ValueMap};
use glam::Vec3;

pub const DEFAULT_GROUND_SIZE: Vec3 = Vec3::new(10.0, 0.0, 10.0);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ground {
    pub center_position: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub is_below_model: bool,
    pub size: Option<Vec3>,
    pub material: Option<MaterialRef>,
}

impl Ground {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        let mut is_below_model = None;
        visit("Ground", map, |key, value| match key {
            "centerPosition" => set(&mut out.center_position, vec3_of(value)),
            "normal" => set(&mut out.normal, vec3_of(value)),
            "isBelowModel" => set(&mut is_below_model, bool_of(value)),
            "size" => set(&mut out.size, vec3_of(value)),
            "material" => set(&mut out.material, map_of(value).map(MaterialRef::deserialize)),
            _ => Err(FieldError::Unknown),
        });
        out.is_below_model = is_below_model.unwrap_or(false);
        out
    }

    pub fn to_params(&self) -> GroundParams {
        GroundParams {
            center: self.center_position.unwrap_or(Vec3::ZERO),
            normal: self.normal.unwrap_or(Vec3::Y),
            size: self.size.unwrap_or(DEFAULT_GROUND_SIZE),
            is_below_model: self.is_below_model,
            material: self.material.clone(),
        }
    }
}
