use super::material::MaterialRef;
use crate::engine::{ShapeKind, ShapeParams};
use crate::value::{bool_of, i64_of, map_of, set, vec3_of, visit, FieldError, ValueMap};
use glam::Vec3;

impl ShapeKind {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Plane),
            2 => Some(Self::Cube),
            3 => Some(Self::Sphere),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: Option<i64>,
    pub kind: ShapeKind,
    pub center_position: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub size: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    pub double_sided: bool,
    pub material: Option<MaterialRef>,
}

impl Shape {
    pub fn deserialize(map: &ValueMap) -> Option<Self> {
        let mut id = None;
        let mut kind = None;
        let mut center_position = None;
        let mut normal = None;
        let mut size = None;
        let mut scale = None;
        let mut cast_shadows = None;
        let mut receive_shadows = None;
        let mut double_sided = None;
        let mut material = None;
        visit("Shape", map, |key, value| match key {
            "id" => set(&mut id, i64_of(value)),
            "shapeType" => set(
                &mut kind,
                i64_of(value)
                    .ok()
                    .and_then(ShapeKind::from_code)
                    .ok_or(FieldError::Expected("shapeType 1, 2 or 3")),
            ),
            "centerPosition" => set(&mut center_position, vec3_of(value)),
            "normal" => set(&mut normal, vec3_of(value)),
            "size" => set(&mut size, vec3_of(value)),
            "scale" => set(&mut scale, vec3_of(value)),
            "castShadows" => set(&mut cast_shadows, bool_of(value)),
            "receiveShadows" => set(&mut receive_shadows, bool_of(value)),
            "doubleSided" => set(&mut double_sided, bool_of(value)),
            "material" => set(&mut material, map_of(value).map(MaterialRef::deserialize)),
            _ => Err(FieldError::Unknown),
        });
        let Some(kind) = kind else {
            log::warn!("Shape {id:?} has no valid shapeType; skipping it");
            return None;
        };
        Some(Self {
            id,
            kind,
            center_position,
            normal,
            size,
            scale,
            cast_shadows: cast_shadows.unwrap_or(false),
            receive_shadows: receive_shadows.unwrap_or(false),
            double_sided: double_sided.unwrap_or(false),
            material,
        })
    }

    pub fn to_params(&self) -> ShapeParams {
        ShapeParams {
            kind: self.kind,
            center: self.center_position.unwrap_or(Vec3::ZERO),
            normal: self.normal.unwrap_or(Vec3::Y),
            size: self.size.unwrap_or(Vec3::ONE),
            scale: self.scale.unwrap_or(Vec3::ONE),
            cast_shadows: self.cast_shadows,
            receive_shadows: self.receive_shadows,
            double_sided: self.double_sided,
            material: self.material.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Shape;
    use crate::engine::ShapeKind;
    use glam::Vec3;
    use serde_json::json;

    #[test]
    fn cube_with_defaults() {
        let shape = Shape::deserialize(
            json!({"id": 4, "shapeType": 2, "size": [2, 2, 2], "castShadows": true})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(shape.kind, ShapeKind::Cube);
        let params = shape.to_params();
        assert_eq!(params.size, Vec3::splat(2.0));
        assert_eq!(params.scale, Vec3::ONE);
        assert!(params.cast_shadows && !params.receive_shadows);
    }

    #[test]
    fn unknown_shape_type_is_skipped() {
        assert!(Shape::deserialize(json!({"shapeType": 9}).as_object().unwrap()).is_none());
    }
}
