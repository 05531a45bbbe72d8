//! Primitives for turning loosely typed host maps into typed objects.
//!
//! Every deserializer walks its map with [`visit`]. The per-key callback
//! either stores a field or reports why it could not; [`visit`] does the
//! logging so a bad value never aborts the rest of the object.

use glam::{DVec2, Vec3, Vec4};
use serde_json::{Map, Value};

pub type ValueMap = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Unknown,
    Expected(&'static str),
}

pub type Field<T> = Result<T, FieldError>;

pub fn visit<F>(owner: &str, map: &ValueMap, mut field: F)
where
    F: FnMut(&str, &Value) -> Field<()>,
{
    log::trace!("++{owner}");
    for (key, value) in map {
        if value.is_null() {
            log::warn!("{owner} param '{key}' is null");
            continue;
        }
        match field(key, value) {
            Ok(()) => {}
            Err(FieldError::Unknown) => log::debug!("[{owner}] Unhandled parameter {key}"),
            Err(FieldError::Expected(expected)) => log::warn!(
                "{owner} param '{key}' expected {expected}, got {}",
                kind_of(value)
            ),
        }
    }
    log::trace!("--{owner}");
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

pub fn f64_of(value: &Value) -> Field<f64> {
    value.as_f64().ok_or(FieldError::Expected("number"))
}

pub fn f32_of(value: &Value) -> Field<f32> {
    f64_of(value).map(|v| v as f32)
}

pub fn i64_of(value: &Value) -> Field<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or(FieldError::Expected("integer")),
        _ => Err(FieldError::Expected("integer")),
    }
}

pub fn u32_of(value: &Value) -> Field<u32> {
    i64_of(value).and_then(|v| u32::try_from(v).map_err(|_| FieldError::Expected("unsigned integer")))
}

pub fn bool_of(value: &Value) -> Field<bool> {
    value.as_bool().ok_or(FieldError::Expected("bool"))
}

pub fn string_of(value: &Value) -> Field<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or(FieldError::Expected("string"))
}

pub fn map_of(value: &Value) -> Field<&ValueMap> {
    value.as_object().ok_or(FieldError::Expected("map"))
}

pub fn list_of(value: &Value) -> Field<&Vec<Value>> {
    value.as_array().ok_or(FieldError::Expected("list"))
}

pub fn f32_list_of(value: &Value) -> Field<Vec<f32>> {
    list_of(value)?
        .iter()
        .map(|v| f32_of(v).map_err(|_| FieldError::Expected("list of numbers")))
        .collect()
}

fn fixed_list<const N: usize>(value: &Value, expected: &'static str) -> Field<[f64; N]> {
    let list = list_of(value).map_err(|_| FieldError::Expected(expected))?;
    if list.len() != N {
        return Err(FieldError::Expected(expected));
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(list) {
        *slot = item.as_f64().ok_or(FieldError::Expected(expected))?;
    }
    Ok(out)
}

/// `{x, y, z}` with missing components as 0, or `[x, y, z]`.
pub fn vec3_of(value: &Value) -> Field<Vec3> {
    const EXPECTED: &str = "{x, y, z} map or list of 3 numbers";
    match value {
        Value::Object(map) => {
            let mut out = Vec3::ZERO;
            for (axis, slot) in ["x", "y", "z"].into_iter().zip([&mut out.x, &mut out.y, &mut out.z]) {
                if let Some(component) = map.get(axis).filter(|v| !v.is_null()) {
                    *slot = f32_of(component).map_err(|_| FieldError::Expected(EXPECTED))?;
                }
            }
            Ok(out)
        }
        Value::Array(_) => {
            fixed_list::<3>(value, EXPECTED).map(|[x, y, z]| Vec3::new(x as f32, y as f32, z as f32))
        }
        _ => Err(FieldError::Expected(EXPECTED)),
    }
}

pub fn dvec2_of(value: &Value) -> Field<DVec2> {
    fixed_list::<2>(value, "list of 2 numbers").map(DVec2::from_array)
}

pub fn vec4_of(value: &Value) -> Field<Vec4> {
    fixed_list::<4>(value, "list of 4 numbers")
        .map(|[x, y, z, w]| Vec4::new(x as f32, y as f32, z as f32, w as f32))
}

/// Parses an upper-case enumeration name through `parse`.
pub fn enum_of<T>(value: &Value, parse: fn(&str) -> Option<T>, expected: &'static str) -> Field<T> {
    value
        .as_str()
        .and_then(parse)
        .ok_or(FieldError::Expected(expected))
}

/// Stores `parsed` into `slot`, keeping the slot absent on error.
pub fn set<T>(slot: &mut Option<T>, parsed: Field<T>) -> Field<()> {
    *slot = Some(parsed?);
    Ok(())
}
