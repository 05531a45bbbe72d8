use crate::value::{list_of, map_of, set, string_of, visit, Field, FieldError, ValueMap};
use serde_json::Value;
use std::collections::BTreeMap;

/// Material to apply to a ground or shape, plus named parameter overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialRef {
    pub asset_path: Option<String>,
    pub url: Option<String>,
    pub parameters: BTreeMap<String, Value>,
}

/// `[{name, value}, ...]` or a plain `{name: value}` map.
fn parameters_of(value: &Value) -> Field<BTreeMap<String, Value>> {
    if let Ok(map) = map_of(value) {
        return Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    }
    let mut out = BTreeMap::new();
    for item in list_of(value)? {
        let entry = map_of(item).map_err(|_| FieldError::Expected("list of {name, value} maps"))?;
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .ok_or(FieldError::Expected("material parameter name"))?;
        let value = entry.get("value").cloned().unwrap_or(Value::Null);
        out.insert(name.to_string(), value);
    }
    Ok(out)
}

impl MaterialRef {
    pub fn deserialize(map: &ValueMap) -> Self {
        let mut out = Self::default();
        let mut parameters = None;
        visit("Material", map, |key, value| match key {
            "assetPath" => set(&mut out.asset_path, string_of(value)),
            "url" => set(&mut out.url, string_of(value)),
            "parameters" => set(&mut parameters, parameters_of(value)),
            _ => Err(FieldError::Unknown),
        });
        out.parameters = parameters.unwrap_or_default();
        out
    }
}
