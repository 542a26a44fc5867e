//! JSON and YAML text in and out of typed nodes.

use kmodel_core::{MapError, MapResult, TypedNode};
use serde::Deserialize;
use serde_json::Value;

use crate::Mapper;

impl Mapper<'_> {
    pub fn from_json_str(&self, text: &str) -> MapResult<TypedNode> {
        let value: Value = serde_json::from_str(text)?;
        self.from_value(&value)
    }

    pub fn to_json_string(&self, node: &TypedNode, pretty: bool) -> MapResult<String> {
        let value = self.to_value(node);
        let text = if pretty { serde_json::to_string_pretty(&value)? } else { serde_json::to_string(&value)? };
        Ok(text)
    }

    /// Every document of a (possibly multi-document) YAML stream. Empty
    /// documents between separators are skipped.
    pub fn from_yaml_str(&self, text: &str) -> MapResult<Vec<TypedNode>> {
        let mut out = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(text) {
            let yaml = serde_yaml::Value::deserialize(doc).map_err(|e| MapError::Yaml(e.to_string()))?;
            if yaml.is_null() {
                continue;
            }
            let value = serde_json::to_value(yaml)?;
            out.push(self.from_value(&value)?);
        }
        Ok(out)
    }

    pub fn to_yaml_string(&self, node: &TypedNode) -> MapResult<String> {
        serde_yaml::to_string(&self.to_value(node)).map_err(|e| MapError::Yaml(e.to_string()))
    }
}
