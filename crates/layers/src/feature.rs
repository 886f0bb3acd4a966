use foundation::FeatureId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// A rendered point as reported by the engine's hit-testing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<FeatureId>,
    #[serde(default)]
    pub properties: Map<String, Json>,
}

impl Feature {
    pub fn new(id: Option<FeatureId>) -> Self {
        Self {
            id,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Json> {
        self.properties.get(key)
    }

    pub fn county(&self) -> Option<&str> {
        self.property("County").and_then(Json::as_str)
    }

    pub fn state(&self) -> Option<&str> {
        self.property("State").and_then(Json::as_str)
    }

    pub fn year(&self) -> Option<i64> {
        self.property("Year").and_then(Json::as_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::Feature;
    use foundation::FeatureId;

    #[test]
    fn deserializes_engine_feature() {
        let raw = r#"{"id": 12, "properties": {"County": "Kern", "State": "California", "Year": 2020, "Days Ozone": 150}}"#;
        let f: Feature = serde_json::from_str(raw).unwrap();
        assert_eq!(f.id, Some(FeatureId(12)));
        assert_eq!(f.county(), Some("Kern"));
        assert_eq!(f.state(), Some("California"));
        assert_eq!(f.year(), Some(2020));
    }

    #[test]
    fn id_and_properties_are_optional() {
        let f: Feature = serde_json::from_str("{}").unwrap();
        assert_eq!(f, Feature::default());
        assert_eq!(f.county(), None);
    }
}
