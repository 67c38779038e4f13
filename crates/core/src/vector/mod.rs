//! Vector features and GeoJSON serialization
//!
//! The vectorizer emits change sites as polygon features with measurement
//! attributes. Attribute order is kept deterministic so exported GeoJSON
//! is stable across runs.

use std::collections::BTreeMap;

use geo_types::{Geometry, Polygon};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    fn to_json(&self) -> Value {
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => json!(b),
            AttributeValue::Int(i) => json!(i),
            AttributeValue::Float(f) => json!(f),
            AttributeValue::String(s) => json!(s),
        }
    }
}

/// A geographic feature: geometry plus attributes.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: BTreeMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry and no attributes
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Serialize the collection as a GeoJSON FeatureCollection.
    ///
    /// Only polygon geometries are supported, matching what the vectorizer
    /// produces.
    pub fn to_geojson(&self) -> Result<String> {
        let features: Result<Vec<Value>> = self.features.iter().map(feature_to_json).collect();
        let doc = json!({
            "type": "FeatureCollection",
            "features": features?,
        });
        serde_json::to_string_pretty(&doc).map_err(|e| Error::Other(e.to_string()))
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

fn feature_to_json(feature: &Feature) -> Result<Value> {
    let geometry = match &feature.geometry {
        Geometry::Polygon(p) => polygon_to_json(p),
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "geometry {other:?} cannot be exported"
            )))
        }
    };

    let mut properties = Map::new();
    for (k, v) in &feature.properties {
        properties.insert(k.clone(), v.to_json());
    }

    let mut obj = Map::new();
    obj.insert("type".into(), json!("Feature"));
    if let Some(id) = &feature.id {
        obj.insert("id".into(), json!(id));
    }
    obj.insert("geometry".into(), geometry);
    obj.insert("properties".into(), Value::Object(properties));
    Ok(Value::Object(obj))
}

fn polygon_to_json(polygon: &Polygon<f64>) -> Value {
    let ring_coords = |ring: &geo_types::LineString<f64>| -> Vec<Value> {
        ring.coords().map(|c| json!([c.x, c.y])).collect()
    };
    let mut rings = vec![ring_coords(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_coords));
    json!({
        "type": "Polygon",
        "coordinates": rings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn square() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]
    }

    #[test]
    fn test_geojson_structure() {
        let mut f = Feature::new(Geometry::Polygon(square()));
        f.set_property("area_ha", AttributeValue::Float(0.25));
        f.set_property("n", AttributeValue::Int(3));
        let mut fc = FeatureCollection::new();
        fc.push(f);

        let text = fc.to_geojson().unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["type"], "FeatureCollection");
        assert_eq!(doc["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(doc["features"][0]["properties"]["area_ha"], 0.25);
        assert_eq!(doc["features"][0]["properties"]["n"], 3);
    }

    #[test]
    fn test_non_polygon_rejected() {
        let fc = FeatureCollection {
            features: vec![Feature::new(Geometry::Point(geo_types::Point::new(
                0.0, 0.0,
            )))],
        };
        assert!(fc.to_geojson().is_err());
    }
}
