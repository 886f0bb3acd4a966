use serde_json::{Map, Value as Json, json};

use crate::expression::Expression;
use crate::filter::PollutantKind;
use crate::symbology::{CIRCLE_OPACITY, color_scale, radius_scale};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Circle paint properties the overlay touches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaintProperty {
    CircleRadius,
    CircleColor,
    CircleOpacity,
    CircleStrokeWidth,
    CircleStrokeColor,
}

impl PaintProperty {
    pub fn name(self) -> &'static str {
        match self {
            PaintProperty::CircleRadius => "circle-radius",
            PaintProperty::CircleColor => "circle-color",
            PaintProperty::CircleOpacity => "circle-opacity",
            PaintProperty::CircleStrokeWidth => "circle-stroke-width",
            PaintProperty::CircleStrokeColor => "circle-stroke-color",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Vector tileset addressed by URL (`mapbox://owner.tileset`).
    Vector { url: String },
}

impl SourceSpec {
    pub fn vector(url: impl Into<String>) -> Self {
        SourceSpec::Vector { url: url.into() }
    }

    pub fn to_json(&self) -> Json {
        match self {
            SourceSpec::Vector { url } => json!({ "type": "vector", "url": url }),
        }
    }
}

/// A circle layer bound to one source layer of a vector source.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleLayerSpec {
    pub id: LayerId,
    pub source: String,
    pub source_layer: String,
    /// Kept in insertion order; the engine applies them in this order.
    pub paint: Vec<(PaintProperty, Expression)>,
    pub filter: Option<Expression>,
}

impl CircleLayerSpec {
    pub fn new(id: LayerId, source: impl Into<String>, source_layer: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            source_layer: source_layer.into(),
            paint: Vec::new(),
            filter: None,
        }
    }

    /// The pollution overlay with scales for `kind`.
    pub fn pollution(
        id: LayerId,
        source: impl Into<String>,
        source_layer: impl Into<String>,
        kind: PollutantKind,
    ) -> Self {
        Self::new(id, source, source_layer)
            .with_paint(PaintProperty::CircleRadius, radius_scale(kind))
            .with_paint(PaintProperty::CircleColor, color_scale(kind))
            .with_paint(PaintProperty::CircleOpacity, Expression::number(CIRCLE_OPACITY))
    }

    pub fn with_paint(mut self, property: PaintProperty, value: Expression) -> Self {
        match self.paint.iter_mut().find(|(p, _)| *p == property) {
            Some(slot) => slot.1 = value,
            None => self.paint.push((property, value)),
        }
        self
    }

    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn paint(&self, property: PaintProperty) -> Option<&Expression> {
        self.paint
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, e)| e)
    }

    /// Engine `addLayer` payload.
    pub fn to_json(&self) -> Json {
        let mut paint = Map::new();
        for (property, value) in &self.paint {
            paint.insert(property.name().to_string(), value.to_json());
        }
        let mut out = json!({
            "id": self.id.as_str(),
            "type": "circle",
            "source": self.source,
            "source-layer": self.source_layer,
            "paint": paint,
        });
        if let (Some(filter), Json::Object(obj)) = (&self.filter, &mut out) {
            obj.insert("filter".to_string(), filter.to_json());
        }
        out
    }
}
