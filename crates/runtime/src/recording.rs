//! In-memory [`MapEngine`] that records every call.
//!
//! It models the parts of the engine the overlay depends on: a style swap
//! discards every source and layer, adds fail until the new style has loaded,
//! and hit-testing honours the layer filter.

use std::collections::{BTreeMap, BTreeSet};

use foundation::{LngLat, ScreenPoint};
use layers::{
    CircleLayerSpec, Expression, Feature, LayerId, Legend, PaintProperty, SourceSpec, Value,
};

use crate::engine::{BindingId, EngineError, MapEngine, MapEvent, TransitionToken};

/// Pointer distance within which a placed feature counts as hit.
pub const HIT_RADIUS_PX: f64 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    AddSource(String),
    AddLayer(LayerId),
    SetPaint(LayerId, PaintProperty, Expression),
    SetFilter(LayerId, Expression),
    SetStyle(String),
    NotifyStyleLoaded(TransitionToken),
    ShowPopup(LngLat, String),
    HidePopup,
    UpsertLegend(String),
    Bind(BindingId),
    Unbind(BindingId),
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    style: String,
    style_loading: bool,
    sources: BTreeMap<String, SourceSpec>,
    layers: Vec<CircleLayerSpec>,
    placed: Vec<(ScreenPoint, Feature)>,
    popup: Option<(LngLat, String)>,
    legend: Option<Legend>,
    legend_count: usize,
    bindings: BTreeSet<BindingId>,
    next_binding: u64,
    pending_loads: Vec<TransitionToken>,
    calls: Vec<EngineCall>,
}

impl RecordingEngine {
    /// An engine whose initial style has already loaded.
    pub fn new(style: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            ..Self::default()
        }
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn is_style_loading(&self) -> bool {
        self.style_loading
    }

    pub fn layer(&self, id: &LayerId) -> Option<&CircleLayerSpec> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn popup(&self) -> Option<&(LngLat, String)> {
        self.popup.as_ref()
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    /// Number of distinct legend elements ever created.
    pub fn legend_count(&self) -> usize {
        self.legend_count
    }

    pub fn active_bindings(&self) -> Vec<BindingId> {
        self.bindings.iter().copied().collect()
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn drain_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    /// Puts a rendered feature at a screen position for hit-testing.
    pub fn place_feature(&mut self, at: ScreenPoint, feature: Feature) -> &mut Self {
        self.placed.push((at, feature));
        self
    }

    /// Seeds a source without going through the trait (no call is recorded).
    pub fn add_source_unchecked(&mut self, id: impl Into<String>, spec: SourceSpec) -> &mut Self {
        self.sources.insert(id.into(), spec);
        self
    }

    /// Seeds a layer without going through the trait (no call is recorded).
    pub fn add_layer_unchecked(&mut self, spec: CircleLayerSpec) -> &mut Self {
        self.layers.retain(|l| l.id != spec.id);
        self.layers.push(spec);
        self
    }

    /// Finishes loading the current style and returns the queued notifications.
    pub fn finish_style_load(&mut self) -> Vec<MapEvent> {
        self.style_loading = false;
        self.pending_loads
            .drain(..)
            .map(MapEvent::StyleLoaded)
            .collect()
    }

    fn emit(&mut self, call: EngineCall) {
        self.calls.push(call);
    }

    fn layer_mut(&mut self, id: &LayerId) -> Result<&mut CircleLayerSpec, EngineError> {
        self.layers
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| EngineError::LayerNotFound(id.to_string()))
    }
}

impl MapEngine for RecordingEngine {
    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &LayerId) -> bool {
        self.layer(id).is_some()
    }

    fn add_source(&mut self, id: &str, spec: &SourceSpec) -> Result<(), EngineError> {
        if self.style_loading {
            return Err(EngineError::StyleNotLoaded);
        }
        if self.sources.contains_key(id) {
            return Err(EngineError::AlreadyExists {
                kind: "source",
                id: id.to_string(),
            });
        }
        self.sources.insert(id.to_string(), spec.clone());
        self.emit(EngineCall::AddSource(id.to_string()));
        Ok(())
    }

    fn add_layer(&mut self, spec: &CircleLayerSpec) -> Result<(), EngineError> {
        if self.style_loading {
            return Err(EngineError::StyleNotLoaded);
        }
        if self.has_layer(&spec.id) {
            return Err(EngineError::AlreadyExists {
                kind: "layer",
                id: spec.id.to_string(),
            });
        }
        if !self.sources.contains_key(&spec.source) {
            return Err(EngineError::SourceNotFound(spec.source.clone()));
        }
        self.layers.push(spec.clone());
        self.emit(EngineCall::AddLayer(spec.id.clone()));
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        layer: &LayerId,
        property: PaintProperty,
        value: &Expression,
    ) -> Result<(), EngineError> {
        let spec = self.layer_mut(layer)?;
        let updated = spec.clone().with_paint(property, value.clone());
        *spec = updated;
        self.emit(EngineCall::SetPaint(layer.clone(), property, value.clone()));
        Ok(())
    }

    fn set_filter(&mut self, layer: &LayerId, filter: &Expression) -> Result<(), EngineError> {
        self.layer_mut(layer)?.filter = Some(filter.clone());
        self.emit(EngineCall::SetFilter(layer.clone(), filter.clone()));
        Ok(())
    }

    fn set_style(&mut self, url: &str) {
        self.style = url.to_string();
        self.style_loading = true;
        self.sources.clear();
        self.layers.clear();
        self.emit(EngineCall::SetStyle(url.to_string()));
    }

    fn notify_style_loaded(&mut self, token: TransitionToken) {
        self.pending_loads.push(token);
        self.emit(EngineCall::NotifyStyleLoaded(token));
    }

    fn query_rendered_features(&self, point: ScreenPoint, layer: &LayerId) -> Vec<Feature> {
        let Some(spec) = self.layer(layer) else {
            return Vec::new();
        };
        let mut hits: Vec<(f64, &Feature)> = self
            .placed
            .iter()
            .map(|(at, feature)| (at.distance_to(point), feature))
            .filter(|(d, _)| *d <= HIT_RADIUS_PX)
            .filter(|(_, feature)| match &spec.filter {
                None => true,
                Some(filter) => matches!(filter.evaluate(feature), Ok(Value::Bool(true))),
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, f)| f.clone()).collect()
    }

    fn show_popup(&mut self, at: LngLat, html: &str) {
        self.popup = Some((at, html.to_string()));
        self.emit(EngineCall::ShowPopup(at, html.to_string()));
    }

    fn hide_popup(&mut self) {
        self.popup = None;
        self.emit(EngineCall::HidePopup);
    }

    fn upsert_legend(&mut self, legend: &Legend) {
        let reuses = self
            .legend
            .as_ref()
            .is_some_and(|l| l.element_id == legend.element_id);
        if !reuses {
            self.legend_count += 1;
        }
        self.legend = Some(legend.clone());
        self.emit(EngineCall::UpsertLegend(legend.element_id.clone()));
    }

    fn bind_layer_events(&mut self, _layer: &LayerId) -> BindingId {
        self.next_binding += 1;
        let binding = BindingId(self.next_binding);
        self.bindings.insert(binding);
        self.emit(EngineCall::Bind(binding));
        binding
    }

    fn unbind_layer_events(&mut self, binding: BindingId) {
        self.bindings.remove(&binding);
        self.emit(EngineCall::Unbind(binding));
    }
}

#[cfg(test)]
mod tests {
    use super::RecordingEngine;
    use crate::engine::{EngineError, MapEngine, MapEvent, TransitionToken};
    use foundation::{FeatureId, ScreenPoint};
    use layers::{CircleLayerSpec, Expression, Feature, LayerId, PaintProperty, SourceSpec};
    use pretty_assertions::assert_eq;

    fn layer() -> CircleLayerSpec {
        CircleLayerSpec::new(LayerId::new("l"), "s", "sl")
    }

    #[test]
    fn style_swap_discards_sources_and_layers() {
        let mut engine = RecordingEngine::new("a");
        engine.add_source("s", &SourceSpec::vector("u")).unwrap();
        engine.add_layer(&layer()).unwrap();
        engine.set_style("b");
        assert!(!engine.has_source("s"));
        assert!(!engine.has_layer(&LayerId::new("l")));
        assert_eq!(
            engine.add_source("s", &SourceSpec::vector("u")),
            Err(EngineError::StyleNotLoaded)
        );
    }

    #[test]
    fn load_notifications_fire_once() {
        let mut engine = RecordingEngine::new("a");
        engine.set_style("b");
        engine.notify_style_loaded(TransitionToken(1));
        assert_eq!(
            engine.finish_style_load(),
            vec![MapEvent::StyleLoaded(TransitionToken(1))]
        );
        assert!(engine.finish_style_load().is_empty());
        assert!(!engine.is_style_loading());
    }

    #[test]
    fn layer_requires_its_source() {
        let mut engine = RecordingEngine::new("a");
        assert_eq!(
            engine.add_layer(&layer()),
            Err(EngineError::SourceNotFound("s".to_string()))
        );
    }

    #[test]
    fn duplicate_adds_are_rejected() {
        let mut engine = RecordingEngine::new("a");
        engine.add_source("s", &SourceSpec::vector("u")).unwrap();
        assert!(matches!(
            engine.add_source("s", &SourceSpec::vector("u")),
            Err(EngineError::AlreadyExists { kind: "source", .. })
        ));
    }

    #[test]
    fn paint_on_missing_layer_fails() {
        let mut engine = RecordingEngine::new("a");
        assert_eq!(
            engine.set_paint_property(
                &LayerId::new("l"),
                PaintProperty::CircleOpacity,
                &Expression::number(1.0)
            ),
            Err(EngineError::LayerNotFound("l".to_string()))
        );
    }

    #[test]
    fn hit_testing_respects_radius_order_and_filter() {
        let mut engine = RecordingEngine::new("a");
        engine
            .add_source_unchecked("s", SourceSpec::vector("u"))
            .add_layer_unchecked(layer().with_filter(Expression::has("keep")))
            .place_feature(
                ScreenPoint::new(3.0, 0.0),
                Feature::new(Some(FeatureId(1))).with_property("keep", 1),
            )
            .place_feature(
                ScreenPoint::new(1.0, 0.0),
                Feature::new(Some(FeatureId(2))).with_property("keep", 1),
            )
            .place_feature(ScreenPoint::new(0.0, 0.0), Feature::new(Some(FeatureId(3))))
            .place_feature(
                ScreenPoint::new(50.0, 0.0),
                Feature::new(Some(FeatureId(4))).with_property("keep", 1),
            );
        let ids: Vec<_> = engine
            .query_rendered_features(ScreenPoint::new(0.0, 0.0), &LayerId::new("l"))
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![Some(FeatureId(2)), Some(FeatureId(1))]);
    }
}
