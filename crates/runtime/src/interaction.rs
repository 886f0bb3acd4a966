//! Pointer interaction on the overlay layer: hover highlight, popup, legend.

use foundation::{FeatureId, LngLat};
use layers::html::escape_html;
use layers::symbology::{
    CIRCLE_OPACITY, NEUTRAL_STROKE_WIDTH, STROKE_COLOR, highlight_opacity, highlight_stroke_width,
};
use layers::{Expression, Feature, LayerId, Legend, PaintProperty, PollutantKind};
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::engine::{BindingId, MapEngine, PointerEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopup {
    pub at: LngLat,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverOutcome {
    /// A feature is under the pointer and now highlighted.
    Highlighted(Option<FeatureId>),
    /// Nothing under the pointer; paint reset and popup closed.
    Cleared,
}

/// Hover highlight and the single popup for one layer.
#[derive(Debug)]
pub struct HoverController {
    layer: LayerId,
    binding: Option<BindingId>,
    popup: Option<OpenPopup>,
}

impl HoverController {
    pub fn new(layer: LayerId) -> Self {
        Self {
            layer,
            binding: None,
            popup: None,
        }
    }

    pub fn binding(&self) -> Option<BindingId> {
        self.binding
    }

    pub fn popup(&self) -> Option<&OpenPopup> {
        self.popup.as_ref()
    }

    /// Registers the layer listeners, tearing down any previous registration first.
    pub fn bind<E: MapEngine + ?Sized>(&mut self, engine: &mut E) -> BindingId {
        self.unbind(engine);
        let binding = engine.bind_layer_events(&self.layer);
        debug!(layer = %self.layer, binding = binding.0, "hover listeners bound");
        self.binding = Some(binding);
        binding
    }

    pub fn unbind<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        if let Some(old) = self.binding.take() {
            engine.unbind_layer_events(old);
        }
    }

    pub fn on_pointer_move<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        pollutant: PollutantKind,
        event: PointerEvent,
    ) -> HoverOutcome {
        let features = engine.query_rendered_features(event.point, &self.layer);
        let Some(feature) = features.first() else {
            self.reset_paint(engine);
            self.close_popup(engine);
            return HoverOutcome::Cleared;
        };

        self.paint(
            engine,
            PaintProperty::CircleStrokeWidth,
            &highlight_stroke_width(feature.id),
        );
        self.paint(
            engine,
            PaintProperty::CircleStrokeColor,
            &Expression::color(STROKE_COLOR),
        );
        self.paint(
            engine,
            PaintProperty::CircleOpacity,
            &highlight_opacity(feature.id),
        );

        let html = popup_html(feature, pollutant);
        engine.show_popup(event.lng_lat, &html);
        self.popup = Some(OpenPopup {
            at: event.lng_lat,
            html,
        });
        HoverOutcome::Highlighted(feature.id)
    }

    pub fn on_pointer_leave<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        self.close_popup(engine);
        self.reset_paint(engine);
    }

    fn close_popup<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        if self.popup.take().is_some() {
            engine.hide_popup();
        }
    }

    fn reset_paint<E: MapEngine + ?Sized>(&self, engine: &mut E) {
        if !engine.has_layer(&self.layer) {
            return;
        }
        self.paint(
            engine,
            PaintProperty::CircleStrokeWidth,
            &Expression::number(NEUTRAL_STROKE_WIDTH),
        );
        self.paint(
            engine,
            PaintProperty::CircleOpacity,
            &Expression::number(CIRCLE_OPACITY),
        );
    }

    fn paint<E: MapEngine + ?Sized>(&self, engine: &mut E, property: PaintProperty, value: &Expression) {
        if let Err(err) = engine.set_paint_property(&self.layer, property, value) {
            warn!(layer = %self.layer, property = property.name(), error = %err, "hover paint failed");
        }
    }
}

/// Popup body: location line and the selected pollutant's value.
pub fn popup_html(feature: &Feature, pollutant: PollutantKind) -> String {
    let field = pollutant.field();
    format!(
        "<strong>Location: {}, {}</strong><br>{}: {}",
        escape_html(feature.county().unwrap_or("Unknown")),
        escape_html(feature.state().unwrap_or("Unknown")),
        escape_html(field),
        escape_html(&display_value(feature.property(field))),
    )
}

fn display_value(value: Option<&Json>) -> String {
    match value {
        None | Some(Json::Null) => "n/a".to_string(),
        Some(Json::String(s)) if s.trim().is_empty() => "n/a".to_string(),
        Some(Json::String(s)) => s.clone(),
        Some(Json::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Creates the legend, or refreshes the existing one in place.
pub fn ensure_legend<E: MapEngine + ?Sized>(engine: &mut E, legend: &Legend) {
    engine.upsert_legend(legend);
}

#[cfg(test)]
mod tests {
    use super::{HoverController, HoverOutcome, ensure_legend, popup_html};
    use crate::engine::PointerEvent;
    use crate::recording::{EngineCall, RecordingEngine};
    use foundation::{FeatureId, LngLat, ScreenPoint};
    use layers::symbology::{highlight_opacity, highlight_stroke_width};
    use layers::{
        CircleLayerSpec, Expression, Feature, LayerId, Legend, PaintProperty, PollutantKind,
        SourceSpec, Value,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kern() -> Feature {
        Feature::new(Some(FeatureId(4)))
            .with_property("County", "Kern")
            .with_property("State", "California")
            .with_property("Year", 2020)
            .with_property("Days PM2_5", 41)
            .with_property("Days Ozone", 150)
    }

    fn setup() -> (RecordingEngine, HoverController) {
        let mut engine = RecordingEngine::new("style");
        engine
            .add_source_unchecked("air_quality", SourceSpec::vector("mapbox://t"))
            .add_layer_unchecked(CircleLayerSpec::pollution(
                LayerId::new("air_quality"),
                "air_quality",
                "points",
                PollutantKind::Pm25,
            ));
        engine.place_feature(ScreenPoint::new(100.0, 100.0), kern());
        engine.drain_calls();
        (engine, HoverController::new(LayerId::new("air_quality")))
    }

    fn over_kern() -> PointerEvent {
        PointerEvent::new(ScreenPoint::new(101.0, 99.0), LngLat::new(-119.0, 35.3))
    }

    fn away() -> PointerEvent {
        PointerEvent::new(ScreenPoint::new(500.0, 500.0), LngLat::new(-90.0, 40.0))
    }

    #[test]
    fn popup_lists_location_and_value() {
        assert_eq!(
            popup_html(&kern(), PollutantKind::Ozone),
            "<strong>Location: Kern, California</strong><br>Days Ozone: 150"
        );
        assert_eq!(
            popup_html(&kern(), PollutantKind::MaxAqi),
            "<strong>Location: Kern, California</strong><br>Max AQI: n/a"
        );
    }

    #[test]
    fn popup_escapes_and_formats_decimals() {
        let f = Feature::default()
            .with_property("County", "<Ada>")
            .with_property("State", "ID")
            .with_property("Max AQI", json!(12.5));
        assert_eq!(
            popup_html(&f, PollutantKind::MaxAqi),
            "<strong>Location: &lt;Ada&gt;, ID</strong><br>Max AQI: 12.5"
        );
    }

    #[test]
    fn hover_highlights_first_feature_and_opens_popup() {
        let (mut engine, mut hover) = setup();
        let outcome = hover.on_pointer_move(&mut engine, PollutantKind::Pm25, over_kern());
        assert_eq!(outcome, HoverOutcome::Highlighted(Some(FeatureId(4))));

        let layer = engine.layer(&LayerId::new("air_quality")).unwrap();
        assert_eq!(
            layer.paint(PaintProperty::CircleStrokeWidth),
            Some(&highlight_stroke_width(Some(FeatureId(4))))
        );
        assert_eq!(
            layer.paint(PaintProperty::CircleOpacity),
            Some(&highlight_opacity(Some(FeatureId(4))))
        );
        let (at, html) = engine.popup().unwrap();
        assert_eq!(*at, LngLat::new(-119.0, 35.3));
        assert!(html.ends_with("Days PM2_5: 41"));
        assert_eq!(hover.popup().map(|p| p.at), Some(LngLat::new(-119.0, 35.3)));
    }

    #[test]
    fn empty_hit_resets_paint_and_dismisses_popup() {
        let (mut engine, mut hover) = setup();
        hover.on_pointer_move(&mut engine, PollutantKind::Pm25, over_kern());
        engine.drain_calls();

        assert_eq!(
            hover.on_pointer_move(&mut engine, PollutantKind::Pm25, away()),
            HoverOutcome::Cleared
        );
        let layer = LayerId::new("air_quality");
        assert_eq!(
            engine.drain_calls(),
            vec![
                EngineCall::SetPaint(
                    layer.clone(),
                    PaintProperty::CircleStrokeWidth,
                    Expression::number(0.5)
                ),
                EngineCall::SetPaint(layer, PaintProperty::CircleOpacity, Expression::number(0.8)),
                EngineCall::HidePopup,
            ]
        );
        assert!(engine.popup().is_none());
        assert!(hover.popup().is_none());
    }

    #[test]
    fn popup_content_follows_current_pollutant() {
        let (mut engine, mut hover) = setup();
        hover.on_pointer_move(&mut engine, PollutantKind::Pm25, over_kern());
        assert!(engine.popup().unwrap().1.ends_with("Days PM2_5: 41"));
        hover.on_pointer_move(&mut engine, PollutantKind::Ozone, over_kern());
        assert!(engine.popup().unwrap().1.ends_with("Days Ozone: 150"));
    }

    #[test]
    fn leaving_closes_popup() {
        let (mut engine, mut hover) = setup();
        hover.on_pointer_move(&mut engine, PollutantKind::Pm25, over_kern());
        hover.on_pointer_leave(&mut engine);
        assert!(engine.popup().is_none());
        assert_eq!(
            engine
                .layer(&LayerId::new("air_quality"))
                .unwrap()
                .paint(PaintProperty::CircleOpacity),
            Some(&Expression::number(0.8))
        );
    }

    #[test]
    fn hovering_id_less_point_highlights_only_that_point() {
        let (mut engine, mut hover) = setup();
        let anonymous = Feature::new(None)
            .with_property("County", "Inyo")
            .with_property("State", "California")
            .with_property("Year", 2020)
            .with_property("Days PM2_5", 3);
        engine.place_feature(ScreenPoint::new(300.0, 300.0), anonymous);
        let at = PointerEvent::new(ScreenPoint::new(300.0, 300.0), LngLat::new(-117.0, 36.5));
        assert_eq!(
            hover.on_pointer_move(&mut engine, PollutantKind::Pm25, at),
            HoverOutcome::Highlighted(None)
        );

        let layer = engine.layer(&LayerId::new("air_quality")).unwrap();
        let other = Feature::new(None).with_property("County", "Mono");
        let width = layer.paint(PaintProperty::CircleStrokeWidth).unwrap();
        let opacity = layer.paint(PaintProperty::CircleOpacity).unwrap();
        assert_eq!(width.evaluate(&other).unwrap(), Value::Number(0.5));
        assert_eq!(opacity.evaluate(&other).unwrap(), Value::Number(0.6));
    }

    #[test]
    fn rebinding_never_doubles_listeners() {
        let (mut engine, mut hover) = setup();
        let first = hover.bind(&mut engine);
        let second = hover.bind(&mut engine);
        assert_ne!(first, second);
        assert_eq!(engine.active_bindings(), vec![second]);
        hover.unbind(&mut engine);
        assert!(engine.active_bindings().is_empty());
    }

    #[test]
    fn legend_upsert_is_idempotent() {
        let (mut engine, _) = setup();
        let legend = Legend::severity();
        ensure_legend(&mut engine, &legend);
        ensure_legend(&mut engine, &legend);
        assert_eq!(engine.legend(), Some(&legend));
        assert_eq!(engine.legend_count(), 1);
    }
}
