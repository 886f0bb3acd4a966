use layers::{FilterState, LayerId, PaintProperty, symbology};
use tracing::{debug, warn};

use crate::engine::{EngineError, MapEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    /// Layer absent; nothing was changed.
    LayerMissing,
    /// The engine refused one of the updates.
    Failed(EngineError),
}

/// Pushes the current filter state onto the overlay layer.
#[derive(Debug, Clone)]
pub struct StyleSynchronizer {
    layer: LayerId,
}

impl StyleSynchronizer {
    pub fn new(layer: LayerId) -> Self {
        Self { layer }
    }

    pub fn layer(&self) -> &LayerId {
        &self.layer
    }

    /// Sets radius, color and filter, in that order.
    pub fn apply_style<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        filter: &FilterState,
    ) -> SyncOutcome {
        if !engine.has_layer(&self.layer) {
            warn!(layer = %self.layer, "layer not found, style update skipped");
            return SyncOutcome::LayerMissing;
        }

        let kind = filter.pollutant();
        let result = engine
            .set_paint_property(
                &self.layer,
                PaintProperty::CircleRadius,
                &symbology::radius_scale(kind),
            )
            .and_then(|()| {
                engine.set_paint_property(
                    &self.layer,
                    PaintProperty::CircleColor,
                    &symbology::color_scale(kind),
                )
            })
            .and_then(|()| engine.set_filter(&self.layer, &filter.filter_expression()));

        match result {
            Ok(()) => {
                debug!(
                    layer = %self.layer,
                    field = kind.field(),
                    year = %filter.year(),
                    "style applied"
                );
                SyncOutcome::Applied
            }
            Err(err) => {
                warn!(layer = %self.layer, error = %err, "style update failed");
                SyncOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StyleSynchronizer, SyncOutcome};
    use crate::recording::{EngineCall, RecordingEngine};
    use layers::{CircleLayerSpec, FilterState, LayerId, PaintProperty, PollutantKind, SourceSpec};
    use foundation::Year;
    use layers::symbology::{color_scale, radius_scale};
    use pretty_assertions::assert_eq;

    fn engine_with_layer() -> RecordingEngine {
        let mut engine = RecordingEngine::new("mapbox://styles/mapbox/dark-v10");
        engine
            .add_source_unchecked("air_quality", SourceSpec::vector("mapbox://t"))
            .add_layer_unchecked(CircleLayerSpec::pollution(
                LayerId::new("air_quality"),
                "air_quality",
                "points",
                PollutantKind::Pm25,
            ));
        engine.drain_calls();
        engine
    }

    #[test]
    fn applies_radius_color_then_filter() {
        let mut engine = engine_with_layer();
        let sync = StyleSynchronizer::new(LayerId::new("air_quality"));
        let mut filter = FilterState::default();
        filter.set_pollutant("o3");
        filter.set_year(Year(2015));

        assert_eq!(sync.apply_style(&mut engine, &filter), SyncOutcome::Applied);
        let layer = LayerId::new("air_quality");
        assert_eq!(
            engine.drain_calls(),
            vec![
                EngineCall::SetPaint(
                    layer.clone(),
                    PaintProperty::CircleRadius,
                    radius_scale(PollutantKind::Ozone)
                ),
                EngineCall::SetPaint(
                    layer.clone(),
                    PaintProperty::CircleColor,
                    color_scale(PollutantKind::Ozone)
                ),
                EngineCall::SetFilter(layer, filter.filter_expression()),
            ]
        );
    }

    #[test]
    fn missing_layer_is_skipped() {
        let mut engine = RecordingEngine::new("mapbox://styles/mapbox/dark-v10");
        let sync = StyleSynchronizer::new(LayerId::new("air_quality"));
        assert_eq!(
            sync.apply_style(&mut engine, &FilterState::default()),
            SyncOutcome::LayerMissing
        );
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut engine = engine_with_layer();
        let sync = StyleSynchronizer::new(LayerId::new("air_quality"));
        let filter = FilterState::default();

        sync.apply_style(&mut engine, &filter);
        let once = engine.layer(sync.layer()).cloned();
        sync.apply_style(&mut engine, &filter);
        let twice = engine.layer(sync.layer()).cloned();

        assert_eq!(once, twice);
        let layer = twice.unwrap();
        assert_eq!(layer.paint.len(), 3);
        assert_eq!(layer.filter, Some(filter.filter_expression()));
    }
}
