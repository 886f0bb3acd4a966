use foundation::Year;
use layers::{FilterState, Legend, PollutantKind};
use tracing::{info, warn};

use crate::basemap::BasemapController;
use crate::config::{ConfigError, MapConfig};
use crate::engine::{MapEngine, MapEvent, PointerEvent, TransitionToken};
use crate::interaction::{HoverController, HoverOutcome, ensure_legend};
use crate::overlay::Overlay;
use crate::sync::{StyleSynchronizer, SyncOutcome};

/// Result of handling a style-load notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restore {
    /// Overlay re-added and restyled, listeners rebound.
    Restored(SyncOutcome),
    /// Token belonged to a switch that was superseded.
    Stale,
    /// Source or layer could not be re-added.
    Failed(String),
}

/// The air-quality page: one filter state, one overlay, one popup.
pub struct AirQualityApp<E: MapEngine> {
    engine: E,
    config: MapConfig,
    filter: FilterState,
    overlay: Overlay,
    sync: StyleSynchronizer,
    hover: HoverController,
    basemaps: BasemapController,
    legend: Legend,
}

impl<E: MapEngine> AirQualityApp<E> {
    pub fn new(engine: E, config: MapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let overlay = config.overlay();
        let filter = FilterState::new(config.initial_pollutant, config.initial_year, config.years);
        let basemaps = BasemapController::new(config.basemaps.clone(), config.initial_basemap)?;
        Ok(Self {
            engine,
            sync: StyleSynchronizer::new(overlay.layer_id.clone()),
            hover: HoverController::new(overlay.layer_id.clone()),
            overlay,
            filter,
            basemaps,
            legend: Legend::severity(),
            config,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn basemaps(&self) -> &BasemapController {
        &self.basemaps
    }

    pub fn hover(&self) -> &HoverController {
        &self.hover
    }

    pub fn handle_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::Loaded => {
                self.on_map_loaded();
            }
            MapEvent::PointerMove(pointer) => {
                self.on_pointer_move(pointer);
            }
            MapEvent::PointerLeave => self.on_pointer_leave(),
            MapEvent::StyleLoaded(token) => {
                self.on_style_loaded(token);
            }
        }
    }

    /// First load: legend, overlay, style, listeners.
    ///
    /// The legend does not depend on the layer and is shown even when the
    /// overlay cannot be added.
    pub fn on_map_loaded(&mut self) -> SyncOutcome {
        ensure_legend(&mut self.engine, &self.legend);
        if let Err(err) = self.overlay.ensure(&mut self.engine, &self.filter) {
            warn!(error = %err, "pollution overlay could not be added");
            return SyncOutcome::Failed(err);
        }
        let outcome = self.sync.apply_style(&mut self.engine, &self.filter);
        self.hover.bind(&mut self.engine);
        info!(
            style = self.basemaps.current(),
            field = self.filter.pollutant().field(),
            year = %self.filter.year(),
            "map loaded"
        );
        outcome
    }

    pub fn select_pollutant(&mut self, button_id: &str) -> PollutantKind {
        let kind = self.filter.set_pollutant(button_id);
        info!(button_id, field = kind.field(), "pollutant selected");
        self.sync.apply_style(&mut self.engine, &self.filter);
        kind
    }

    pub fn set_year(&mut self, year: Year) -> Year {
        let year = self.filter.set_year(year);
        self.sync.apply_style(&mut self.engine, &self.filter);
        year
    }

    pub fn switch_basemap(&mut self) -> TransitionToken {
        self.hover.on_pointer_leave(&mut self.engine);
        self.basemaps.switch(&mut self.engine)
    }

    pub fn on_pointer_move(&mut self, pointer: PointerEvent) -> HoverOutcome {
        self.hover
            .on_pointer_move(&mut self.engine, self.filter.pollutant(), pointer)
    }

    pub fn on_pointer_leave(&mut self) {
        self.hover.on_pointer_leave(&mut self.engine);
    }

    /// Re-adds source, then layer, then listeners, once the latest switch has loaded.
    pub fn on_style_loaded(&mut self, token: TransitionToken) -> Restore {
        if !self.basemaps.complete(token) {
            return Restore::Stale;
        }
        if let Err(err) = self.overlay.ensure(&mut self.engine, &self.filter) {
            warn!(error = %err, "pollution overlay could not be restored");
            return Restore::Failed(err.to_string());
        }
        let outcome = self.sync.apply_style(&mut self.engine, &self.filter);
        self.hover.bind(&mut self.engine);
        info!(style = self.basemaps.current(), "basemap loaded, overlay restored");
        Restore::Restored(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::{AirQualityApp, Restore};
    use crate::config::{DARK_STYLE, MapConfig};
    use crate::engine::{EngineError, MapEngine, MapEvent, PointerEvent};
    use crate::interaction::HoverOutcome;
    use crate::recording::{EngineCall, RecordingEngine};
    use crate::sync::SyncOutcome;
    use foundation::{FeatureId, LngLat, ScreenPoint, Year};
    use layers::symbology::{color_scale, radius_scale};
    use layers::{Feature, LayerId, PaintProperty, PollutantKind};
    use pretty_assertions::assert_eq;

    fn app() -> AirQualityApp<RecordingEngine> {
        let config = MapConfig::default();
        let engine = RecordingEngine::new(DARK_STYLE);
        AirQualityApp::new(engine, config).unwrap()
    }

    fn loaded() -> AirQualityApp<RecordingEngine> {
        let mut app = app();
        app.handle_event(MapEvent::Loaded);
        app.engine_mut().drain_calls();
        app
    }

    fn layer_id() -> LayerId {
        LayerId::new("air_quality")
    }

    fn point(id: u64, year: i32) -> Feature {
        Feature::new(Some(FeatureId(id)))
            .with_property("County", "Fresno")
            .with_property("State", "California")
            .with_property("Year", year)
            .with_property("Days PM2_5", 30)
    }

    #[test]
    fn load_adds_overlay_in_order() {
        let mut app = app();
        assert_eq!(app.on_map_loaded(), SyncOutcome::Applied);
        let calls = app.engine_mut().drain_calls();
        assert_eq!(calls[0], EngineCall::UpsertLegend("legend".to_string()));
        assert_eq!(calls[1], EngineCall::AddSource("air_quality".to_string()));
        assert_eq!(calls[2], EngineCall::AddLayer(layer_id()));
        assert!(matches!(calls.last(), Some(EngineCall::Bind(_))));
        assert_eq!(app.engine().active_bindings().len(), 1);
        assert_eq!(app.engine().legend_count(), 1);
    }

    #[test]
    fn legend_is_shown_when_overlay_cannot_be_added() {
        let mut engine = RecordingEngine::new(DARK_STYLE);
        engine.set_style(DARK_STYLE);
        engine.drain_calls();
        let mut app = AirQualityApp::new(engine, MapConfig::default()).unwrap();

        assert_eq!(
            app.on_map_loaded(),
            SyncOutcome::Failed(EngineError::StyleNotLoaded)
        );
        assert_eq!(app.engine().legend_count(), 1);
        assert!(app.engine().layer(&layer_id()).is_none());
        assert!(app.engine().active_bindings().is_empty());
    }

    #[test]
    fn selection_before_load_is_skipped() {
        let mut app = app();
        assert_eq!(app.select_pollutant("o3"), PollutantKind::Ozone);
        assert!(app.engine().calls().is_empty());
    }

    #[test]
    fn selecting_pollutant_restyles_layer() {
        let mut app = loaded();
        app.select_pollutant("o3");
        let layer = app.engine().layer(&layer_id()).unwrap();
        assert_eq!(
            layer.paint(PaintProperty::CircleColor),
            Some(&color_scale(PollutantKind::Ozone))
        );
        assert_eq!(
            layer.paint(PaintProperty::CircleRadius),
            Some(&radius_scale(PollutantKind::Ozone))
        );
        assert_eq!(layer.filter, Some(app.filter().filter_expression()));
    }

    #[test]
    fn unknown_button_selects_aqi() {
        let mut app = loaded();
        assert_eq!(app.select_pollutant("so2"), PollutantKind::MaxAqi);
        assert_eq!(app.filter().pollutant(), PollutantKind::MaxAqi);
    }

    #[test]
    fn year_filter_hides_other_years() {
        let mut app = loaded();
        app.engine_mut()
            .place_feature(ScreenPoint::new(10.0, 10.0), point(1, 2019));
        let at = PointerEvent::new(ScreenPoint::new(10.0, 10.0), LngLat::new(-119.8, 36.7));

        assert_eq!(app.on_pointer_move(at), HoverOutcome::Cleared);
        assert_eq!(app.set_year(Year(2019)), Year(2019));
        assert_eq!(
            app.on_pointer_move(at),
            HoverOutcome::Highlighted(Some(FeatureId(1)))
        );
    }

    #[test]
    fn basemap_switch_restores_overlay_after_load() {
        let mut app = loaded();
        app.select_pollutant("o3");
        let token = app.switch_basemap();
        assert!(app.engine().layer(&layer_id()).is_none());

        let events = app.engine_mut().finish_style_load();
        assert_eq!(events, vec![MapEvent::StyleLoaded(token)]);
        for event in events {
            app.handle_event(event);
        }

        let layer = app.engine().layer(&layer_id()).unwrap();
        assert_eq!(
            layer.paint(PaintProperty::CircleRadius),
            Some(&radius_scale(PollutantKind::Ozone))
        );
        assert_eq!(layer.filter, Some(app.filter().filter_expression()));
        assert_eq!(app.engine().active_bindings().len(), 1);
        assert_eq!(app.basemaps().in_flight(), None);
    }

    #[test]
    fn repeated_switches_keep_one_binding() {
        let mut app = loaded();
        for _ in 0..5 {
            let token = app.switch_basemap();
            app.engine_mut().finish_style_load();
            assert_eq!(app.on_style_loaded(token), Restore::Restored(SyncOutcome::Applied));
        }
        assert_eq!(app.engine().active_bindings().len(), 1);
    }

    #[test]
    fn full_cycle_returns_to_dark() {
        let mut app = loaded();
        let n = app.basemaps().len();
        for _ in 0..n {
            let token = app.switch_basemap();
            app.engine_mut().finish_style_load();
            app.on_style_loaded(token);
        }
        assert_eq!(app.basemaps().current(), DARK_STYLE);
        assert_eq!(app.engine().style(), DARK_STYLE);
    }

    #[test]
    fn rapid_switches_restore_only_once() {
        let mut app = loaded();
        let first = app.switch_basemap();
        let second = app.switch_basemap();
        let events = app.engine_mut().finish_style_load();
        assert_eq!(
            events,
            vec![MapEvent::StyleLoaded(first), MapEvent::StyleLoaded(second)]
        );
        app.engine_mut().drain_calls();

        assert_eq!(app.on_style_loaded(first), Restore::Stale);
        assert!(app.engine().calls().is_empty());
        assert_eq!(
            app.on_style_loaded(second),
            Restore::Restored(SyncOutcome::Applied)
        );
        let adds = app
            .engine()
            .calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::AddLayer(_)))
            .count();
        assert_eq!(adds, 1);
    }

    #[test]
    fn switching_closes_open_popup() {
        let mut app = loaded();
        app.engine_mut()
            .place_feature(ScreenPoint::new(10.0, 10.0), point(1, 2020));
        app.on_pointer_move(PointerEvent::new(
            ScreenPoint::new(10.0, 10.0),
            LngLat::new(-119.8, 36.7),
        ));
        assert!(app.engine().popup().is_some());
        app.switch_basemap();
        assert!(app.engine().popup().is_none());
    }
}
