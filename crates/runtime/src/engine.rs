use foundation::{LngLat, ScreenPoint};
use layers::{CircleLayerSpec, Expression, Feature, LayerId, Legend, PaintProperty, SourceSpec};
use thiserror::Error;

/// Handle for one set of layer event listeners (pointer move + leave).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u64);

/// Identifies one basemap switch; load notifications carry it back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionToken(pub u64);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerEvent {
    pub point: ScreenPoint,
    pub lng_lat: LngLat,
}

impl PointerEvent {
    pub fn new(point: ScreenPoint, lng_lat: LngLat) -> Self {
        Self { point, lng_lat }
    }
}

/// Notifications the engine delivers back to the app.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MapEvent {
    /// Initial style and map are ready.
    Loaded,
    /// Pointer moved over the bound layer.
    PointerMove(PointerEvent),
    /// Pointer left the bound layer.
    PointerLeave,
    /// One-shot answer to [`MapEngine::notify_style_loaded`].
    StyleLoaded(TransitionToken),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("layer {0:?} does not exist")]
    LayerNotFound(String),
    #[error("source {0:?} does not exist")]
    SourceNotFound(String),
    #[error("{kind} {id:?} already exists")]
    AlreadyExists { kind: &'static str, id: String },
    #[error("style is still loading")]
    StyleNotLoaded,
    #[error("engine rejected the call: {0}")]
    Rejected(String),
}

/// The rendering engine as seen by the overlay.
///
/// Implementations hold exactly one popup; `show_popup` moves and refills it.
pub trait MapEngine {
    fn has_source(&self, id: &str) -> bool;
    fn has_layer(&self, id: &LayerId) -> bool;

    fn add_source(&mut self, id: &str, spec: &SourceSpec) -> Result<(), EngineError>;
    fn add_layer(&mut self, spec: &CircleLayerSpec) -> Result<(), EngineError>;

    fn set_paint_property(
        &mut self,
        layer: &LayerId,
        property: PaintProperty,
        value: &Expression,
    ) -> Result<(), EngineError>;
    fn set_filter(&mut self, layer: &LayerId, filter: &Expression) -> Result<(), EngineError>;

    /// Replaces the base style. Every source and layer is discarded.
    fn set_style(&mut self, url: &str);
    /// Requests a single [`MapEvent::StyleLoaded`] once the current style finishes loading.
    fn notify_style_loaded(&mut self, token: TransitionToken);

    /// Features of `layer` under `point`, topmost first.
    fn query_rendered_features(&self, point: ScreenPoint, layer: &LayerId) -> Vec<Feature>;

    fn show_popup(&mut self, at: LngLat, html: &str);
    fn hide_popup(&mut self);

    /// Creates the legend overlay, or refreshes it in place if it exists.
    fn upsert_legend(&mut self, legend: &Legend);

    /// Registers pointer move/leave listeners on `layer`.
    fn bind_layer_events(&mut self, layer: &LayerId) -> BindingId;
    fn unbind_layer_events(&mut self, binding: BindingId);
}
