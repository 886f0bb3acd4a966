use std::collections::BTreeMap;

use foundation::{FeatureId, LngLat, ScreenPoint};
use layers::{CircleLayerSpec, Expression, Feature, LayerId, Legend, PaintProperty, SourceSpec};
use runtime::{BindingId, EngineError, MapEngine, MapEvent, PointerEvent, TransitionToken};
use serde_json::json;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::dom;
use crate::mapbox::{self, Map, Popup, json_to_js};

/// Receives every notification the map delivers.
pub type EventSink = fn(MapEvent);

struct LayerListeners {
    layer: String,
    on_move: Closure<dyn FnMut(JsValue)>,
    on_leave: Closure<dyn FnMut(JsValue)>,
}

/// [`MapEngine`] backed by a live `mapboxgl.Map`.
pub struct WebMapEngine {
    map: Map,
    popup: Popup,
    sink: EventSink,
    listeners: BTreeMap<BindingId, LayerListeners>,
    next_binding: u64,
}

impl WebMapEngine {
    pub fn new(map: Map, sink: EventSink) -> Result<Self, JsValue> {
        let options = json_to_js(&json!({ "closeButton": false, "closeOnClick": false }))?;
        Ok(Self {
            map,
            popup: Popup::new(&options),
            sink,
            listeners: BTreeMap::new(),
            next_binding: 0,
        })
    }
}

fn rejected(err: JsValue) -> EngineError {
    EngineError::Rejected(
        err.as_string()
            .or_else(|| {
                js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{err:?}")),
    )
}

fn js_payload(value: &serde_json::Value) -> Result<JsValue, EngineError> {
    json_to_js(value).map_err(rejected)
}

fn is_present(value: &JsValue) -> bool {
    !(value.is_undefined() || value.is_null())
}

fn number_at(obj: &JsValue, path: &[&str]) -> Option<f64> {
    let mut cur = obj.clone();
    for key in path {
        cur = js_sys::Reflect::get(&cur, &JsValue::from_str(key)).ok()?;
    }
    cur.as_f64()
}

fn pointer_event(e: &JsValue) -> Option<PointerEvent> {
    Some(PointerEvent::new(
        ScreenPoint::new(number_at(e, &["point", "x"])?, number_at(e, &["point", "y"])?),
        LngLat::new(
            number_at(e, &["lngLat", "lng"])?,
            number_at(e, &["lngLat", "lat"])?,
        ),
    ))
}

fn feature_from_js(raw: &JsValue) -> Option<Feature> {
    let id = js_sys::Reflect::get(raw, &JsValue::from_str("id"))
        .ok()
        .and_then(|v| v.as_f64())
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| FeatureId(n as u64));
    let props = js_sys::Reflect::get(raw, &JsValue::from_str("properties")).ok()?;
    let text = js_sys::JSON::stringify(&props).ok()?.as_string()?;
    match serde_json::from_str(&text) {
        Ok(properties) => Some(Feature { id, properties }),
        Err(err) => {
            debug!(error = %err, "skipping feature with unreadable properties");
            None
        }
    }
}

impl MapEngine for WebMapEngine {
    fn has_source(&self, id: &str) -> bool {
        is_present(&self.map.get_source(id))
    }

    fn has_layer(&self, id: &LayerId) -> bool {
        is_present(&self.map.get_layer(id.as_str()))
    }

    fn add_source(&mut self, id: &str, spec: &SourceSpec) -> Result<(), EngineError> {
        let payload = js_payload(&spec.to_json())?;
        self.map.add_source(id, &payload).map_err(rejected)
    }

    fn add_layer(&mut self, spec: &CircleLayerSpec) -> Result<(), EngineError> {
        let payload = js_payload(&spec.to_json())?;
        self.map.add_layer(&payload).map_err(rejected)
    }

    fn set_paint_property(
        &mut self,
        layer: &LayerId,
        property: PaintProperty,
        value: &Expression,
    ) -> Result<(), EngineError> {
        let payload = js_payload(&value.to_json())?;
        self.map
            .set_paint_property(layer.as_str(), property.name(), &payload)
            .map_err(rejected)
    }

    fn set_filter(&mut self, layer: &LayerId, filter: &Expression) -> Result<(), EngineError> {
        let payload = js_payload(&filter.to_json())?;
        self.map
            .set_filter(layer.as_str(), &payload)
            .map_err(rejected)
    }

    fn set_style(&mut self, url: &str) {
        self.map.set_style(url);
    }

    fn notify_style_loaded(&mut self, token: TransitionToken) {
        let sink = self.sink;
        let callback = Closure::once_into_js(move || sink(MapEvent::StyleLoaded(token)));
        self.map.once("style.load", callback.unchecked_ref());
    }

    fn query_rendered_features(&self, point: ScreenPoint, layer: &LayerId) -> Vec<Feature> {
        let (Ok(at), Ok(options)) = (
            json_to_js(&json!([point.x, point.y])),
            json_to_js(&json!({ "layers": [layer.as_str()] })),
        ) else {
            return Vec::new();
        };
        match self.map.query_rendered_features(&at, &options) {
            Ok(hits) => hits.iter().filter_map(|f| feature_from_js(&f)).collect(),
            Err(err) => {
                warn!(layer = %layer, error = %rejected(err), "feature query failed");
                Vec::new()
            }
        }
    }

    fn show_popup(&mut self, at: LngLat, html: &str) {
        let Ok(lng_lat) = json_to_js(&json!(at.to_array())) else {
            return;
        };
        self.popup.set_lng_lat(&lng_lat);
        self.popup.set_html(html);
        self.popup.add_to(&self.map);
    }

    fn hide_popup(&mut self) {
        self.popup.remove();
    }

    fn upsert_legend(&mut self, legend: &Legend) {
        if let Err(err) = dom::upsert_legend(legend) {
            warn!(error = ?err, "legend could not be rendered");
        }
    }

    fn bind_layer_events(&mut self, layer: &LayerId) -> BindingId {
        let sink = self.sink;
        let on_move = Closure::<dyn FnMut(JsValue)>::new(move |e: JsValue| {
            match pointer_event(&e) {
                Some(pointer) => sink(MapEvent::PointerMove(pointer)),
                None => debug!("mousemove without point/lngLat"),
            }
        });
        let on_leave = Closure::<dyn FnMut(JsValue)>::new(move |_e: JsValue| {
            sink(MapEvent::PointerLeave);
        });
        self.map
            .on_layer("mousemove", layer.as_str(), on_move.as_ref().unchecked_ref());
        self.map
            .on_layer("mouseleave", layer.as_str(), on_leave.as_ref().unchecked_ref());

        self.next_binding += 1;
        let binding = BindingId(self.next_binding);
        self.listeners.insert(
            binding,
            LayerListeners {
                layer: layer.as_str().to_string(),
                on_move,
                on_leave,
            },
        );
        binding
    }

    fn unbind_layer_events(&mut self, binding: BindingId) {
        let Some(listeners) = self.listeners.remove(&binding) else {
            return;
        };
        self.map.off_layer(
            "mousemove",
            &listeners.layer,
            listeners.on_move.as_ref().unchecked_ref(),
        );
        self.map.off_layer(
            "mouseleave",
            &listeners.layer,
            listeners.on_leave.as_ref().unchecked_ref(),
        );
    }
}

/// Adds the navigation and geolocation controls at the top right.
pub fn add_standard_controls(map: &Map) -> Result<(), JsValue> {
    let nav = mapbox::NavigationControl::new();
    map.add_control(&nav, "top-right");
    let geolocate = mapbox::GeolocateControl::new(&json_to_js(&json!({
        "positionOptions": { "enableHighAccuracy": true },
        "trackUserLocation": true,
        "showUserHeading": true
    }))?);
    map.add_control(&geolocate, "top-right");
    Ok(())
}
