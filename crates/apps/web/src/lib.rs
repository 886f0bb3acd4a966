//! Browser entry point for the air-quality map.
//!
//! The page loads `mapbox-gl.js`, calls `init_map` with a JSON config, and
//! the controls and map events drive a single [`AirQualityApp`].

use std::cell::RefCell;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use foundation::Year;
use layers::PollutantKind;
use runtime::{AirQualityApp, MapConfig, MapEvent};
use serde_json::json;
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

mod dom;
mod engine;
mod logging;
mod mapbox;

use engine::{WebMapEngine, add_standard_controls};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK_SET: OnceLock<()> = OnceLock::new();

thread_local! {
    static APP: RefCell<Option<AirQualityApp<WebMapEngine>>> = const { RefCell::new(None) };
}

/// Runs `f` against the app if it exists and is not already borrowed.
///
/// Map callbacks can fire while an export is still running; those events are
/// dropped rather than panicking on a second borrow.
fn with_app<F, R>(f: F) -> R
where
    F: FnOnce(&mut AirQualityApp<WebMapEngine>) -> R,
    R: Default,
{
    APP.try_with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => slot.as_mut().map(f).unwrap_or_default(),
        Err(_) => {
            debug!("app busy, dropping call");
            R::default()
        }
    })
    .unwrap_or_default()
}

fn dispatch(event: MapEvent) {
    with_app(|app| app.handle_event(event));
}

fn init_panic_hook() {
    PANIC_HOOK_SET.get_or_init(console_error_panic_hook::set_once);
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    init_panic_hook();
    logging::init_logging(None);
    Ok(())
}

/// Builds the map and wires the page controls. `config_json` may be empty.
#[wasm_bindgen]
pub fn init_map(config_json: &str) -> Result<(), JsValue> {
    init_map_inner(config_json).inspect_err(|err| {
        web_sys::console::error_1(&JsValue::from_str(&format!("map init error: {err:?}")));
    })
}

fn init_map_inner(config_json: &str) -> Result<(), JsValue> {
    if with_app(|_| true) {
        warn!("init_map called twice; keeping the existing map");
        return Ok(());
    }
    let config =
        MapConfig::from_json_str(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;

    match &config.access_token {
        Some(token) => mapbox::set_access_token(token)?,
        None => warn!("no access token configured; relying on mapboxgl.accessToken"),
    }

    let style = config
        .basemaps
        .get(config.initial_basemap)
        .ok_or_else(|| JsValue::from_str("initial basemap out of range"))?;
    let map = mapbox::Map::new(&mapbox::json_to_js(&json!({
        "container": config.container,
        "style": style,
        "center": config.center.to_array(),
        "zoom": config.zoom,
    }))?);
    add_standard_controls(&map)?;

    let on_load = Closure::once_into_js(|| dispatch(MapEvent::Loaded));
    map.once("load", on_load.unchecked_ref());

    let engine = WebMapEngine::new(map, dispatch)?;
    let app =
        AirQualityApp::new(engine, config.clone()).map_err(|e| JsValue::from_str(&e.to_string()))?;
    APP.try_with(|cell| cell.replace(Some(app)))
        .map_err(|_| JsValue::from_str("app state unavailable"))?;

    dom::wire_pollutant_buttons(config.initial_pollutant, select_kind)?;
    dom::wire_time_slider(&config, apply_year)?;
    dom::wire_basemap_switch(|| {
        switch_basemap();
    })?;

    info!(container = %config.container, style = %style, "map created");
    Ok(())
}

// `None` when the app is missing or busy: nothing was changed.
fn select_kind(button_id: &str) -> Option<PollutantKind> {
    with_app(|app| Some(app.select_pollutant(button_id)))
}

fn apply_year(year: Year) -> Option<Year> {
    with_app(|app| Some(app.set_year(year)))
}

/// Selects a pollutant by button id; returns the attribute now styled.
#[wasm_bindgen]
pub fn select_pollutant(button_id: &str) -> Option<String> {
    select_kind(button_id).map(|kind| kind.field().to_string())
}

/// Sets the displayed year; returns it after clamping to the slider range.
#[wasm_bindgen]
pub fn set_year(year: i32) -> Option<i32> {
    apply_year(Year(year)).map(|y| y.0)
}

/// Moves to the next basemap; returns its style URL.
#[wasm_bindgen]
pub fn switch_basemap() -> Option<String> {
    with_app(|app| {
        app.switch_basemap();
        Some(app.basemaps().current().to_string())
    })
}
