//! Page controls: pollutant buttons, the year slider, the basemap switch and the legend box.

use foundation::Year;
use layers::{Legend, PollutantKind};
use runtime::MapConfig;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, HtmlInputElement};

pub const POLLUTANT_BUTTON_CLASS: &str = "pollutant-button";
pub const TIME_SLIDER_ID: &str = "timeSlider";
pub const YEAR_LABEL_ID: &str = "yearLabel";
pub const BASEMAP_SWITCH_ID: &str = "switchBasemap";
const ACTIVE_CLASS: &str = "active";

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn listen(target: &Element, event: &str, handler: impl FnMut(Event) + 'static) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    // Controls live as long as the page.
    closure.forget();
    Ok(())
}

/// Creates the legend element on first use, then rewrites it in place.
pub fn upsert_legend(legend: &Legend) -> Result<(), JsValue> {
    let document = document()?;
    let element = match document.get_element_by_id(&legend.element_id) {
        Some(existing) => existing,
        None => {
            let created = document.create_element("div")?;
            created.set_id(&legend.element_id);
            document
                .body()
                .ok_or_else(|| JsValue::from_str("no body"))?
                .append_child(&created)?;
            created
        }
    };
    element.set_inner_html(&legend.inner_html());
    element.set_attribute("style", &legend.css_text())?;
    Ok(())
}

fn mark_active(document: &Document, active_id: &str) -> Result<(), JsValue> {
    let buttons = document.get_elements_by_class_name(POLLUTANT_BUTTON_CLASS);
    for i in 0..buttons.length() {
        if let Some(button) = buttons.item(i) {
            button
                .class_list()
                .toggle_with_force(ACTIVE_CLASS, button.id() == active_id)?;
        }
    }
    Ok(())
}

/// Hooks every `.pollutant-button`; the clicked button's id selects the pollutant.
pub fn wire_pollutant_buttons(
    initial: PollutantKind,
    on_select: fn(&str) -> Option<PollutantKind>,
) -> Result<(), JsValue> {
    let document = document()?;
    mark_active(&document, initial.button_id())?;
    let buttons = document.get_elements_by_class_name(POLLUTANT_BUTTON_CLASS);
    for i in 0..buttons.length() {
        let Some(button) = buttons.item(i) else {
            continue;
        };
        let id = button.id();
        let doc = document.clone();
        listen(&button, "click", move |_| {
            if on_select(&id).is_none() {
                return;
            }
            if let Err(err) = mark_active(&doc, &id) {
                debug!(error = ?err, "could not update active button");
            }
        })?;
    }
    Ok(())
}

/// Configures `#timeSlider` from the year range and keeps `#yearLabel` in step.
pub fn wire_time_slider(config: &MapConfig, on_year: fn(Year) -> Option<Year>) -> Result<(), JsValue> {
    let document = document()?;
    let Some(slider) = document.get_element_by_id(TIME_SLIDER_ID) else {
        debug!("no time slider on the page");
        return Ok(());
    };
    let input: HtmlInputElement = slider
        .clone()
        .dyn_into()
        .map_err(|_| JsValue::from_str("#timeSlider is not an input"))?;
    input.set_min(&config.years.first.to_string());
    input.set_max(&config.years.last.to_string());
    input.set_value(&config.initial_year.to_string());
    let label = document.get_element_by_id(YEAR_LABEL_ID);
    if let Some(label) = &label {
        label.set_text_content(Some(&config.initial_year.to_string()));
    }

    listen(&slider, "input", move |_| {
        let Ok(raw) = input.value().parse::<i32>() else {
            debug!(value = %input.value(), "slider value is not a year");
            return;
        };
        let Some(year) = on_year(Year(raw)) else {
            return;
        };
        if let Some(label) = &label {
            label.set_text_content(Some(&year.to_string()));
        }
    })
}

pub fn wire_basemap_switch(on_switch: fn()) -> Result<(), JsValue> {
    let document = document()?;
    match document.get_element_by_id(BASEMAP_SWITCH_ID) {
        Some(button) => listen(&button, "click", move |_| on_switch()),
        None => {
            debug!("no basemap switch on the page");
            Ok(())
        }
    }
}
