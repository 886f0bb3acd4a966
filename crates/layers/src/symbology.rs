//! Scale functions: pollutant value → circle color and radius.
//!
//! Color breakpoints are the same for every pollutant. They are not
//! calibrated per pollutant and should not be read as health thresholds.

use foundation::{FeatureId, Rgba};

use crate::expression::{Expression, Stop};
use crate::filter::PollutantKind;

/// One breakpoint of the color scale, shared with the legend.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SeverityStop {
    pub value: f64,
    pub color: Rgba,
    pub label: &'static str,
}

pub const SEVERITY_STOPS: [SeverityStop; 4] = [
    SeverityStop {
        value: 0.0,
        color: Rgba::rgb8(0x00, 0xFF, 0x00),
        label: "Low",
    },
    SeverityStop {
        value: 100.0,
        color: Rgba::rgb8(0xFF, 0xFF, 0x00),
        label: "Moderate",
    },
    SeverityStop {
        value: 200.0,
        color: Rgba::rgb8(0xFF, 0x7F, 0x00),
        label: "High",
    },
    SeverityStop {
        value: 300.0,
        color: Rgba::rgb8(0xFF, 0x00, 0x00),
        label: "Severe",
    },
];

/// Ozone is a day count over a whole year.
const OZONE_RADIUS_STOPS: [(f64, f64); 4] = [(0.0, 4.0), (100.0, 7.0), (200.0, 10.0), (366.0, 13.0)];
const DEFAULT_RADIUS_STOPS: [(f64, f64); 4] = [(0.0, 3.0), (50.0, 5.0), (100.0, 7.0), (200.0, 10.0)];

pub const CIRCLE_OPACITY: f64 = 0.8;
pub const DIMMED_OPACITY: f64 = 0.6;
pub const HIGHLIGHT_OPACITY: f64 = 1.0;
pub const NEUTRAL_STROKE_WIDTH: f64 = 0.5;
pub const HIGHLIGHT_STROKE_WIDTH: f64 = 2.0;
pub const STROKE_COLOR: Rgba = Rgba::BLACK;

/// `["to-number", ["coalesce", ["get", field], missing]]`
fn pollutant_value(kind: PollutantKind, missing: f64) -> Expression {
    Expression::to_number(Expression::Coalesce(vec![
        Expression::get(kind.field()),
        Expression::number(missing),
    ]))
}

pub fn color_scale(kind: PollutantKind) -> Expression {
    let stops = SEVERITY_STOPS
        .iter()
        .map(|s| Stop::new(s.value, Expression::color(s.color)))
        .collect();
    Expression::interpolate_linear(pollutant_value(kind, 0.0), stops)
}

/// Missing values map to 1 rather than 0 so points never collapse to nothing.
pub fn radius_scale(kind: PollutantKind) -> Expression {
    let table = match kind {
        PollutantKind::Ozone => &OZONE_RADIUS_STOPS,
        PollutantKind::Pm25 | PollutantKind::MaxAqi => &DEFAULT_RADIUS_STOPS,
    };
    let stops = table
        .iter()
        .map(|&(value, radius)| Stop::new(value, Expression::number(radius)))
        .collect();
    Expression::interpolate_linear(pollutant_value(kind, 1.0), stops)
}

fn when_hovered(id: Option<FeatureId>, hovered: f64, others: f64) -> Expression {
    Expression::case(
        Expression::is_feature(id),
        Expression::number(hovered),
        Expression::number(others),
    )
}

pub fn highlight_stroke_width(id: Option<FeatureId>) -> Expression {
    when_hovered(id, HIGHLIGHT_STROKE_WIDTH, NEUTRAL_STROKE_WIDTH)
}

pub fn highlight_opacity(id: Option<FeatureId>) -> Expression {
    when_hovered(id, HIGHLIGHT_OPACITY, DIMMED_OPACITY)
}
