use foundation::{Year, YearRange};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expression::Expression;

/// The pollutant currently driving color, radius and the `has` filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollutantKind {
    #[default]
    Pm25,
    Ozone,
    /// Selected by the "no2" control; the data only carries the AQI maximum.
    MaxAqi,
}

impl PollutantKind {
    pub const ALL: [PollutantKind; 3] = [
        PollutantKind::Pm25,
        PollutantKind::Ozone,
        PollutantKind::MaxAqi,
    ];

    /// Attribute name in the tile data.
    pub fn field(self) -> &'static str {
        match self {
            PollutantKind::Pm25 => "Days PM2_5",
            PollutantKind::Ozone => "Days Ozone",
            PollutantKind::MaxAqi => "Max AQI",
        }
    }

    pub fn button_id(self) -> &'static str {
        match self {
            PollutantKind::Pm25 => "pm25",
            PollutantKind::Ozone => "o3",
            PollutantKind::MaxAqi => "no2",
        }
    }

    pub fn from_button_id(id: &str) -> Option<Self> {
        PollutantKind::ALL.into_iter().find(|k| k.button_id() == id)
    }
}

/// Current year and pollutant selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pollutant: PollutantKind,
    year: Year,
    range: YearRange,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(PollutantKind::Pm25, Year(2020), YearRange::default())
    }
}

impl FilterState {
    pub fn new(pollutant: PollutantKind, year: Year, range: YearRange) -> Self {
        Self {
            pollutant,
            year: range.clamp(year),
            range,
        }
    }

    pub fn pollutant(&self) -> PollutantKind {
        self.pollutant
    }

    pub fn year(&self) -> Year {
        self.year
    }

    /// Maps a control id to a pollutant. Unknown ids select `MaxAqi`.
    pub fn set_pollutant(&mut self, button_id: &str) -> PollutantKind {
        let kind = PollutantKind::from_button_id(button_id).unwrap_or_else(|| {
            debug!(button_id, "unrecognized pollutant control, defaulting to AQI");
            PollutantKind::MaxAqi
        });
        self.pollutant = kind;
        kind
    }

    pub fn select(&mut self, kind: PollutantKind) {
        self.pollutant = kind;
    }

    /// Sets the year, clamped into the slider range. Returns the stored year.
    pub fn set_year(&mut self, year: Year) -> Year {
        let clamped = self.range.clamp(year);
        if clamped != year {
            debug!(%year, %clamped, "year outside slider range");
        }
        self.year = clamped;
        clamped
    }

    /// `["all", ["==", ["get", "Year"], Y], ["has", field]]`
    pub fn filter_expression(&self) -> Expression {
        Expression::All(vec![
            Expression::eq(Expression::get("Year"), Expression::number(self.year.as_f64())),
            Expression::has(self.pollutant.field()),
        ])
    }
}
