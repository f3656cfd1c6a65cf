//! Typed report payload.
//!
//! Known sectors and figures are explicit fields; anything else the caller sends
//! is kept in `extra` maps so the narrative agent still sees the full document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validation::{
    validate_figure, validate_required, validate_series_length, ValidationError,
    ValidationErrors,
};

/// Title used when the payload does not carry one.
pub const DEFAULT_TITLE: &str = "Generated Report";

/// Property sub-sector covered by the report, in publication order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Residential,
    Shop,
    ServicedApartment,
    ShoppingComplex,
    PurposeBuiltOffice,
    Industrial,
    Leisure,
}

impl Sector {
    pub const ALL: [Sector; 7] = [
        Sector::Residential,
        Sector::Shop,
        Sector::ServicedApartment,
        Sector::ShoppingComplex,
        Sector::PurposeBuiltOffice,
        Sector::Industrial,
        Sector::Leisure,
    ];

    /// Payload key and chart file prefix.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::Shop => "shop",
            Self::ServicedApartment => "serviced_apartment",
            Self::ShoppingComplex => "shopping_complex",
            Self::PurposeBuiltOffice => "purpose_built_office",
            Self::Industrial => "industrial",
            Self::Leisure => "leisure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Residential => "Residential Property",
            Self::Shop => "Shop",
            Self::ServicedApartment => "Serviced Apartment",
            Self::ShoppingComplex => "Shopping Complex",
            Self::PurposeBuiltOffice => "Purpose-Built Office",
            Self::Industrial => "Industrial Property",
            Self::Leisure => "Leisure Property",
        }
    }

    pub fn measure(&self) -> Measure {
        match self {
            Self::ShoppingComplex | Self::PurposeBuiltOffice => Measure::SpaceSm,
            Self::Leisure => Measure::Rooms,
            _ => Measure::Units,
        }
    }
}

/// Unit a sector's stock is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Units,
    SpaceSm,
    Rooms,
}

impl Measure {
    pub fn axis_label(&self) -> &'static str {
        match self {
            Self::Units => "Units",
            Self::SpaceSm => "Floor space (s.m.)",
            Self::Rooms => "Rooms",
        }
    }
}

/// Supply stage of a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Existing,
    Incoming,
    Planned,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Existing, Stage::Incoming, Stage::Planned];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Existing => "Existing",
            Self::Incoming => "Incoming",
            Self::Planned => "Planned",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_on: Option<String>,
    #[serde(default)]
    pub sections: Sections,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportPayload {
    /// Title with the fallback applied.
    pub fn title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => DEFAULT_TITLE,
        }
    }

    /// Fill `generated_on` when the caller left it out.
    pub fn ensure_generated_on(&mut self, today: &str) {
        let missing = self
            .generated_on
            .as_deref()
            .map(|value| value.trim().is_empty())
            .unwrap_or(true);
        if missing {
            self.generated_on = Some(today.to_string());
        }
    }

    pub fn generated_on(&self) -> &str {
        self.generated_on.as_deref().unwrap_or_default()
    }

    /// Check the whole payload once, collecting every violation.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (sector, data) in self.sections.present() {
            data.validate_into(&format!("sections.{}", sector.key()), &mut errors);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residential: Option<SectorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<SectorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serviced_apartment: Option<SectorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_complex: Option<SectorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_built_office: Option<SectorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industrial: Option<SectorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leisure: Option<SectorData>,
    /// Sectors outside the known seven; forwarded but never charted.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Sections {
    pub fn get(&self, sector: Sector) -> Option<&SectorData> {
        match sector {
            Sector::Residential => self.residential.as_ref(),
            Sector::Shop => self.shop.as_ref(),
            Sector::ServicedApartment => self.serviced_apartment.as_ref(),
            Sector::ShoppingComplex => self.shopping_complex.as_ref(),
            Sector::PurposeBuiltOffice => self.purpose_built_office.as_ref(),
            Sector::Industrial => self.industrial.as_ref(),
            Sector::Leisure => self.leisure.as_ref(),
        }
    }

    /// Present sectors in publication order.
    pub fn present(&self) -> impl Iterator<Item = (Sector, &SectorData)> + '_ {
        Sector::ALL
            .into_iter()
            .filter_map(move |sector| self.get(sector).map(|data| (sector, data)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorData {
    #[serde(default)]
    pub by_state: Vec<StateRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends: Option<Trends>,
    /// Category to share percentage, e.g. landed vs stratified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SectorData {
    /// Numeric composition entries; nested breakdowns are left to the narrative.
    pub fn composition_shares(&self) -> Vec<(String, f64)> {
        self.composition
            .iter()
            .flat_map(|map| map.iter())
            .filter_map(|(category, value)| value.as_f64().map(|share| (category.clone(), share)))
            .collect()
    }

    /// Sum of one stage across states, `None` when no state reports it.
    pub fn total(&self, measure: Measure, stage: Stage) -> Option<f64> {
        self.by_state
            .iter()
            .filter_map(|row| row.figure(measure, stage))
            .fold(None, |acc, value| Some(acc.unwrap_or(0.0) + value))
    }

    fn validate_into(&self, path: &str, errors: &mut ValidationErrors) {
        for (i, row) in self.by_state.iter().enumerate() {
            let row_path = format!("{}.by_state[{}]", path, i);
            validate_required(&row.state, &format!("{}.state", row_path), "State", errors);
            for (name, value) in row.figures() {
                validate_figure(value, &format!("{}.{}", row_path, name), errors);
            }
        }

        if let Some(trends) = &self.trends {
            let expected = trends.half_year.len();
            for (key, _, values) in trends.all_series() {
                let field = format!("{}.trends.{}", path, key);
                validate_series_length(values.len(), expected, &field, errors);
                for (i, value) in values.iter().enumerate() {
                    validate_figure(*value, &format!("{}[{}]", field, i), errors);
                }
            }
        }

        for (category, share) in self.composition_shares() {
            let field = format!("{}.composition.{}", path, category);
            if !share.is_finite() || share < 0.0 {
                errors.add(
                    ValidationError::new(field, "Share must be a non-negative percentage")
                        .with_suggestion("Use values such as 62.5 for 62.5%"),
                );
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRow {
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_space_sm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_space_sm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_space_sm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_rooms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_rooms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_rooms: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateRow {
    /// Figure for a stage in the given unit.
    ///
    /// Space and room variants fall back to the plain field when absent.
    pub fn figure(&self, measure: Measure, stage: Stage) -> Option<f64> {
        let plain = match stage {
            Stage::Existing => self.existing,
            Stage::Incoming => self.incoming,
            Stage::Planned => self.planned,
        };
        let variant = match (measure, stage) {
            (Measure::Units, _) => None,
            (Measure::SpaceSm, Stage::Existing) => self.existing_space_sm,
            (Measure::SpaceSm, Stage::Incoming) => self.incoming_space_sm,
            (Measure::SpaceSm, Stage::Planned) => self.planned_space_sm,
            (Measure::Rooms, Stage::Existing) => self.existing_rooms,
            (Measure::Rooms, Stage::Incoming) => self.incoming_rooms,
            (Measure::Rooms, Stage::Planned) => self.planned_rooms,
        };
        variant.or(plain)
    }

    fn figures(&self) -> Vec<(&'static str, f64)> {
        [
            ("existing", self.existing),
            ("incoming", self.incoming),
            ("planned", self.planned),
            ("existing_space_sm", self.existing_space_sm),
            ("incoming_space_sm", self.incoming_space_sm),
            ("planned_space_sm", self.planned_space_sm),
            ("existing_rooms", self.existing_rooms),
            ("incoming_rooms", self.incoming_rooms),
            ("planned_rooms", self.planned_rooms),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trends {
    #[serde(default)]
    pub half_year: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_planned: Option<Vec<f64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trends {
    /// Present series as `(payload key, legend label, values)`.
    pub fn all_series(&self) -> Vec<(&'static str, &'static str, &[f64])> {
        [
            ("completions", "Completions", &self.completions),
            ("starts", "Starts", &self.starts),
            ("new_planned", "New planned", &self.new_planned),
        ]
        .into_iter()
        .filter_map(|(key, label, values)| values.as_deref().map(|v| (key, label, v)))
        .collect()
    }
}
