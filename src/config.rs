use crate::error::{ReconciliationError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Two-digit-year formats come first: `%Y` happily reads "25" as year 0025,
// while `%y` rejects a four-digit year as trailing input.
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];
const ISO_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Runtime options for a reconciliation run.
///
/// Every field has a default, so an empty JSON object (`{}`) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ReconcileConfig {
    #[schemars(
        description = "How many candidate tables (in source order) are inspected when looking for the Configuration and Usage Log tables."
    )]
    pub max_candidate_tables: usize,

    #[schemars(description = "How raw date strings in the Usage Log are interpreted.")]
    pub dates: DateConfig,

    #[schemars(description = "Accepted header names for every logical column.")]
    pub columns: ColumnSynonyms,

    #[schemars(
        description = "Currency symbols stripped from numeric cells before parsing (e.g. '€', '$')."
    )]
    pub currency_symbols: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_candidate_tables: 5,
            dates: DateConfig::default(),
            columns: ColumnSynonyms::default(),
            currency_symbols: vec!["€".to_string(), "$".to_string(), "£".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct DateConfig {
    #[schemars(
        description = "If true, ambiguous dates such as 03/04/2025 are read as day/month/year (3 April). If false, as month/day/year."
    )]
    pub day_first: bool,

    #[schemars(
        description = "Explicit chrono format strings tried in order. When empty, a built-in list matching `day_first` is used. ISO dates (YYYY-MM-DD) are always accepted."
    )]
    pub formats: Vec<String>,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            day_first: true,
            formats: Vec::new(),
        }
    }
}

impl DateConfig {
    /// The ordered list of formats a date cell is tried against.
    pub fn effective_formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = if self.formats.is_empty() {
            if self.day_first {
                DAY_FIRST_FORMATS.to_vec()
            } else {
                MONTH_FIRST_FORMATS.to_vec()
            }
        } else {
            self.formats.iter().map(String::as_str).collect()
        };
        for iso in ISO_FORMATS {
            if !formats.contains(iso) {
                formats.push(iso);
            }
        }
        formats
    }
}

/// Declarative header synonyms. Matching is done on normalized header names
/// (see [`crate::utils::normalize_header`]), so `"Preu Alumne "` matches `"Preu_Alumne"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ColumnSynonyms {
    #[schemars(description = "Activity name column, present in both tables (join key source).")]
    pub activity: Vec<String>,

    #[schemars(description = "Optional grouping label in the Configuration table.")]
    pub category: Vec<String>,

    #[schemars(description = "Price charged per enrolled participant (Configuration signature).")]
    pub unit_price: Vec<String>,

    #[schemars(description = "Default participant count (Configuration signature).")]
    pub baseline_enrollment: Vec<String>,

    #[schemars(description = "Recurring material cost independent of hours worked.")]
    pub fixed_material_cost: Vec<String>,

    #[schemars(description = "Cost per hour of staff time.")]
    pub hourly_staff_rate: Vec<String>,

    #[schemars(description = "Hours worked per logged event (Usage Log signature).")]
    pub hours: Vec<String>,

    #[schemars(description = "Date of the logged event (Usage Log signature).")]
    pub date: Vec<String>,

    #[schemars(description = "Optional per-event attendance figure in the Usage Log.")]
    pub reported_enrollment: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        Self {
            activity: names(&["Activitat", "Activity", "Actividad"]),
            category: names(&["Categoria", "Category"]),
            unit_price: names(&["Preu_Alumne", "Unit_Price", "Price_Per_Student", "Precio_Alumno"]),
            baseline_enrollment: names(&[
                "Num_Alumnes",
                "Alumnes",
                "Num_Alumnos",
                "Enrollment",
                "Students",
            ]),
            fixed_material_cost: names(&["Cost_Material_Fix", "Material_Cost", "Fixed_Cost"]),
            hourly_staff_rate: names(&["Preu_Hora_Monitor", "Hourly_Rate", "Staff_Rate"]),
            hours: names(&["Hores_Fetes", "Hores", "Hours", "Horas"]),
            date: names(&["Data", "Date", "Fecha"]),
            reported_enrollment: names(&[
                "Num_Alumnes",
                "Alumnes",
                "Assistents",
                "Attendance",
                "Enrollment",
            ]),
        }
    }
}

impl ReconcileConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_candidate_tables == 0 {
            return Err(ReconciliationError::InvalidConfig(
                "max_candidate_tables must be at least 1".to_string(),
            ));
        }

        let required = [
            ("activity", &self.columns.activity),
            ("unit_price", &self.columns.unit_price),
            ("baseline_enrollment", &self.columns.baseline_enrollment),
            ("hours", &self.columns.hours),
            ("date", &self.columns.date),
        ];
        for (name, synonyms) in required {
            if synonyms.iter().all(|s| s.trim().is_empty()) {
                return Err(ReconciliationError::InvalidConfig(format!(
                    "column '{}' needs at least one non-empty synonym",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReconcileConfig)
    }
}
