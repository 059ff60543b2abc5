//! Feature schema for maintenance records
//!
//! Declares the six input columns, their domains and the target column. The
//! schema is the single source of truth for column roles: the preprocessor
//! derives its numeric/categorical split from it, ingestion checks raw tables
//! against it, and the prediction service validates requests with it.

use crate::error::{CostError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const AGE: &str = "Age";
pub const USAGE_HOURS: &str = "Usage_Hours";
pub const MAINTENANCE_TYPE: &str = "Maintenance_Type";
pub const LAST_MAINTENANCE_DAYS: &str = "Last_Maintenance_Days";
pub const PART_REPLACEMENT: &str = "Part_Replacement";
pub const TECHNICIAN_EXPERIENCE: &str = "Technician_Experience";
pub const MAINTENANCE_COST: &str = "Maintenance_Cost";
pub const MACHINE_ID: &str = "Machine_ID";

/// Maintenance categories accepted by the schema
pub const MAINTENANCE_TYPES: [&str; 3] = ["Routine", "Preventive", "Corrective"];

/// Domain of a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Standardized numeric column with optional inclusive bounds
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    /// One-of-k encoded column with a closed set of accepted levels
    Categorical { levels: Vec<String> },
}

/// A named input column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn numeric(name: &str, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Numeric { min, max, integer: false },
        }
    }

    pub fn integer(name: &str, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Numeric { min, max, integer: true },
        }
    }

    pub fn categorical(name: &str, levels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Categorical {
                levels: levels.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, ColumnKind::Numeric { .. })
    }

    /// Check one value against this column's domain
    fn check(&self, value: &FieldValue) -> Result<()> {
        match (&self.kind, value) {
            (ColumnKind::Numeric { min, max, integer }, FieldValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(CostError::validation(&self.name, format!("must be a finite number, got {}", v)));
                }
                if *integer && v.fract() != 0.0 {
                    return Err(CostError::validation(&self.name, format!("must be an integer, got {}", v)));
                }
                let below = min.map_or(false, |m| *v < m);
                let above = max.map_or(false, |m| *v > m);
                if below || above {
                    let reason = match (min, max) {
                        (Some(lo), Some(hi)) => format!("must be within [{}, {}], got {}", lo, hi, v),
                        (Some(lo), None) => format!("must be >= {}, got {}", lo, v),
                        (None, Some(hi)) => format!("must be <= {}, got {}", hi, v),
                        (None, None) => format!("out of range, got {}", v),
                    };
                    return Err(CostError::validation(&self.name, reason));
                }
                Ok(())
            }
            (ColumnKind::Categorical { levels }, FieldValue::Level(level)) => {
                if levels.iter().any(|l| l == level) {
                    Ok(())
                } else {
                    Err(CostError::validation(
                        &self.name,
                        format!("must be one of {}, got '{}'", levels.join(", "), level),
                    ))
                }
            }
            (ColumnKind::Numeric { .. }, FieldValue::Level(level)) => Err(CostError::validation(
                &self.name,
                format!("expected a number, got '{}'", level),
            )),
            (ColumnKind::Categorical { .. }, FieldValue::Number(v)) => Err(CostError::validation(
                &self.name,
                format!("expected a category, got {}", v),
            )),
        }
    }
}

/// Name and floor of the regression target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    /// Costs are clipped to this floor in the training data
    pub floor: f64,
}

/// Static description of input columns and target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub columns: Vec<ColumnSpec>,
    pub target: TargetSpec,
    /// Identifier column carried by raw tables and ignored by the model
    pub id_column: Option<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::maintenance()
    }
}

impl FeatureSchema {
    /// The maintenance cost schema
    pub fn maintenance() -> Self {
        Self {
            columns: vec![
                ColumnSpec::numeric(AGE, Some(0.0), Some(50.0)),
                ColumnSpec::numeric(USAGE_HOURS, Some(0.0), None),
                ColumnSpec::categorical(MAINTENANCE_TYPE, &MAINTENANCE_TYPES),
                ColumnSpec::integer(LAST_MAINTENANCE_DAYS, Some(0.0), Some(365.0)),
                ColumnSpec::categorical(PART_REPLACEMENT, &["0", "1"]),
                ColumnSpec::numeric(TECHNICIAN_EXPERIENCE, Some(0.0), Some(50.0)),
            ],
            target: TargetSpec {
                name: MAINTENANCE_COST.to_string(),
                floor: 100.0,
            },
            id_column: Some(MACHINE_ID.to_string()),
        }
    }

    /// Input column names in declaration order
    pub fn feature_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Numeric column names in declaration order
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Categorical column names in declaration order
    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check that a table carries every input column, and the target if requested
    pub fn check_table(&self, df: &DataFrame, require_target: bool) -> Result<()> {
        let present: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let mut missing: Vec<&str> = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !present.iter().any(|p| p == name))
            .collect();
        if require_target && !present.iter().any(|p| *p == self.target.name) {
            missing.push(&self.target.name);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CostError::SchemaError(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Validate every field of a record against its domain.
    ///
    /// Fields are checked in declaration order and the first offending field
    /// is reported.
    pub fn validate(&self, record: &MaintenanceRecord) -> Result<()> {
        for spec in &self.columns {
            let value = record.field(&spec.name).ok_or_else(|| {
                CostError::SchemaError(format!("record has no field '{}'", spec.name))
            })?;
            spec.check(&value)?;
        }
        Ok(())
    }
}

/// Value of a single record field as seen by the schema
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Level(String),
}

/// One input row, optionally carrying the observed cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Usage_Hours")]
    pub usage_hours: f64,
    #[serde(rename = "Maintenance_Type")]
    pub maintenance_type: String,
    #[serde(rename = "Last_Maintenance_Days")]
    pub last_maintenance_days: i64,
    #[serde(rename = "Part_Replacement")]
    pub part_replacement: i64,
    #[serde(rename = "Technician_Experience")]
    pub technician_experience: f64,
    #[serde(rename = "Maintenance_Cost", default, skip_serializing_if = "Option::is_none")]
    pub maintenance_cost: Option<f64>,
}

impl MaintenanceRecord {
    pub fn new(
        age: f64,
        usage_hours: f64,
        maintenance_type: impl Into<String>,
        last_maintenance_days: i64,
        part_replacement: i64,
        technician_experience: f64,
    ) -> Self {
        Self {
            age,
            usage_hours,
            maintenance_type: maintenance_type.into(),
            last_maintenance_days,
            part_replacement,
            technician_experience,
            maintenance_cost: None,
        }
    }

    /// Look up a field by column name
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        let value = match column {
            AGE => FieldValue::Number(self.age),
            USAGE_HOURS => FieldValue::Number(self.usage_hours),
            MAINTENANCE_TYPE => FieldValue::Level(self.maintenance_type.clone()),
            LAST_MAINTENANCE_DAYS => FieldValue::Number(self.last_maintenance_days as f64),
            PART_REPLACEMENT => FieldValue::Level(self.part_replacement.to_string()),
            TECHNICIAN_EXPERIENCE => FieldValue::Number(self.technician_experience),
            MAINTENANCE_COST => FieldValue::Number(self.maintenance_cost?),
            _ => return None,
        };
        Some(value)
    }

    /// Numeric view of a field; integer flags are returned as numbers too
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            PART_REPLACEMENT => Some(self.part_replacement as f64),
            _ => match self.field(column)? {
                FieldValue::Number(v) => Some(v),
                FieldValue::Level(_) => None,
            },
        }
    }

    /// Categorical view of a field
    pub fn level(&self, column: &str) -> Option<String> {
        match self.field(column)? {
            FieldValue::Level(l) => Some(l),
            FieldValue::Number(v) => Some(v.to_string()),
        }
    }

    /// Build a table with one row per record, in schema column order
    pub fn to_dataframe(records: &[MaintenanceRecord]) -> Result<DataFrame> {
        let mut columns = vec![
            Column::new(AGE.into(), records.iter().map(|r| r.age).collect::<Vec<f64>>()),
            Column::new(USAGE_HOURS.into(), records.iter().map(|r| r.usage_hours).collect::<Vec<f64>>()),
            Column::new(
                MAINTENANCE_TYPE.into(),
                records.iter().map(|r| r.maintenance_type.clone()).collect::<Vec<String>>(),
            ),
            Column::new(
                LAST_MAINTENANCE_DAYS.into(),
                records.iter().map(|r| r.last_maintenance_days).collect::<Vec<i64>>(),
            ),
            Column::new(
                PART_REPLACEMENT.into(),
                records.iter().map(|r| r.part_replacement).collect::<Vec<i64>>(),
            ),
            Column::new(
                TECHNICIAN_EXPERIENCE.into(),
                records.iter().map(|r| r.technician_experience).collect::<Vec<f64>>(),
            ),
        ];
        if records.iter().all(|r| r.maintenance_cost.is_some()) && !records.is_empty() {
            columns.push(Column::new(
                MAINTENANCE_COST.into(),
                records.iter().filter_map(|r| r.maintenance_cost).collect::<Vec<f64>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Read records back out of a table produced by ingestion
    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<MaintenanceRecord>> {
        let float_col = |name: &str| -> Result<Vec<f64>> {
            let col = df
                .column(name)
                .map_err(|_| CostError::SchemaError(format!("missing required column '{}'", name)))?
                .cast(&DataType::Float64)?;
            col.f64()?
                .into_iter()
                .map(|v| v.ok_or_else(|| CostError::SchemaError(format!("column '{}' has missing values", name))))
                .collect()
        };
        let text_col = |name: &str| -> Result<Vec<String>> {
            let col = df
                .column(name)
                .map_err(|_| CostError::SchemaError(format!("missing required column '{}'", name)))?
                .cast(&DataType::String)?;
            col.str()?
                .into_iter()
                .map(|v| {
                    v.map(str::to_string)
                        .ok_or_else(|| CostError::SchemaError(format!("column '{}' has missing values", name)))
                })
                .collect()
        };

        let int_col = |name: &str| -> Result<Vec<i64>> {
            float_col(name)?
                .into_iter()
                .map(|v| {
                    if v.is_finite() && v.fract() == 0.0 {
                        Ok(v as i64)
                    } else {
                        Err(CostError::SchemaError(format!(
                            "column '{}' holds non-integer value {}",
                            name, v
                        )))
                    }
                })
                .collect()
        };

        let age = float_col(AGE)?;
        let usage = float_col(USAGE_HOURS)?;
        let kind = text_col(MAINTENANCE_TYPE)?;
        let days = int_col(LAST_MAINTENANCE_DAYS)?;
        let part = int_col(PART_REPLACEMENT)?;
        let experience = float_col(TECHNICIAN_EXPERIENCE)?;
        let cost = match df.column(MAINTENANCE_COST) {
            Ok(_) => Some(float_col(MAINTENANCE_COST)?),
            Err(_) => None,
        };

        Ok((0..df.height())
            .map(|i| MaintenanceRecord {
                age: age[i],
                usage_hours: usage[i],
                maintenance_type: kind[i].clone(),
                last_maintenance_days: days[i],
                part_replacement: part[i],
                technician_experience: experience[i],
                maintenance_cost: cost.as_ref().map(|c| c[i]),
            })
            .collect())
    }
}

/// Raw single-row request as supplied by a form or command line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub age: String,
    pub usage_hours: String,
    pub maintenance_type: String,
    pub last_maintenance_days: String,
    pub part_replacement: String,
    pub technician_experience: String,
}

impl PredictionRequest {
    /// Parse the raw strings into a typed record.
    ///
    /// Only syntax is checked here; domain checks belong to
    /// [`FeatureSchema::validate`].
    pub fn parse(&self) -> Result<MaintenanceRecord> {
        Ok(MaintenanceRecord::new(
            parse_float(AGE, &self.age)?,
            parse_float(USAGE_HOURS, &self.usage_hours)?,
            self.maintenance_type.trim(),
            parse_int(LAST_MAINTENANCE_DAYS, &self.last_maintenance_days)?,
            parse_int(PART_REPLACEMENT, &self.part_replacement)?,
            parse_float(TECHNICIAN_EXPERIENCE, &self.technician_experience)?,
        ))
    }
}

fn parse_float(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CostError::validation(field, format!("'{}' is not a number", raw)))
}

fn parse_int(field: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CostError::validation(field, format!("'{}' is not an integer", raw)))
}
