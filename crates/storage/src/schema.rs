//! Table schemas, the schema registry and the fixed per-source layouts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};
use crate::value::Row;

/// Column types supported by the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Timestamp,
    Boolean,
}

impl ColumnType {
    /// PostgreSQL type used when creating a column.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    /// `information_schema.columns.data_type` reported for this type.
    pub fn information_schema_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "bigint",
            ColumnType::Float => "double precision",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp with time zone",
            ColumnType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// Shape of one table.
///
/// Every field listed in `unique_key` is individually unique, matching the
/// composite-string key columns of the feature tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub unique_key: Vec<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique_key: Vec::new(),
        }
    }

    /// Add a non-nullable column.
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            column_type,
            nullable: false,
        });
        self
    }

    pub fn nullable(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            column_type,
            nullable: true,
        });
        self
    }

    /// Add a non-nullable text column and mark it unique.
    pub fn unique(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.unique_key.push(name.clone());
        self.column(name, ColumnType::Text)
    }

    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Check that a row carries every required column with the right type
    /// and nothing else.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        for col in row.columns() {
            if self.column_def(col).is_none() {
                return Err(StorageError::invalid_row(
                    &self.name,
                    format!("unknown column {}", col),
                ));
            }
        }

        for def in &self.columns {
            let value = row.value(&def.name);
            match value.column_type() {
                None if !def.nullable => {
                    return Err(StorageError::invalid_row(
                        &self.name,
                        format!("column {} is not nullable", def.name),
                    ));
                }
                Some(t) if t != def.column_type => {
                    return Err(StorageError::invalid_row(
                        &self.name,
                        format!("column {} expects {:?}, got {:?}", def.name, def.column_type, t),
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Describe the first difference to another schema of the same table.
    pub fn diff(&self, other: &TableSchema) -> Option<String> {
        if self.columns.len() != other.columns.len() {
            return Some(format!(
                "{} columns expected, {} found",
                self.columns.len(),
                other.columns.len()
            ));
        }
        for def in &self.columns {
            match other.column_def(&def.name) {
                None => return Some(format!("column {} is missing", def.name)),
                Some(o) if o.column_type != def.column_type => {
                    return Some(format!(
                        "column {} is {:?}, expected {:?}",
                        def.name, o.column_type, def.column_type
                    ))
                }
                _ => {}
            }
        }
        None
    }
}

/// Schemas keyed by table name; the first registration of a name wins.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, or confirm it matches the one already registered.
    pub fn register(&mut self, schema: &TableSchema) -> Result<&TableSchema> {
        let entry = self
            .tables
            .entry(schema.name.clone())
            .or_insert_with(|| schema.clone());
        if let Some(reason) = entry.diff(schema) {
            return Err(StorageError::schema_mismatch(&schema.name, reason));
        }
        Ok(entry)
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// ERA5 single-level fields attached to every feature row.
pub const ERA5_SINGLE_LEVEL_FIELDS: &[&str] = &[
    "mean_sea_level_pressure",
    "2_metre_temperature",
    "2_metre_dewpoint_temperature",
    "sea_surface_temperature",
    "skin_temperature",
    "surface_pressure",
    "total_precipitation",
    "boundary_layer_height",
    "neutral_wind_at_10_m_u_component",
    "neutral_wind_at_10_m_v_component",
    "10_metre_u_wind_component",
    "10_metre_v_wind_component",
    "significant_height_of_combined_wind_waves_and_swell",
    "mean_direction_of_total_swell",
    "mean_wave_period",
];

/// ERA5 pressure-level fields, taken at the level nearest to each row's
/// mean-sea-level pressure.
pub const ERA5_PRESSURE_LEVEL_FIELDS: &[&str] = &[
    "geopotential",
    "temperature",
    "relative_humidity",
    "specific_humidity",
    "u_component_of_wind",
    "v_component_of_wind",
    "vertical_velocity",
    "divergence",
    "vorticity_relative",
];

/// SFMR along-track quantities stored per square average.
pub const SFMR_QUANTITY_FIELDS: &[&str] = &["air_temp", "salinity", "sst", "rain_rate", "windspd"];

/// Table holding one extent record per SFMR file.
pub const SFMR_BRIEF_TABLE: &str = "sfmr_brief_info";

/// A data source with a fixed output layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// A Remote Sensing Systems radiometer or scatterometer, e.g. `ascat`.
    RssSatellite { satellite: String },
    Era5Single,
    Era5Pressure,
    Sfmr,
    Smap,
    Ccmp,
}

impl SourceKind {
    /// Short name used in table names.
    pub fn name(&self) -> &str {
        match self {
            SourceKind::RssSatellite { satellite } => satellite,
            SourceKind::Era5Single | SourceKind::Era5Pressure => "era5",
            SourceKind::Sfmr => "sfmr",
            SourceKind::Smap => "smap",
            SourceKind::Ccmp => "ccmp",
        }
    }

    /// Gridded sources only ever contribute raster values to other rows.
    pub fn is_raster(&self) -> bool {
        matches!(self, SourceKind::Era5Single | SourceKind::Era5Pressure)
    }

    /// Prefix of the observation's time and key columns.
    fn time_prefix(&self) -> &'static str {
        match self {
            SourceKind::Sfmr => "sfmr",
            _ => "satel",
        }
    }

    /// Name of the observation timestamp column.
    pub fn datetime_column(&self) -> String {
        format!("{}_datetime", self.time_prefix())
    }

    /// Name of the observation-minus-raster offset column, in minutes.
    pub fn diff_mins_column(&self) -> String {
        format!("{}_era5_diff_mins", self.time_prefix())
    }

    /// Name of the composite unique key column.
    pub fn key_column(&self) -> String {
        format!("{}_datetime_lon_lat", self.time_prefix())
    }

    /// Columns measured by the source itself.
    pub fn observation_columns(&self) -> Vec<ColumnDef> {
        let float = |name: String| ColumnDef {
            name,
            column_type: ColumnType::Float,
            nullable: false,
        };
        match self {
            SourceKind::Sfmr => SFMR_QUANTITY_FIELDS
                .iter()
                .map(|f| float(f.to_string()))
                .collect(),
            SourceKind::RssSatellite { satellite } => vec![float(format!("{}_windspd", satellite))],
            SourceKind::Smap => vec![
                float("smap_windspd".to_string()),
                float("smap_u_wind".to_string()),
                float("smap_v_wind".to_string()),
            ],
            SourceKind::Ccmp => vec![
                float("ccmp_windspd".to_string()),
                float("ccmp_u_wind".to_string()),
                float("ccmp_v_wind".to_string()),
            ],
            SourceKind::Era5Single => ERA5_SINGLE_LEVEL_FIELDS
                .iter()
                .map(|f| float(f.to_string()))
                .collect(),
            SourceKind::Era5Pressure => ERA5_PRESSURE_LEVEL_FIELDS
                .iter()
                .map(|f| float(f.to_string()))
                .collect(),
        }
    }
}

/// `match_of_{a}_and_{b}_{basin}`
pub fn match_table_name(a: &str, b: &str, basin: &str) -> String {
    format!("match_of_{}_and_{}_{}", a, b, basin)
}

/// `tc_sfmr_era5_{basin}` or `tc_{satellite}_era5_{basin}`.
pub fn feature_table_name(source: &SourceKind, basin: &str) -> String {
    format!("tc_{}_era5_{}", source.name(), basin)
}

/// Per-hour match outcomes of one storm against one source.
pub fn match_schema(a: &str, b: &str, basin: &str) -> TableSchema {
    TableSchema::new(match_table_name(a, b, basin))
        .column("tc_sid", ColumnType::Text)
        .column("date_time", ColumnType::Timestamp)
        .column("match", ColumnType::Boolean)
        .unique("tc_sid_datetime")
}

/// One extent record per SFMR file.
pub fn sfmr_brief_schema() -> TableSchema {
    TableSchema::new(SFMR_BRIEF_TABLE)
        .column("hurricane", ColumnType::Text)
        .column("filename", ColumnType::Text)
        .column("start_datetime", ColumnType::Timestamp)
        .column("end_datetime", ColumnType::Timestamp)
        .column("min_lat", ColumnType::Float)
        .column("max_lat", ColumnType::Float)
        .column("min_lon", ColumnType::Float)
        .column("max_lon", ColumnType::Float)
        .unique("hurricane_filename")
}

/// Aligned feature table of an observation source against ERA5.
///
/// Raster columns are nullable until attached; rows with a masked raster
/// cell never reach the table.
pub fn feature_schema(source: &SourceKind, basin: &str) -> Result<TableSchema> {
    let name = feature_table_name(source, basin);
    if source.is_raster() {
        return Err(StorageError::schema_mismatch(
            name,
            "gridded sources have no feature table of their own",
        ));
    }

    let mut schema = TableSchema::new(name)
        .column("sid", ColumnType::Text)
        .column(source.datetime_column(), ColumnType::Timestamp)
        .nullable("era5_datetime", ColumnType::Timestamp)
        .column("east_shift_from_center", ColumnType::Integer)
        .column("north_shift_from_center", ColumnType::Integer)
        .column("lon", ColumnType::Float)
        .column("lat", ColumnType::Float);

    schema.columns.extend(source.observation_columns());
    schema = schema.nullable(source.diff_mins_column(), ColumnType::Integer);
    for f in ERA5_SINGLE_LEVEL_FIELDS {
        schema = schema.nullable(*f, ColumnType::Float);
    }
    schema = schema.nullable("pres_lvl", ColumnType::Integer);
    for f in ERA5_PRESSURE_LEVEL_FIELDS {
        schema = schema.nullable(*f, ColumnType::Float);
    }

    Ok(schema
        .nullable("era5_10m_neutral_equivalent_windspd", ColumnType::Float)
        .nullable("era5_10m_neutral_equivalent_winddir", ColumnType::Float)
        .unique(source.key_column()))
}
