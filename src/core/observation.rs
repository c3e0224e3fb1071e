//! Observation records: one station, one timestamp, one set of readings.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The numeric columns carried by an [`Observation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Pm25,
    Pm10,
    No2,
    So2,
    Co,
    O3,
    Nh3,
    Temperature,
    Humidity,
    WindSpeed,
    Pressure,
    /// Air Quality Index, the prediction target.
    Aqi,
}

impl Measurement {
    /// Every numeric column in table order.
    pub const ALL: [Measurement; 12] = [
        Measurement::Pm25,
        Measurement::Pm10,
        Measurement::No2,
        Measurement::So2,
        Measurement::Co,
        Measurement::O3,
        Measurement::Nh3,
        Measurement::Temperature,
        Measurement::Humidity,
        Measurement::WindSpeed,
        Measurement::Pressure,
        Measurement::Aqi,
    ];

    /// Predictor columns: everything except the target.
    pub const PREDICTORS: [Measurement; 11] = [
        Measurement::Pm25,
        Measurement::Pm10,
        Measurement::No2,
        Measurement::So2,
        Measurement::Co,
        Measurement::O3,
        Measurement::Nh3,
        Measurement::Temperature,
        Measurement::Humidity,
        Measurement::WindSpeed,
        Measurement::Pressure,
    ];

    /// Column name used in feature tables and derived feature names.
    pub fn name(self) -> &'static str {
        match self {
            Measurement::Pm25 => "pm25",
            Measurement::Pm10 => "pm10",
            Measurement::No2 => "no2",
            Measurement::So2 => "so2",
            Measurement::Co => "co",
            Measurement::O3 => "o3",
            Measurement::Nh3 => "nh3",
            Measurement::Temperature => "temperature",
            Measurement::Humidity => "humidity",
            Measurement::WindSpeed => "wind_speed",
            Measurement::Pressure => "pressure",
            Measurement::Aqi => "aqi",
        }
    }

    /// Look a measurement up by its column name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// True for the target column.
    pub fn is_target(self) -> bool {
        matches!(self, Measurement::Aqi)
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A cleaned, fully typed reading for one station at one timestamp.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub station_id: String,
    pub city: String,
    /// Name of the upstream data source, if known.
    pub source: Option<String>,
    pub recorded_at: DateTime<Utc>,
    /// Offset of the station's wall clock from UTC, in seconds.
    #[serde(default)]
    pub utc_offset_secs: i32,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,
    pub o3: Option<f64>,
    pub nh3: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub pressure: Option<f64>,
    pub aqi: Option<f64>,
}

impl Observation {
    /// Create an observation with no readings.
    pub fn new(
        station_id: impl Into<String>,
        city: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            station_id: station_id.into(),
            city: city.into(),
            recorded_at,
            ..Default::default()
        }
    }

    /// Set the data source name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the station's UTC offset.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset_secs = offset.local_minus_utc();
        self
    }

    /// Set one reading.
    pub fn with(mut self, measurement: Measurement, value: f64) -> Self {
        self.set(measurement, Some(value));
        self
    }

    /// Wall-clock time at the station. Calendar features are read from this.
    pub fn local_time(&self) -> NaiveDateTime {
        self.recorded_at.naive_utc() + Duration::seconds(i64::from(self.utc_offset_secs))
    }

    /// Read one column.
    pub fn get(&self, measurement: Measurement) -> Option<f64> {
        match measurement {
            Measurement::Pm25 => self.pm25,
            Measurement::Pm10 => self.pm10,
            Measurement::No2 => self.no2,
            Measurement::So2 => self.so2,
            Measurement::Co => self.co,
            Measurement::O3 => self.o3,
            Measurement::Nh3 => self.nh3,
            Measurement::Temperature => self.temperature,
            Measurement::Humidity => self.humidity,
            Measurement::WindSpeed => self.wind_speed,
            Measurement::Pressure => self.pressure,
            Measurement::Aqi => self.aqi,
        }
    }

    /// Overwrite one column.
    pub fn set(&mut self, measurement: Measurement, value: Option<f64>) {
        let slot = match measurement {
            Measurement::Pm25 => &mut self.pm25,
            Measurement::Pm10 => &mut self.pm10,
            Measurement::No2 => &mut self.no2,
            Measurement::So2 => &mut self.so2,
            Measurement::Co => &mut self.co,
            Measurement::O3 => &mut self.o3,
            Measurement::Nh3 => &mut self.nh3,
            Measurement::Temperature => &mut self.temperature,
            Measurement::Humidity => &mut self.humidity,
            Measurement::WindSpeed => &mut self.wind_speed,
            Measurement::Pressure => &mut self.pressure,
            Measurement::Aqi => &mut self.aqi,
        };
        *slot = value;
    }
}

/// An untyped field as delivered by an ingestion collaborator.
///
/// Upstream APIs mix numbers, numeric strings, and placeholders like `"NA"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Coerce to a finite number; anything else is missing.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(v) => *v,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// A reading before type coercion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawObservation {
    pub station_id: String,
    pub city: String,
    #[serde(default)]
    pub source: Option<String>,
    /// RFC 3339 or `YYYY-MM-DD HH:MM:SS` (interpreted as UTC). An explicit
    /// offset is kept as the station's local clock.
    pub recorded_at: String,
    #[serde(default)]
    pub pm25: Option<RawValue>,
    #[serde(default)]
    pub pm10: Option<RawValue>,
    #[serde(default)]
    pub no2: Option<RawValue>,
    #[serde(default)]
    pub so2: Option<RawValue>,
    #[serde(default)]
    pub co: Option<RawValue>,
    #[serde(default)]
    pub o3: Option<RawValue>,
    #[serde(default)]
    pub nh3: Option<RawValue>,
    #[serde(default)]
    pub temperature: Option<RawValue>,
    #[serde(default)]
    pub humidity: Option<RawValue>,
    #[serde(default)]
    pub wind_speed: Option<RawValue>,
    #[serde(default)]
    pub pressure: Option<RawValue>,
    #[serde(default)]
    pub aqi: Option<RawValue>,
}

impl RawObservation {
    pub fn new(
        station_id: impl Into<String>,
        city: impl Into<String>,
        recorded_at: impl Into<String>,
    ) -> Self {
        Self {
            station_id: station_id.into(),
            city: city.into(),
            recorded_at: recorded_at.into(),
            ..Default::default()
        }
    }

    /// Set one raw field.
    pub fn with(mut self, measurement: Measurement, value: impl Into<RawValue>) -> Self {
        let value = Some(value.into());
        match measurement {
            Measurement::Pm25 => self.pm25 = value,
            Measurement::Pm10 => self.pm10 = value,
            Measurement::No2 => self.no2 = value,
            Measurement::So2 => self.so2 = value,
            Measurement::Co => self.co = value,
            Measurement::O3 => self.o3 = value,
            Measurement::Nh3 => self.nh3 = value,
            Measurement::Temperature => self.temperature = value,
            Measurement::Humidity => self.humidity = value,
            Measurement::WindSpeed => self.wind_speed = value,
            Measurement::Pressure => self.pressure = value,
            Measurement::Aqi => self.aqi = value,
        }
        self
    }

    /// Borrow one raw field.
    pub fn get(&self, measurement: Measurement) -> Option<&RawValue> {
        match measurement {
            Measurement::Pm25 => self.pm25.as_ref(),
            Measurement::Pm10 => self.pm10.as_ref(),
            Measurement::No2 => self.no2.as_ref(),
            Measurement::So2 => self.so2.as_ref(),
            Measurement::Co => self.co.as_ref(),
            Measurement::O3 => self.o3.as_ref(),
            Measurement::Nh3 => self.nh3.as_ref(),
            Measurement::Temperature => self.temperature.as_ref(),
            Measurement::Humidity => self.humidity.as_ref(),
            Measurement::WindSpeed => self.wind_speed.as_ref(),
            Measurement::Pressure => self.pressure.as_ref(),
            Measurement::Aqi => self.aqi.as_ref(),
        }
    }
}

/// Parse an ingestion timestamp, keeping its offset. Naive timestamps are
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}
