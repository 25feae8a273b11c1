use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One period of the headcount projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadcountForecast {
    pub period: String,
    pub actual: Option<u32>,
    pub forecast: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Source of headcount projections; the data behind it lives outside the workflow engine.
pub trait ForecastProvider: Send + Sync {
    fn forecast(&self) -> Result<Vec<HeadcountForecast>, ForecastError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("failed to read forecast source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid forecast CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("forecast provider unavailable: {0}")]
    Unavailable(String),
}

/// Serves a fixed, already-ordered series of forecast periods.
#[derive(Debug, Clone)]
pub struct StaticForecastProvider {
    entries: Vec<HeadcountForecast>,
}

impl StaticForecastProvider {
    pub fn new(entries: Vec<HeadcountForecast>) -> Self {
        Self { entries }
    }

    /// Calendar-year projection used when no forecast export is configured.
    pub fn standard() -> Self {
        const MONTHS: &[(&str, Option<u32>, u32)] = &[
            ("Jan", Some(10), 10),
            ("Feb", Some(12), 12),
            ("Mar", Some(15), 15),
            ("Apr", Some(18), 16),
            ("May", Some(22), 19),
            ("Jun", None, 23),
            ("Jul", None, 28),
            ("Aug", None, 30),
            ("Sep", None, 27),
            ("Oct", None, 24),
            ("Nov", None, 22),
            ("Dec", None, 20),
        ];

        Self::new(
            MONTHS
                .iter()
                .map(|(period, actual, forecast)| HeadcountForecast {
                    period: (*period).to_string(),
                    actual: *actual,
                    forecast: *forecast,
                    department: None,
                })
                .collect(),
        )
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads a `period,actual,forecast,department` export, keeping row order.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ForecastError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();

        for row in csv_reader.deserialize::<ForecastRow>() {
            let row = row?;
            entries.push(HeadcountForecast {
                period: row.period,
                actual: row.actual,
                forecast: row.forecast,
                department: row.department,
            });
        }

        Ok(Self::new(entries))
    }
}

impl ForecastProvider for StaticForecastProvider {
    fn forecast(&self) -> Result<Vec<HeadcountForecast>, ForecastError> {
        Ok(self.entries.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ForecastRow {
    period: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    actual: Option<u32>,
    forecast: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn standard_forecast_covers_calendar_year_in_order() {
        let entries = StaticForecastProvider::standard()
            .forecast()
            .expect("static forecast");
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[0].period, "Jan");
        assert_eq!(entries[11].period, "Dec");
        assert_eq!(entries[4].actual, Some(22));
        assert!(entries[5].actual.is_none());
    }

    #[test]
    fn csv_forecast_keeps_row_order_and_blank_actuals() {
        let csv = "period,actual,forecast,department\n\
                   2025-Q1,14,15,Engineering\n\
                   2025-Q2,,18,\n";
        let provider =
            StaticForecastProvider::from_reader(Cursor::new(csv)).expect("csv parses");
        let entries = provider.forecast().expect("forecast");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].period, "2025-Q1");
        assert_eq!(entries[0].actual, Some(14));
        assert_eq!(entries[0].department.as_deref(), Some("Engineering"));
        assert_eq!(entries[1].actual, None);
        assert_eq!(entries[1].forecast, 18);
        assert!(entries[1].department.is_none());
    }

    #[test]
    fn csv_forecast_rejects_non_numeric_values() {
        let csv = "period,actual,forecast,department\nJan,ten,12,\n";
        let result = StaticForecastProvider::from_reader(Cursor::new(csv));
        assert!(matches!(result, Err(ForecastError::Csv(_))));
    }
}
