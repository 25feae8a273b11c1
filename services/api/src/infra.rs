use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_hub::config::WorkflowConfig;
use talent_hub::error::AppError;
use talent_hub::workflows::requisition::StaticForecastProvider;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Headcount projections come from the configured CSV export, falling back to the
/// built-in calendar year when none is set.
pub(crate) fn forecast_provider(
    config: &WorkflowConfig,
) -> Result<StaticForecastProvider, AppError> {
    match &config.forecast_csv {
        Some(path) => {
            let provider = StaticForecastProvider::from_path(path)?;
            info!(path = %path.display(), "loaded headcount forecast export");
            Ok(provider)
        }
        None => Ok(StaticForecastProvider::standard()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use talent_hub::workflows::requisition::ForecastProvider;
    use talent_hub::workflows::requisition::DEFAULT_PAGE_LIMIT;

    #[test]
    fn missing_export_falls_back_to_the_standard_year() {
        let config = WorkflowConfig {
            page_limit: DEFAULT_PAGE_LIMIT,
            forecast_csv: None,
        };

        let provider = forecast_provider(&config).expect("standard provider");
        assert_eq!(provider.forecast().expect("forecast").len(), 12);
    }

    #[test]
    fn unreadable_export_is_reported() {
        let config = WorkflowConfig {
            page_limit: DEFAULT_PAGE_LIMIT,
            forecast_csv: Some(PathBuf::from("/nonexistent/headcount.csv")),
        };

        assert!(matches!(
            forecast_provider(&config),
            Err(AppError::Forecast(_))
        ));
    }
}
