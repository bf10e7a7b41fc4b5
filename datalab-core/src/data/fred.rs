//! FRED (Federal Reserve Economic Data) indicator provider.
//!
//! Uses the `series/observations` endpoint with a static API key. FRED marks
//! missing observations with the value `"."`; those become nulls.

use super::provider::{DataError, IndicatorProvider, IndicatorSeries, Observation};
use crate::config::DataConfig;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_code: Option<u16>,
    error_message: String,
}

pub struct FredProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl FredProvider {
    pub fn new(config: &DataConfig, api_key: &str) -> Result<Self, DataError> {
        if api_key.trim().is_empty() {
            return Err(DataError::ProviderUnavailable {
                provider: "fred",
                reason: "empty API key".into(),
            });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.fred_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    fn observations_url(&self) -> String {
        format!("{}/fred/series/observations", self.base_url)
    }

    fn parse_observations(
        code: &str,
        resp: ObservationsResponse,
    ) -> Result<Vec<Observation>, DataError> {
        resp.observations
            .into_iter()
            .map(|raw| {
                let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d").map_err(|e| {
                    DataError::ResponseFormatChanged(format!(
                        "bad date '{}' in {code}: {e}",
                        raw.date
                    ))
                })?;
                let value = match raw.value.trim() {
                    "." | "" => None,
                    v => Some(v.parse::<f64>().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "bad value '{v}' in {code} at {}: {e}",
                            raw.date
                        ))
                    })?),
                };
                Ok(Observation { date, value })
            })
            .collect()
    }

    fn parse_error(code: &str, status: reqwest::StatusCode, body: &str) -> DataError {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(err) if err.error_message.contains("does not exist") => DataError::SymbolNotFound {
                symbol: code.to_string(),
            },
            Ok(err) => DataError::Provider(format!(
                "FRED {} for {code}: {}",
                err.error_code.unwrap_or(status.as_u16()),
                err.error_message
            )),
            Err(_) => DataError::Provider(format!("HTTP {status} for {code}")),
        }
    }
}

impl IndicatorProvider for FredProvider {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch_series(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IndicatorSeries, DataError> {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let resp = self
            .client
            .get(self.observations_url())
            .query(&[
                ("series_id", code),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Self::parse_error(code, status, &body));
        }

        let parsed: ObservationsResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {code}: {e}"))
        })?;

        Ok(IndicatorSeries {
            code: code.to_string(),
            observations: Self::parse_observations(code, parsed)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_observations_and_missing_marker() {
        let resp: ObservationsResponse = serde_json::from_str(
            r#"{
                "realtime_start": "2024-06-01",
                "count": 3,
                "observations": [
                    {"realtime_start": "2024-06-01", "realtime_end": "2024-06-01", "date": "2023-01-01", "value": "26813.601"},
                    {"realtime_start": "2024-06-01", "realtime_end": "2024-06-01", "date": "2023-04-01", "value": "."},
                    {"realtime_start": "2024-06-01", "realtime_end": "2024-06-01", "date": "2023-07-01", "value": "27610.128"}
                ]
            }"#,
        )
        .unwrap();

        let obs = FredProvider::parse_observations("GDP", resp).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(obs[0].value, Some(26813.601));
        assert_eq!(obs[1].value, None);
    }

    #[test]
    fn malformed_value_is_a_format_error() {
        let resp: ObservationsResponse = serde_json::from_str(
            r#"{"observations": [{"date": "2023-01-01", "value": "n/a"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            FredProvider::parse_observations("GDP", resp),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn unknown_series_maps_to_not_found() {
        let body = r#"{"error_code":400,"error_message":"Bad Request.  The series does not exist."}"#;
        match FredProvider::parse_error("NOPE", reqwest::StatusCode::BAD_REQUEST, body) {
            DataError::SymbolNotFound { symbol } => assert_eq!(symbol, "NOPE"),
            other => panic!("expected SymbolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn bad_key_keeps_provider_message() {
        let body = r#"{"error_code":400,"error_message":"Bad Request.  The value for variable api_key is not registered."}"#;
        match FredProvider::parse_error("GDP", reqwest::StatusCode::BAD_REQUEST, body) {
            DataError::Provider(msg) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("api_key"));
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_falls_back_to_status() {
        let err = FredProvider::parse_error("GDP", reqwest::StatusCode::BAD_GATEWAY, "<html>");
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(
            FredProvider::new(&DataConfig::default(), "  "),
            Err(DataError::ProviderUnavailable { .. })
        ));
    }
}
