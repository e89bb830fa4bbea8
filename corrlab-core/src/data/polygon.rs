//! Polygon grouped-daily provider.
//!
//! One HTTP GET per calendar day against the v2 grouped aggregates endpoint,
//! with a declarative retry policy. The free plan enforces a hard per-minute
//! call budget, so the caller paces calls via [`QuotaPacer`]; this module only
//! handles per-request retries.
//!
//! [`QuotaPacer`]: super::cache::QuotaPacer

use super::provider::{DayRecord, GroupedProvider};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// Grouped aggregates response body. `results` is absent on empty days.
#[derive(Debug, Deserialize)]
struct GroupedResponse {
    results: Option<Vec<GroupedAgg>>,
}

#[derive(Debug, Deserialize)]
struct GroupedAgg {
    #[serde(rename = "T")]
    ticker: Option<String>,
    #[serde(rename = "c")]
    close: Option<f64>,
    #[serde(rename = "v")]
    volume: Option<f64>,
}

/// Classification of an HTTP outcome for the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    /// 200 with a body to parse.
    Success,
    /// 204/403/404: a normal "no data for this day", not an error.
    TerminalEmpty,
    /// 429: back off on the rate-limit schedule and retry.
    RateLimited,
    /// Anything else: back off on the transient schedule and retry.
    Transient,
}

pub(crate) fn classify(status: reqwest::StatusCode) -> StatusClass {
    use reqwest::StatusCode;
    match status {
        StatusCode::TOO_MANY_REQUESTS => StatusClass::RateLimited,
        StatusCode::NO_CONTENT | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            StatusClass::TerminalEmpty
        }
        s if s.is_success() => StatusClass::Success,
        _ => StatusClass::Transient,
    }
}

/// Retry policy: attempt count plus per-class linear backoff bases.
///
/// Backoff for attempt `k` (1-based) is `base × k`. Tests set the bases to
/// zero so the loop runs without sleeping.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_backoff: Duration,
    pub transient_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limit_backoff: Duration::from_secs(2),
            transient_backoff: Duration::from_secs(1),
        }
    }
}

/// Polygon.io grouped-daily provider.
pub struct PolygonProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    policy: RetryPolicy,
}

impl PolygonProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_policy(api_key, RetryPolicy::default())
    }

    pub fn with_policy(api_key: String, policy: RetryPolicy) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            api_key,
            policy,
        }
    }

    fn grouped_url(&self, day: NaiveDate, adjusted: bool) -> String {
        format!(
            "https://api.polygon.io/v2/aggs/grouped/locale/us/market/stocks/{day}\
             ?adjusted={adjusted}&apiKey={}",
            self.api_key
        )
    }
}

/// Map provider field names onto records, skipping entries without a ticker
/// or a close.
fn parse_records(body: GroupedResponse) -> Vec<DayRecord> {
    body.results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|agg| {
            Some(DayRecord {
                ticker: agg.ticker?,
                close: agg.close?,
                volume: agg.volume,
            })
        })
        .collect()
}

impl GroupedProvider for PolygonProvider {
    fn name(&self) -> &str {
        "polygon_grouped"
    }

    fn fetch_day(&self, day: NaiveDate, adjusted: bool) -> Vec<DayRecord> {
        let url = self.grouped_url(day, adjusted);

        for attempt in 1..=self.policy.max_attempts {
            match self.client.get(&url).send() {
                Ok(resp) => match classify(resp.status()) {
                    StatusClass::Success => match resp.json::<GroupedResponse>() {
                        Ok(body) => return parse_records(body),
                        // Unparseable body: treat like a transient fault
                        Err(_) => {
                            std::thread::sleep(self.policy.transient_backoff * attempt);
                        }
                    },
                    StatusClass::TerminalEmpty => return Vec::new(),
                    StatusClass::RateLimited => {
                        std::thread::sleep(self.policy.rate_limit_backoff * attempt);
                    }
                    StatusClass::Transient => {
                        std::thread::sleep(self.policy.transient_backoff * attempt);
                    }
                },
                Err(_) => {
                    std::thread::sleep(self.policy.transient_backoff * attempt);
                }
            }
        }

        // Retries exhausted: degrade silently to an empty day.
        Vec::new()
    }
}
