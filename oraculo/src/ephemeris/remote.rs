use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::{BodyPosition, EphemerisSource, Transits, BODIES};
use crate::error::{OraculoError, Result};

/// Fetches positions from an HTTP service answering
/// `GET {url}?at=<rfc3339>` with `{ "<body>": <degrees>, ... }`.
#[derive(Clone)]
pub struct RemoteEphemeris {
    url: String,
    client: reqwest::Client,
}

impl RemoteEphemeris {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OraculoError::Ephemeris(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl EphemerisSource for RemoteEphemeris {
    async fn positions(&self, at: DateTime<Utc>) -> Result<Transits> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("at", at.to_rfc3339_opts(SecondsFormat::Secs, true))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OraculoError::Ephemeris(format!(
                "Ephemeris service returned {}",
                response.status()
            )));
        }

        let raw: HashMap<String, f64> = response.json().await?;
        Ok(order_positions(raw))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/// Known bodies first in canonical order, then anything else alphabetically.
fn order_positions(raw: HashMap<String, f64>) -> Transits {
    let mut entries: Vec<(String, f64)> = raw.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| {
        let rank = |name: &str| BODIES.iter().position(|body| *body == name).unwrap_or(usize::MAX);
        rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
    });

    entries
        .into_iter()
        .map(|(name, degrees)| BodyPosition::new(name, degrees))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn positions_are_ordered_canonically() {
        let raw = HashMap::from([
            ("Luna".to_string(), 10.0),
            ("Ceres".to_string(), 5.0),
            ("Sol".to_string(), 20.126),
        ]);

        let ordered = order_positions(raw);
        let names: Vec<&str> = ordered.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Sol", "Luna", "Ceres"]);
        assert_eq!(ordered[0].degrees, 20.13);
    }

    #[tokio::test]
    async fn fetches_positions_from_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/positions"))
            .and(query_param("at", "2024-03-20T03:06:00Z"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"Sol": 0.01, "Luna": 182.5})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = RemoteEphemeris::new(&format!("{}/positions", server.uri()), 2).unwrap();
        let at = DateTime::parse_from_rfc3339("2024-03-20T03:06:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let transits = source.positions(at).await.unwrap();
        assert_eq!(transits, vec![
            BodyPosition::new("Sol", 0.01),
            BodyPosition::new("Luna", 182.5),
        ]);
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = RemoteEphemeris::new(&server.uri(), 2).unwrap();
        let result = source.positions(Utc::now()).await;
        assert!(matches!(result, Err(OraculoError::Ephemeris(_))));
    }
}
