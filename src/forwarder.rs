//! Outbound best-effort sinks for published readings.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{BulletinConfig, CloudConfig};
use crate::error::ForwarderError;
use crate::reading::Reading;

/// Fixed path prefix of the public bulletin service.
const BULLETIN_PREFIX: &str = "dweet/for";

/// Publishes readings to the public bulletin endpoint as a GET with
/// url-encoded fields. Disabled sinks perform no network action at all.
pub struct BulletinForwarder {
    config: BulletinConfig,
    client: reqwest::Client,
}

impl BulletinForwarder {
    pub fn new(config: BulletinConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Mirror a reading to the bulletin channel.
    pub async fn publish(&self, reading: &Reading) -> Result<(), ForwarderError> {
        if !self.config.enabled {
            debug!("Bulletin sink disabled; nothing to do");
            return Ok(());
        }

        let query = serde_urlencoded::to_string(self.fields(reading))
            .map_err(|e| ForwarderError::Encode(e.to_string()))?;
        let url = format!(
            "{}://{}/{}/{}?{}",
            self.config.scheme, self.config.host, BULLETIN_PREFIX, self.config.channel, query
        );

        debug!(%url, "Publishing to bulletin");
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await?;

        // Response body is discarded; the status is diagnostics only.
        debug!(status = %response.status(), "Bulletin response");
        Ok(())
    }

    fn fields(&self, reading: &Reading) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("temperature", reading.temperature.to_string()),
            ("humidity", reading.humidity.to_string()),
            ("pressure", reading.pressure.to_string()),
            ("latitude", reading.latitude.to_string()),
            ("longitude", reading.longitude.to_string()),
        ];
        if self.config.include_text_fields {
            fields.push(("key_operation", reading.key_operation.clone()));
        }
        fields
    }
}

/// Publishes readings to the private cloud endpoint as a JSON POST.
pub struct CloudForwarder {
    config: CloudConfig,
    client: reqwest::Client,
}

impl CloudForwarder {
    pub fn new(config: CloudConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Mirror a reading to the cloud ingest endpoint.
    pub async fn publish(&self, reading: &Reading) -> Result<(), ForwarderError> {
        if !self.config.enabled {
            debug!("Cloud sink disabled; nothing to do");
            return Ok(());
        }

        let url = format!(
            "{}://{}:{}{}",
            self.config.scheme, self.config.host, self.config.port, self.config.path
        );

        debug!(%url, body = ?reading, "Publishing to cloud");
        let response = self
            .client
            .post(&url)
            .json(reading)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await?;

        debug!(status = %response.status(), "Cloud response");
        Ok(())
    }
}

/// Both sinks, dispatched in a fixed order within the poll cycle.
pub struct Forwarders {
    bulletin: BulletinForwarder,
    cloud: CloudForwarder,
}

impl Forwarders {
    pub fn new(bulletin: BulletinForwarder, cloud: CloudForwarder) -> Self {
        Self { bulletin, cloud }
    }

    /// Mirror a reading to both sinks, bulletin first.
    ///
    /// A failing sink is logged and isolated; it cancels neither the other
    /// sink nor the caller's cycle.
    pub async fn dispatch(&self, reading: &Reading) {
        if let Err(e) = self.bulletin.publish(reading).await {
            warn!(sink = "bulletin", error = %e, "Forward failed");
        }
        if let Err(e) = self.cloud.publish(reading).await {
            warn!(sink = "cloud", error = %e, "Forward failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_reading() -> Reading {
        Reading {
            temperature: 27,
            humidity: 41,
            pressure: 102,
            latitude: 12.5,
            longitude: 77.5,
            key_operation: "SELECT".to_string(),
        }
    }

    fn bulletin_config(server: &MockServer) -> BulletinConfig {
        BulletinConfig {
            enabled: true,
            scheme: "http".to_string(),
            host: server.address().to_string(),
            channel: "plant-7".to_string(),
            include_text_fields: true,
            timeout_ms: 1000,
        }
    }

    fn cloud_config(server: &MockServer) -> CloudConfig {
        CloudConfig {
            enabled: true,
            scheme: "http".to_string(),
            host: server.address().ip().to_string(),
            port: server.address().port(),
            path: "/ingest".to_string(),
            timeout_ms: 1000,
        }
    }

    #[tokio::test]
    async fn test_bulletin_sends_urlencoded_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dweet/for/plant-7"))
            .and(query_param("temperature", "27"))
            .and(query_param("humidity", "41"))
            .and(query_param("pressure", "102"))
            .and(query_param("latitude", "12.5"))
            .and(query_param("longitude", "77.5"))
            .and(query_param("key_operation", "SELECT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = BulletinForwarder::new(bulletin_config(&server));
        forwarder.publish(&sample_reading()).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulletin_can_exclude_text_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dweet/for/plant-7"))
            .and(query_param("temperature", "27"))
            .and(query_param_is_missing("key_operation"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = BulletinConfig {
            include_text_fields: false,
            ..bulletin_config(&server)
        };
        let forwarder = BulletinForwarder::new(config);
        forwarder.publish(&sample_reading()).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulletin_non_2xx_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let forwarder = BulletinForwarder::new(bulletin_config(&server));
        assert!(forwarder.publish(&sample_reading()).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_bulletin_makes_no_request() {
        let server = MockServer::start().await;

        let config = BulletinConfig {
            enabled: false,
            ..bulletin_config(&server)
        };
        let forwarder = BulletinForwarder::new(config);
        for _ in 0..3 {
            forwarder.publish(&sample_reading()).await.unwrap();
        }

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cloud_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .and(header("content-type", "application/json"))
            .and(body_json(sample_reading()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = CloudForwarder::new(cloud_config(&server));
        forwarder.publish(&sample_reading()).await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_cloud_makes_no_request() {
        let server = MockServer::start().await;

        let config = CloudConfig {
            enabled: false,
            ..cloud_config(&server)
        };
        let forwarder = CloudForwarder::new(config);
        for _ in 0..3 {
            forwarder.publish(&sample_reading()).await.unwrap();
        }

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_cloud_is_an_error() {
        let config = CloudConfig {
            enabled: true,
            scheme: "http".to_string(),
            host: "127.0.0.1".to_string(),
            // Nothing listens here; the connection is refused immediately.
            port: 9,
            path: "/ingest".to_string(),
            timeout_ms: 500,
        };
        let forwarder = CloudForwarder::new(config);

        let err = forwarder.publish(&sample_reading()).await.unwrap_err();
        assert!(matches!(err, ForwarderError::Request(_)));
    }

    #[tokio::test]
    async fn test_dispatch_survives_one_failing_sink() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        // Bulletin points at a refused port; cloud must still receive.
        let bulletin = BulletinForwarder::new(BulletinConfig {
            enabled: true,
            scheme: "http".to_string(),
            host: "127.0.0.1:9".to_string(),
            channel: "plant-7".to_string(),
            include_text_fields: true,
            timeout_ms: 500,
        });
        let cloud = CloudForwarder::new(cloud_config(&server));

        Forwarders::new(bulletin, cloud)
            .dispatch(&sample_reading())
            .await;
    }
}
