//! Remote thermostat service adapter.
//!
//! Two fixed endpoints:
//! - measurement endpoint: POST with the raw sensor text as body
//! - status endpoint: GET, body `true` means heat
//!
//! Neither call retries. Failures are mapped to `ExecError` and left to
//! the control loop.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use thermostat_domain::{DesiredState, Measurement};
use thermostat_exec::{ExecError, ThermostatApiPort};

use crate::http_client::{HttpClient, HttpError, HttpTransport, ReqwestTransport};

/// The two URLs the control loop talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThermostatEndpoints {
    /// Receives POSTed measurements
    pub measurement_url: String,
    /// Answers GET with the desired heater state
    pub status_url: String,
}

/// HTTP implementation of `ThermostatApiPort`.
pub struct RemoteThermostatApi<T: HttpTransport = ReqwestTransport> {
    client: HttpClient<T>,
    endpoints: ThermostatEndpoints,
}

impl RemoteThermostatApi<ReqwestTransport> {
    /// Create an adapter on the production transport.
    pub fn new(endpoints: ThermostatEndpoints, request_timeout: Duration) -> Result<Self, HttpError> {
        let client = HttpClient::new(request_timeout)?;
        info!(
            measurement_url = %endpoints.measurement_url,
            status_url = %endpoints.status_url,
            timeout_ms = request_timeout.as_millis() as u64,
            "Remote thermostat API configured"
        );
        Ok(Self { client, endpoints })
    }
}

impl<T: HttpTransport> RemoteThermostatApi<T> {
    /// Create an adapter on an existing client.
    pub fn with_client(client: HttpClient<T>, endpoints: ThermostatEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Configured endpoints.
    pub fn endpoints(&self) -> &ThermostatEndpoints {
        &self.endpoints
    }

    /// Underlying client.
    pub fn client(&self) -> &HttpClient<T> {
        &self.client
    }
}

impl From<HttpError> for ExecError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(_) => ExecError::Timeout(err.to_string()),
            other => ExecError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> ThermostatApiPort for RemoteThermostatApi<T> {
    async fn publish(&self, measurement: &Measurement) -> Result<(), ExecError> {
        let response = self
            .client
            .post(&self.endpoints.measurement_url, measurement.as_str())
            .await?;

        debug!(status = response.status, "Measurement published");
        Ok(())
    }

    async fn fetch_desired_state(&self) -> Result<DesiredState, ExecError> {
        let body = self.client.get(&self.endpoints.status_url).await?;
        let state = DesiredState::from_status_body(&body);

        debug!(%body, heating = state.is_heating(), "Desired state fetched");
        Ok(state)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::recording::RecordingTransport;
    use crate::http_client::RedirectPolicy;
    use thermostat_domain::HttpMethod;

    fn endpoints() -> ThermostatEndpoints {
        ThermostatEndpoints {
            measurement_url: "http://cloud/measurements".to_string(),
            status_url: "http://cloud/status".to_string(),
        }
    }

    fn api_replying(body: &str) -> RemoteThermostatApi<RecordingTransport> {
        RemoteThermostatApi::with_client(
            HttpClient::with_transport(RecordingTransport::replying(body)),
            endpoints(),
        )
    }

    #[tokio::test]
    async fn test_publish_posts_body_verbatim() {
        for text in ["72.5", " 72.5\n", "{\"t\": 19}", "ünïcode"] {
            let api = api_replying("");
            api.publish(&Measurement::new(text)).await.unwrap();

            let requests = api.client().transport().requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].method, HttpMethod::Post);
            assert_eq!(requests[0].url, "http://cloud/measurements");
            assert_eq!(requests[0].body.as_deref(), Some(text));
            assert_eq!(requests[0].redirect, RedirectPolicy::Follow);
        }
    }

    #[tokio::test]
    async fn test_fetch_true_means_heating() {
        let api = api_replying("true");
        assert!(api.fetch_desired_state().await.unwrap().is_heating());

        let requests = api.client().transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "http://cloud/status");
        assert_eq!(requests[0].body, None);
    }

    #[tokio::test]
    async fn test_fetch_anything_else_means_off() {
        for body in ["True", "true ", "", "false", "{\"heat\":true}"] {
            let api = api_replying(body);
            assert!(!api.fetch_desired_state().await.unwrap().is_heating(), "body {:?}", body);
        }
    }

    #[tokio::test]
    async fn test_fetch_transport_error_is_not_a_state() {
        let transport = RecordingTransport::default();
        transport.push(Err(HttpError::RequestFailed("dns".to_string())));
        let api = RemoteThermostatApi::with_client(HttpClient::with_transport(transport), endpoints());

        let err = api.fetch_desired_state().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_status_error_maps_to_transport() {
        let transport = RecordingTransport::default();
        transport.push(Err(HttpError::Status {
            status: 503,
            body: "true".to_string(),
        }));
        let api = RemoteThermostatApi::with_client(HttpClient::with_transport(transport), endpoints());

        assert!(matches!(api.fetch_desired_state().await, Err(ExecError::Transport(_))));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout() {
        let transport = RecordingTransport::default();
        transport.push(Err(HttpError::Timeout(Duration::from_secs(2))));
        let api = RemoteThermostatApi::with_client(HttpClient::with_transport(transport), endpoints());

        let err = api.publish(&Measurement::new("70")).await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout(_)));
    }
}
