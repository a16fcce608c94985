
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use super::{ClaimSet, Error};
use crate::configuration::Configuration;
use crate::metrics_provider::{INTROSPECTION_DURATION, INTROSPECTION_REQUESTS};
use crate::secret::Secret;

static FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Resolves a bearer token into the claims of its introspection response.
#[async_trait]
pub trait Introspector: Send + Sync {
    async fn introspect(&self, token: &str) -> Result<ClaimSet, Error>;
}

/// RFC 7662 client: one form-encoded POST per token, authenticated with HTTP Basic.
pub struct IntrospectionClient {
    endpoint: String,
    client_id: String,
    client_secret: Secret<String>,
    tls_verification: bool,
    timeout: u64,
    client: Client,
}

impl IntrospectionClient {
    pub fn new(config: &Configuration) -> Result<Self, Error> {
        let mut client_builder = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(config.timeout));

        if !config.tls_verification {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: config.introspection_endpoint.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            tls_verification: config.tls_verification,
            timeout: config.timeout,
            client,
        })
    }

    async fn send(&self, token: &str) -> Result<Vec<u8>, Error> {
        let client_id = urlencoding::encode(&self.client_id);
        let client_secret = urlencoding::encode(self.client_secret.expose());
        let body = format!("token={}", urlencoding::encode(token));

        debug!("Performing introspection endpoint request");
        debug!(" - URL: {}", self.endpoint);
        debug!(" - OAuth2 client ID: {}", self.client_id);
        debug!(
            " - TLS: {}",
            if self.tls_verification {
                "<Enabled>"
            } else {
                "<Disabled>"
            }
        );
        debug!(" - Timeout: {} seconds", self.timeout);

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(client_id, Some(client_secret))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to call introspection endpoint: {e}");
                Error::from(e)
            })?;

        let status = response.status();
        debug!("Received response from introspection endpoint: HTTP {status}");

        if status != StatusCode::OK {
            warn!("Introspection endpoint answered with HTTP {status}");
            return Err(Error::Response(format!("HTTP status {}", status.as_u16())));
        }

        let body = response.bytes().await.map_err(|e| {
            warn!("Failed to read introspection response: {e}");
            Error::from(e)
        })?;

        Ok(body.to_vec())
    }
}

#[async_trait]
impl Introspector for IntrospectionClient {
    #[instrument(skip(self, token))]
    async fn introspect(&self, token: &str) -> Result<ClaimSet, Error> {
        if token.is_empty() {
            return Err(Error::Config("no token to introspect".to_string()));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(Error::Config(
                "client credentials are not configured".to_string(),
            ));
        }

        let timer = INTROSPECTION_DURATION.start_timer();
        let result = self
            .send(token)
            .await
            .and_then(|body| ClaimSet::parse(&body));
        timer.observe_duration();

        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.reason(),
        };
        INTROSPECTION_REQUESTS.with_label_values(&[label]).inc();

        if let Err(e) = &result {
            debug!("Introspection failed: {e}");
        }

        result
    }
}
