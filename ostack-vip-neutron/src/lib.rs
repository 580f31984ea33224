use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use log::debug;
use ostack_vip_core::openstack::{
    FloatingIp, FloatingIpCreateOpts, FloatingIpUpdateOpts, NetworkingApi, NetworkingApiError,
    Port, PortCreateOpts, PortFilter,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub const NEUTRON_URL_VARIABLE: &str = "OSTACK_VIP_NEUTRON_URL";
pub const AUTH_TOKEN_VARIABLE: &str = "OSTACK_VIP_AUTH_TOKEN";

#[derive(Debug, Error)]
pub enum NeutronConfigError {
    #[error("'{}' environment variable is not set!", .0)]
    MissingVariable(&'static str),
    #[error("Couldn't construct the HTTP client! Reason: {}", .0)]
    HttpClient(reqwest::Error),
}

#[derive(Clone)]
pub struct NeutronConfig {
    /// Neutron endpoint including the API version, e.g. `http://neutron:9696/v2.0`
    pub endpoint: String,
    /// pre-issued token sent as `X-Auth-Token` on every request
    pub token: String,
}

impl NeutronConfig {
    pub fn from_env() -> Result<Self, NeutronConfigError> {
        Ok(Self {
            endpoint: env::var(NEUTRON_URL_VARIABLE)
                .map_err(|_| NeutronConfigError::MissingVariable(NEUTRON_URL_VARIABLE))?,
            token: env::var(AUTH_TOKEN_VARIABLE)
                .map_err(|_| NeutronConfigError::MissingVariable(AUTH_TOKEN_VARIABLE))?,
        })
    }
}

impl fmt::Debug for NeutronConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeutronConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Thin client over the Neutron `/v2.0` REST surface. Performs a single
/// request per call and maps failures into [`NetworkingApiError`]; retry
/// policy belongs to the caller.
pub struct NeutronClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl fmt::Debug for NeutronClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeutronClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl NeutronClient {
    pub fn new(config: NeutronConfig) -> Result<Self, NeutronConfigError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(NeutronConfigError::HttpClient)?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            token: config.token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, NetworkingApiError> {
        let response = request
            .header("X-Auth-Token", &self.token)
            .send()
            .await
            .map_err(|error| NetworkingApiError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read the error response".to_owned());

            return Err(NetworkingApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, NetworkingApiError> {
    response
        .json()
        .await
        .map_err(|error| NetworkingApiError::Decode(error.to_string()))
}

#[derive(Serialize)]
struct PortCreateRequest<'a> {
    port: &'a PortCreateOpts,
}

#[derive(Deserialize)]
struct PortResponse {
    port: Port,
}

#[derive(Deserialize)]
struct PortListResponse {
    ports: Vec<Port>,
}

#[derive(Serialize)]
struct FloatingIpCreateRequest<'a> {
    floatingip: &'a FloatingIpCreateOpts,
}

#[derive(Serialize)]
struct FloatingIpUpdateRequest<'a> {
    floatingip: &'a FloatingIpUpdateOpts,
}

#[derive(Deserialize)]
struct FloatingIpResponse {
    floatingip: FloatingIp,
}

#[derive(Deserialize)]
struct FloatingIpListResponse {
    floatingips: Vec<FloatingIp>,
}

#[async_trait]
impl NetworkingApi for NeutronClient {
    async fn list_ports(&self, filter: &PortFilter) -> Result<Vec<Port>, NetworkingApiError> {
        debug!("GET /ports");
        let request = self.client.get(self.url("/ports")).query(filter);
        let response = self.send(request).await?;

        Ok(decode::<PortListResponse>(response).await?.ports)
    }

    async fn create_port(&self, opts: &PortCreateOpts) -> Result<Port, NetworkingApiError> {
        debug!("POST /ports");
        let request = self
            .client
            .post(self.url("/ports"))
            .json(&PortCreateRequest { port: opts });
        let response = self.send(request).await?;

        Ok(decode::<PortResponse>(response).await?.port)
    }

    async fn delete_port(&self, id: &str) -> Result<(), NetworkingApiError> {
        debug!("DELETE /ports/{id}");
        let request = self.client.delete(self.url(&format!("/ports/{id}")));
        self.send(request).await?;

        Ok(())
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, NetworkingApiError> {
        debug!("GET /floatingips");
        let request = self.client.get(self.url("/floatingips"));
        let response = self.send(request).await?;

        Ok(decode::<FloatingIpListResponse>(response).await?.floatingips)
    }

    async fn create_floating_ip(
        &self,
        opts: &FloatingIpCreateOpts,
    ) -> Result<FloatingIp, NetworkingApiError> {
        debug!("POST /floatingips");
        let request = self
            .client
            .post(self.url("/floatingips"))
            .json(&FloatingIpCreateRequest { floatingip: opts });
        let response = self.send(request).await?;

        Ok(decode::<FloatingIpResponse>(response).await?.floatingip)
    }

    async fn update_floating_ip(
        &self,
        id: &str,
        opts: &FloatingIpUpdateOpts,
    ) -> Result<FloatingIp, NetworkingApiError> {
        debug!("PUT /floatingips/{id}");
        let request = self
            .client
            .put(self.url(&format!("/floatingips/{id}")))
            .json(&FloatingIpUpdateRequest { floatingip: opts });
        let response = self.send(request).await?;

        Ok(decode::<FloatingIpResponse>(response).await?.floatingip)
    }
}
