use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod networking;

/// A virtual network attachment point with a fixed IP binding within a subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub network_id: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIp {
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
}

/// A publicly routable address allocated from an external network,
/// optionally associated with a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingIp {
    pub id: String,
    pub floating_ip_address: String,
    pub floating_network_id: String,
    #[serde(default)]
    pub port_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PortFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortCreateOpts {
    pub name: String,
    pub network_id: String,
    pub fixed_ips: Vec<FixedIp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FloatingIpCreateOpts {
    /// omitted from the request when empty, the service assigns an address
    #[serde(skip_serializing_if = "String::is_empty")]
    pub floating_ip_address: String,
    pub floating_network_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FloatingIpUpdateOpts {
    /// `None` detaches the floating IP from its port
    pub port_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum NetworkingApiError {
    #[error("transport error: {}", .0)]
    Transport(String),
    #[error("API responded with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("couldn't decode API response: {}", .0)]
    Decode(String),
}

/// The networking service operations this controller relies on.
/// Implementations perform one store call per method and propagate failures
/// untouched; retry policy belongs to the reconciliation loop.
#[async_trait]
pub trait NetworkingApi: Send + Sync {
    async fn list_ports(&self, filter: &PortFilter) -> Result<Vec<Port>, NetworkingApiError>;

    async fn create_port(&self, opts: &PortCreateOpts) -> Result<Port, NetworkingApiError>;

    async fn delete_port(&self, id: &str) -> Result<(), NetworkingApiError>;

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, NetworkingApiError>;

    async fn create_floating_ip(
        &self,
        opts: &FloatingIpCreateOpts,
    ) -> Result<FloatingIp, NetworkingApiError>;

    async fn update_floating_ip(
        &self,
        id: &str,
        opts: &FloatingIpUpdateOpts,
    ) -> Result<FloatingIp, NetworkingApiError>;
}
