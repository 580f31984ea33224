use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "ostack-vip.dev",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus"
)]
pub struct ClusterSpec {
    /// tenant network the VIP port attaches to,
    /// filled in by upstream tooling once the subnet exists
    pub network: Option<ClusterNetworkRef>,
    /// external network used to allocate the floating IP, leaving this unset
    /// opts the cluster out of floating IP provisioning
    pub external_network_id: Option<String>,
    /// fixed IP of the control plane entry point within the subnet
    pub control_plane_vip: String,
    /// desired floating IP address, when left empty the networking service
    /// assigns one
    pub floating_ip: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct ClusterNetworkRef {
    /// network id
    pub id: String,
    /// subnet id within the network
    pub subnet_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct ClusterStatus {
    /// cluster networking state
    pub state: ClusterState,
    /// the VIP port owned by this cluster
    pub unmanaged_port: Option<UnmanagedPortRecord>,
    /// last successful reconciliation
    pub last_reconciled: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct UnmanagedPortRecord {
    /// port name
    pub name: String,
    /// port id
    pub id: String,
    /// floating IP associated with the port
    pub floating_ip: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub enum ClusterState {
    #[default]
    Unknown,
    Reconciled,
    ErrorProvisioning,
    ErrorInsufficientPermissions,
    UnknownError,
}
