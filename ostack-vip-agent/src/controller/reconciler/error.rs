use ostack_vip_core::openstack::networking::NetworkingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Couldn't patch the resource! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("Couldn't reconcile the cluster network! Reason: {}", .0)]
    NetworkingError(NetworkingError),
}
