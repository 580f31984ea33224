use log::{debug, info, warn};
use thiserror::Error;

use crate::resources::crd::v1alpha1::cluster::{ClusterSpec, UnmanagedPortRecord};

use super::{
    FixedIp, FloatingIp, FloatingIpCreateOpts, FloatingIpUpdateOpts, NetworkingApi,
    NetworkingApiError, Port, PortCreateOpts, PortFilter,
};

const NETWORK_PREFIX: &str = "openstack";

#[derive(Debug, Error)]
pub enum NetworkingError {
    #[error("Couldn't list VIP ports! Reason: {}", .0)]
    PortList(NetworkingApiError),
    #[error("Couldn't allocate the VIP port! Reason: {}", .0)]
    PortCreate(NetworkingApiError),
    #[error("Couldn't delete the VIP port! Reason: {}", .0)]
    PortDelete(NetworkingApiError),
    #[error("Couldn't list floating IPs! Reason: {}", .0)]
    FloatingIpList(NetworkingApiError),
    #[error("Couldn't allocate the floating IP! Reason: {}", .0)]
    FloatingIpCreate(NetworkingApiError),
    #[error("Couldn't associate the floating IP! Reason: {}", .0)]
    FloatingIpAssociate(NetworkingApiError),
}

pub fn vip_port_name(cluster_name: &str) -> String {
    format!("{NETWORK_PREFIX}-cluster-{cluster_name}")
}

/// Converges the unmanaged VIP port and its floating IP toward the cluster
/// spec and returns the record to persist in the cluster status. `None` means
/// provisioning was skipped entirely and the status must stay untouched.
///
/// It is up to cloud-init scripts to bind control plane nodes to the port.
pub async fn reconcile_vip_port(
    api: &dyn NetworkingApi,
    cluster_name: &str,
    spec: &ClusterSpec,
) -> Result<Option<UnmanagedPortRecord>, NetworkingError> {
    let Some(network) = &spec.network else {
        debug!("No need to reconcile the VIP port, no subnet exists yet");
        return Ok(None);
    };
    let Some(external_network_id) = spec
        .external_network_id
        .as_deref()
        .filter(|id| !id.is_empty())
    else {
        debug!("No need to create the VIP port, no external network is set");
        return Ok(None);
    };

    let port_name = vip_port_name(cluster_name);
    info!("Reconciling VIP port '{port_name}'...");

    let port = resolve_vip_port(
        api,
        &port_name,
        &network.id,
        &network.subnet_id,
        &spec.control_plane_vip,
    )
    .await?;
    let floating_ip = bind_floating_ip(api, &spec.floating_ip, external_network_id, &port.id).await?;

    Ok(Some(UnmanagedPortRecord {
        name: port.name,
        id: port.id,
        floating_ip: floating_ip.floating_ip_address,
    }))
}

/// Returns the port with the given name, creating it bound to `fixed_ip` on
/// the subnet when it doesn't exist yet.
pub async fn resolve_vip_port(
    api: &dyn NetworkingApi,
    name: &str,
    network_id: &str,
    subnet_id: &str,
    fixed_ip: &str,
) -> Result<Port, NetworkingError> {
    let filter = PortFilter {
        name: Some(name.to_owned()),
    };
    let mut ports = api
        .list_ports(&filter)
        .await
        .map_err(NetworkingError::PortList)?;

    if ports.is_empty() {
        let opts = PortCreateOpts {
            name: name.to_owned(),
            network_id: network_id.to_owned(),
            fixed_ips: vec![FixedIp {
                subnet_id: subnet_id.to_owned(),
                ip_address: fixed_ip.to_owned(),
            }],
        };

        return api
            .create_port(&opts)
            .await
            .map_err(NetworkingError::PortCreate);
    }

    if ports.len() > 1 {
        warn!("There are multiple ports named '{name}'! This could cause unintended behavior!");
    }

    Ok(ports.remove(0))
}

/// Finds or allocates the floating IP and re-affirms its binding to `port_id`.
/// The association update is issued unconditionally so that repeated
/// invocations with the same port always converge on the desired binding.
pub async fn bind_floating_ip(
    api: &dyn NetworkingApi,
    desired_address: &str,
    external_network_id: &str,
    port_id: &str,
) -> Result<FloatingIp, NetworkingError> {
    let existing = api
        .list_floating_ips()
        .await
        .map_err(NetworkingError::FloatingIpList)?
        .into_iter()
        .find(|floating_ip| floating_ip.floating_ip_address == desired_address);

    let floating_ip = match existing {
        Some(floating_ip) => floating_ip,
        None => {
            info!("Allocating floating IP '{desired_address}'...");
            let opts = FloatingIpCreateOpts {
                floating_ip_address: desired_address.to_owned(),
                floating_network_id: external_network_id.to_owned(),
            };

            api.create_floating_ip(&opts)
                .await
                .map_err(NetworkingError::FloatingIpCreate)?
        }
    };

    info!(
        "Associating floating IP '{}' with port '{port_id}'...",
        floating_ip.floating_ip_address
    );
    let opts = FloatingIpUpdateOpts {
        port_id: Some(port_id.to_owned()),
    };

    api.update_floating_ip(&floating_ip.id, &opts)
        .await
        .map_err(NetworkingError::FloatingIpAssociate)
}

/// Deletes the previously recorded VIP port. The associated floating IP is
/// deliberately left alone, its lifecycle is not owned by this component.
pub async fn delete_vip_port(
    api: &dyn NetworkingApi,
    record: Option<&UnmanagedPortRecord>,
) -> Result<(), NetworkingError> {
    let Some(record) = record else {
        return Ok(());
    };

    info!("Deleting VIP port '{}'...", record.name);
    api.delete_port(&record.id)
        .await
        .map_err(NetworkingError::PortDelete)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use async_trait::async_trait;

    use crate::resources::crd::v1alpha1::cluster::{ClusterNetworkRef, ClusterSpec};

    use super::*;

    #[derive(Default)]
    struct FakeNetworking {
        ports: Mutex<Vec<Port>>,
        floating_ips: Mutex<Vec<FloatingIp>>,
        list_port_calls: AtomicUsize,
        create_port_calls: AtomicUsize,
        delete_port_calls: AtomicUsize,
        list_floating_ip_calls: AtomicUsize,
        create_floating_ip_calls: AtomicUsize,
        update_floating_ip_calls: AtomicUsize,
        fail_update_floating_ip: bool,
        fail_delete_port: bool,
    }

    impl FakeNetworking {
        fn with_port(self, id: &str, name: &str) -> Self {
            self.ports.lock().unwrap().push(Port {
                id: id.to_owned(),
                name: name.to_owned(),
                network_id: "net-1".to_owned(),
                fixed_ips: vec![],
            });

            self
        }

        fn total_calls(&self) -> usize {
            self.list_port_calls.load(Ordering::SeqCst)
                + self.create_port_calls.load(Ordering::SeqCst)
                + self.delete_port_calls.load(Ordering::SeqCst)
                + self.list_floating_ip_calls.load(Ordering::SeqCst)
                + self.create_floating_ip_calls.load(Ordering::SeqCst)
                + self.update_floating_ip_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NetworkingApi for FakeNetworking {
        async fn list_ports(&self, filter: &PortFilter) -> Result<Vec<Port>, NetworkingApiError> {
            self.list_port_calls.fetch_add(1, Ordering::SeqCst);

            Ok(self
                .ports
                .lock()
                .unwrap()
                .iter()
                .filter(|port| filter.name.as_ref().map_or(true, |name| &port.name == name))
                .cloned()
                .collect())
        }

        async fn create_port(&self, opts: &PortCreateOpts) -> Result<Port, NetworkingApiError> {
            let count = self.create_port_calls.fetch_add(1, Ordering::SeqCst);
            let port = Port {
                id: format!("P{}", count + 1),
                name: opts.name.clone(),
                network_id: opts.network_id.clone(),
                fixed_ips: opts.fixed_ips.clone(),
            };
            self.ports.lock().unwrap().push(port.clone());

            Ok(port)
        }

        async fn delete_port(&self, id: &str) -> Result<(), NetworkingApiError> {
            self.delete_port_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete_port {
                return Err(NetworkingApiError::Api {
                    status: 409,
                    message: "port is in use".to_owned(),
                });
            }

            self.ports.lock().unwrap().retain(|port| port.id != id);

            Ok(())
        }

        async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, NetworkingApiError> {
            self.list_floating_ip_calls.fetch_add(1, Ordering::SeqCst);

            Ok(self.floating_ips.lock().unwrap().clone())
        }

        async fn create_floating_ip(
            &self,
            opts: &FloatingIpCreateOpts,
        ) -> Result<FloatingIp, NetworkingApiError> {
            let count = self.create_floating_ip_calls.fetch_add(1, Ordering::SeqCst);
            let floating_ip = FloatingIp {
                id: format!("F{}", count + 1),
                floating_ip_address: opts.floating_ip_address.clone(),
                floating_network_id: opts.floating_network_id.clone(),
                port_id: None,
            };
            self.floating_ips.lock().unwrap().push(floating_ip.clone());

            Ok(floating_ip)
        }

        async fn update_floating_ip(
            &self,
            id: &str,
            opts: &FloatingIpUpdateOpts,
        ) -> Result<FloatingIp, NetworkingApiError> {
            self.update_floating_ip_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_update_floating_ip {
                return Err(NetworkingApiError::Transport(
                    "connection reset by peer".to_owned(),
                ));
            }

            let mut floating_ips = self.floating_ips.lock().unwrap();
            let floating_ip = floating_ips
                .iter_mut()
                .find(|floating_ip| floating_ip.id == id)
                .ok_or_else(|| NetworkingApiError::Api {
                    status: 404,
                    message: format!("floating IP '{id}' not found"),
                })?;
            floating_ip.port_id = opts.port_id.clone();

            Ok(floating_ip.clone())
        }
    }

    fn demo_spec() -> ClusterSpec {
        ClusterSpec {
            network: Some(ClusterNetworkRef {
                id: "net-1".to_owned(),
                subnet_id: "sub-1".to_owned(),
            }),
            external_network_id: Some("ext-net".to_owned()),
            control_plane_vip: "10.0.0.5".to_owned(),
            floating_ip: "203.0.113.10".to_owned(),
        }
    }

    #[tokio::test]
    async fn reconcile_provisions_port_and_floating_ip_from_scratch() {
        let api = FakeNetworking::default();

        let record = reconcile_vip_port(&api, "demo", &demo_spec())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.name, "openstack-cluster-demo");
        assert_eq!(record.id, "P1");
        assert_eq!(record.floating_ip, "203.0.113.10");

        let ports = api.ports.lock().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].fixed_ips[0].subnet_id, "sub-1");
        assert_eq!(ports[0].fixed_ips[0].ip_address, "10.0.0.5");

        let floating_ips = api.floating_ips.lock().unwrap();
        assert_eq!(floating_ips.len(), 1);
        assert_eq!(floating_ips[0].port_id.as_deref(), Some("P1"));
    }

    #[tokio::test]
    async fn port_resolution_is_idempotent() {
        let api = FakeNetworking::default();

        let first = resolve_vip_port(&api, "openstack-cluster-demo", "net-1", "sub-1", "10.0.0.5")
            .await
            .unwrap();
        let second = resolve_vip_port(&api, "openstack-cluster-demo", "net-1", "sub-1", "10.0.0.5")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(api.create_port_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_port_wins_when_the_name_is_ambiguous() {
        let api = FakeNetworking::default()
            .with_port("P-a", "openstack-cluster-demo")
            .with_port("P-b", "openstack-cluster-demo");

        let port = resolve_vip_port(&api, "openstack-cluster-demo", "net-1", "sub-1", "10.0.0.5")
            .await
            .unwrap();

        assert_eq!(port.id, "P-a");
        assert_eq!(api.create_port_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn floating_ip_binding_is_idempotent() {
        let api = FakeNetworking::default();

        let first = bind_floating_ip(&api, "203.0.113.10", "ext-net", "P1")
            .await
            .unwrap();
        let second = bind_floating_ip(&api, "203.0.113.10", "ext-net", "P1")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(api.create_floating_ip_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.update_floating_ip_calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.port_id.as_deref(), Some("P1"));
    }

    #[tokio::test]
    async fn reconcile_skips_when_no_subnet_exists() {
        let api = FakeNetworking::default();
        let spec = ClusterSpec {
            network: None,
            ..demo_spec()
        };

        let record = reconcile_vip_port(&api, "demo", &spec).await.unwrap();

        assert!(record.is_none());
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn reconcile_skips_without_an_external_network() {
        let api = FakeNetworking::default();
        let spec = ClusterSpec {
            external_network_id: None,
            ..demo_spec()
        };

        let record = reconcile_vip_port(&api, "demo", &spec).await.unwrap();

        assert!(record.is_none());
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn no_record_is_produced_when_association_fails() {
        let api = FakeNetworking {
            fail_update_floating_ip: true,
            ..Default::default()
        };

        let result = reconcile_vip_port(&api, "demo", &demo_spec()).await;

        assert!(matches!(result, Err(NetworkingError::FloatingIpAssociate(_))));

        // the floating IP may be left behind unassociated, but no record
        // referencing it can have been returned
        let floating_ips = api.floating_ips.lock().unwrap();
        assert_eq!(floating_ips.len(), 1);
        assert_eq!(floating_ips[0].port_id, None);
    }

    #[tokio::test]
    async fn teardown_without_a_record_is_a_noop() {
        let api = FakeNetworking::default();

        delete_vip_port(&api, None).await.unwrap();

        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn teardown_deletes_the_recorded_port() {
        let api = FakeNetworking::default().with_port("P1", "openstack-cluster-demo");
        let record = UnmanagedPortRecord {
            name: "openstack-cluster-demo".to_owned(),
            id: "P1".to_owned(),
            floating_ip: "203.0.113.10".to_owned(),
        };

        delete_vip_port(&api, Some(&record)).await.unwrap();

        assert_eq!(api.delete_port_calls.load(Ordering::SeqCst), 1);
        assert!(api.ports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn teardown_surfaces_store_errors() {
        let api = FakeNetworking {
            fail_delete_port: true,
            ..Default::default()
        };
        let record = UnmanagedPortRecord {
            name: "openstack-cluster-demo".to_owned(),
            id: "P1".to_owned(),
            floating_ip: "203.0.113.10".to_owned(),
        };

        let result = delete_vip_port(&api, Some(&record)).await;

        assert!(matches!(result, Err(NetworkingError::PortDelete(_))));
    }
}
