use std::sync::Arc;

use kube::Client;
use ostack_vip_core::openstack::NetworkingApi;

pub struct ReconcilerContext {
    pub client: Client,
    pub networking: Arc<dyn NetworkingApi>,
}
