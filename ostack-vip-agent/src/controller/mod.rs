use std::sync::Arc;

use kube::{api::PatchParams, Client};
use ostack_vip_core::{openstack::NetworkingApi, resources::crd::v1alpha1::create_v1alpha1_crds};

use self::{cluster::start_cluster_controller, reconciler::context::ReconcilerContext};

pub mod cluster;
pub mod reconciler;

pub const CONTROLLER_FIELD_MANAGER: &str = "ostack-vip-controller";

pub async fn main_controller(client: Client, networking: Arc<dyn NetworkingApi>) {
    ensure_crds(&client).await;

    let context = Arc::new(ReconcilerContext { client, networking });

    start_cluster_controller(&context).await;
}

async fn ensure_crds(client: &Client) {
    let apply_params = PatchParams::apply(CONTROLLER_FIELD_MANAGER);
    if let Err(error) = create_v1alpha1_crds(client, &apply_params).await {
        log::warn!("Couldn't apply the CRDs, assuming they are managed externally! {error:?}");
    }
}
