use std::sync::Arc;

use futures::StreamExt;
use kube::{
    runtime::{watcher::Config, Controller},
    Api,
};
use log::{info, warn};
use ostack_vip_core::resources::crd::v1alpha1::cluster::Cluster;

use super::reconciler::{
    cluster::{reconcile_cluster, reconcile_cluster_error},
    context::ReconcilerContext,
};

pub async fn start_cluster_controller(context: &Arc<ReconcilerContext>) {
    info!("Creating cluster controller...");

    let cluster_api: Api<Cluster> = Api::all(context.client.clone());
    let controller = Controller::new(cluster_api, Config::default())
        .shutdown_on_signal()
        .run(reconcile_cluster, reconcile_cluster_error, context.clone())
        .for_each(|result| async move {
            match result {
                Ok(object) => info!("Reconciled cluster {object:?}"),
                Err(error) => warn!("Cluster reconciliation failed: {error:#?}"),
            }
        });

    info!("Cluster controller created!");

    controller.await
}
