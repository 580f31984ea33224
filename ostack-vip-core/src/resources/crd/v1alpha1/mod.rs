use kube::{api::PatchParams, Client, CustomResourceExt};

use crate::kubernetes::operations::create_crd;

use self::cluster::Cluster;

pub mod cluster;

pub async fn create_v1alpha1_crds(client: &Client, apply_params: &PatchParams) -> anyhow::Result<()> {
    let cluster_spec = Cluster::crd();

    create_crd(client, &cluster_spec, apply_params).await?;

    Ok(())
}
