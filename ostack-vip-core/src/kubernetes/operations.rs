use std::fmt::Debug;

use anyhow::{anyhow, Context};
use k8s_openapi::{
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
    serde::{de::DeserializeOwned, Serialize},
    NamespaceResourceScope,
};
use kube::{
    api::{Patch, PatchParams},
    Api, Client, Resource,
};
use log::info;
use serde_json::json;

use crate::helpers::pretty_type_name;

pub async fn create_crd(
    client: &Client,
    crd: &CustomResourceDefinition,
    patch_params: &PatchParams,
) -> anyhow::Result<()> {
    let crd_name = crd
        .metadata
        .name
        .as_ref()
        .ok_or_else(|| anyhow!("CRD is missing a name!"))?;
    let crd_apiversions = crd
        .spec
        .versions
        .iter()
        .map(|version| version.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ");

    info!("Creating {crd_name} ({crd_apiversions}) CRD...");

    let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
    crd_api
        .patch(crd_name, patch_params, &Patch::Apply(crd))
        .await
        .context(format!(
            "Unable to create {crd_name} ({crd_apiversions}) CRD!"
        ))?;

    Ok(())
}

pub async fn apply_resource_status<T, S>(
    client: &Client,
    status: S,
    name: &str,
    namespace: &str,
    patch_params: &PatchParams,
) -> Result<(), kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
    S: Serialize,
{
    info!(
        "Applying status to the '{name}' {} resource...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);
    resource_api
        .patch_status(name, patch_params, &Patch::Merge(json!({ "status": status })))
        .await?;

    Ok(())
}
