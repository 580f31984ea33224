use std::{sync::Arc, time::Duration};

use chrono::Utc;
use kube::{
    api::{Patch, PatchParams},
    runtime::controller::Action,
    Api, ResourceExt,
};
use log::info;
use ostack_vip_core::{
    kubernetes::operations::apply_resource_status,
    openstack::networking::{delete_vip_port, reconcile_vip_port},
    resources::crd::v1alpha1::cluster::{
        Cluster, ClusterState, ClusterStatus, UnmanagedPortRecord,
    },
    CLUSTER_FINALIZER,
};
use serde_json::json;

use crate::controller::CONTROLLER_FIELD_MANAGER;

use super::{context::ReconcilerContext, error::ReconcilerError, RequireMetadata};

const SUCCESS_REQUEUE_SECS: u64 = 60 * 5;

const DEFAULT_ERROR_REQUEUE_SECS: u64 = 10;
const PERMISSION_ERROR_REQUEUE_SECS: u64 = 60 * 5;
const FINALIZER_REQUEUE_SECS: u64 = 1;

pub async fn reconcile_cluster(
    object: Arc<Cluster>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, ReconcilerError> {
    if object.metadata.deletion_timestamp.is_some() {
        return teardown(&object, &context).await;
    }

    if ensure_finalizer(&object, &context).await? {
        return Ok(Action::requeue(Duration::from_secs(FINALIZER_REQUEUE_SECS)));
    }

    match try_reconcile(&object, &context).await {
        Ok(_) => Ok(Action::requeue(Duration::from_secs(SUCCESS_REQUEUE_SECS))),
        Err(error) => {
            let state = get_error_state(&error);

            let _ = apply_state(
                &context,
                object.require_name()?,
                object.require_namespace()?,
                state,
            )
            .await;

            Err(error)
        }
    }
}

pub fn reconcile_cluster_error(
    _object: Arc<Cluster>,
    error: &ReconcilerError,
    _context: Arc<ReconcilerContext>,
) -> Action {
    Action::requeue(match error {
        ReconcilerError::KubeApiError(kube::Error::Auth(_)) => {
            Duration::from_secs(PERMISSION_ERROR_REQUEUE_SECS)
        }
        _ => Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
    })
}

async fn try_reconcile(
    object: &Cluster,
    context: &ReconcilerContext,
) -> Result<(), ReconcilerError> {
    let name = object.require_name()?;

    let record = reconcile_vip_port(context.networking.as_ref(), name, &object.spec)
        .await
        .map_err(ReconcilerError::NetworkingError)?;

    // nothing was provisioned, leave the status alone
    let Some(record) = record else {
        return Ok(());
    };

    apply_status(context, name, object.require_namespace()?, record).await?;

    Ok(())
}

async fn teardown(
    object: &Cluster,
    context: &ReconcilerContext,
) -> Result<Action, ReconcilerError> {
    if object
        .finalizers()
        .iter()
        .any(|finalizer| finalizer == CLUSTER_FINALIZER)
    {
        let record = object
            .status
            .as_ref()
            .and_then(|status| status.unmanaged_port.as_ref());

        delete_vip_port(context.networking.as_ref(), record)
            .await
            .map_err(ReconcilerError::NetworkingError)?;

        remove_finalizer(object, context).await?;
    }

    Ok(Action::await_change())
}

async fn ensure_finalizer(
    object: &Cluster,
    context: &ReconcilerContext,
) -> Result<bool, ReconcilerError> {
    if object
        .finalizers()
        .iter()
        .any(|finalizer| finalizer == CLUSTER_FINALIZER)
    {
        return Ok(false);
    }

    info!("Adding finalizer to the '{}' cluster...", object.require_name()?);

    let mut finalizers = object.finalizers().to_vec();
    finalizers.push(CLUSTER_FINALIZER.to_owned());
    patch_finalizers(object, context, finalizers).await?;

    Ok(true)
}

async fn remove_finalizer(
    object: &Cluster,
    context: &ReconcilerContext,
) -> Result<(), ReconcilerError> {
    let finalizers = object
        .finalizers()
        .iter()
        .filter(|finalizer| finalizer.as_str() != CLUSTER_FINALIZER)
        .cloned()
        .collect();

    patch_finalizers(object, context, finalizers).await
}

async fn patch_finalizers(
    object: &Cluster,
    context: &ReconcilerContext,
    finalizers: Vec<String>,
) -> Result<(), ReconcilerError> {
    let cluster_api: Api<Cluster> =
        Api::namespaced(context.client.clone(), object.require_namespace()?);
    cluster_api
        .patch(
            object.require_name()?,
            &PatchParams::default(),
            &Patch::Merge(json!({ "metadata": { "finalizers": finalizers } })),
        )
        .await
        .map_err(ReconcilerError::KubeApiError)?;

    Ok(())
}

async fn apply_status(
    context: &ReconcilerContext,
    name: &str,
    namespace: &str,
    record: UnmanagedPortRecord,
) -> Result<(), ReconcilerError> {
    let status = ClusterStatus {
        state: ClusterState::Reconciled,
        unmanaged_port: Some(record),
        last_reconciled: Some(Utc::now()),
    };

    apply_resource_status::<Cluster, ClusterStatus>(
        &context.client,
        status,
        name,
        namespace,
        &PatchParams::apply(CONTROLLER_FIELD_MANAGER),
    )
    .await
    .map_err(ReconcilerError::KubeApiError)?;

    Ok(())
}

// failure paths only patch the state field, never the port record
async fn apply_state(
    context: &ReconcilerContext,
    name: &str,
    namespace: &str,
    state: ClusterState,
) -> Result<(), ReconcilerError> {
    let cluster_api: Api<Cluster> = Api::namespaced(context.client.clone(), namespace);
    cluster_api
        .patch_status(
            name,
            &PatchParams::apply(CONTROLLER_FIELD_MANAGER),
            &Patch::Merge(json!({ "status": { "state": state } })),
        )
        .await
        .map_err(ReconcilerError::KubeApiError)?;

    Ok(())
}

fn get_error_state(error: &ReconcilerError) -> ClusterState {
    match error {
        ReconcilerError::NetworkingError(_) => ClusterState::ErrorProvisioning,
        ReconcilerError::KubeApiError(error) => match error {
            kube::Error::Auth(_) => ClusterState::ErrorInsufficientPermissions,
            kube::Error::Api(error) => match error.code {
                403 => ClusterState::ErrorInsufficientPermissions,
                _ => ClusterState::UnknownError,
            },
            _ => ClusterState::UnknownError,
        },
        _ => ClusterState::UnknownError,
    }
}
