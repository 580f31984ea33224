pub mod helpers;
pub mod kubernetes;
pub mod openstack;
pub mod resources;

pub const RESOURCE_GROUP: &str = "ostack-vip.dev";

pub const CLUSTER_FINALIZER: &str = "ostack-vip.dev/vip-port";
