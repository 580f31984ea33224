use std::{process::exit, sync::Arc};

use kube::Client;
use ostack_vip_neutron::{NeutronClient, NeutronConfig};

mod controller;

#[tokio::main]
async fn main() {
    configure_logger();

    let networking = create_networking_client();
    let client = create_client().await;

    controller::main_controller(client, Arc::new(networking)).await;
}

async fn create_client() -> Client {
    match Client::try_default().await {
        Ok(client) => client,
        Err(error) => {
            log::error!("Couldn't create client! {error:?}");
            exit(6)
        }
    }
}

fn create_networking_client() -> NeutronClient {
    let config = match NeutronConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            log::error!("Couldn't retrieve the networking configuration! {error:?}");
            exit(7)
        }
    };

    match NeutronClient::new(config) {
        Ok(client) => client,
        Err(error) => {
            log::error!("Couldn't create the networking client! {error:?}");
            exit(8)
        }
    }
}

fn configure_logger() {
    env_logger::builder()
        .default_format()
        .format_module_path(false)
        .filter_level(log::LevelFilter::Info)
        .init()
}
