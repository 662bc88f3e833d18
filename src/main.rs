use bytes::Bytes;
use clap::Parser;
use dhcp_exchange::{cancellation, v4, Args, Client, Exchange, Xid};
use std::error::Error as StdError;
use tokio::fs;
use tracing_subscriber::EnvFilter;

/// Reads the hardware (MAC) address of `interface` from sysfs.
async fn read_mac_address(interface: &str) -> Result<Bytes, Box<dyn StdError>> {
    let mac_path = format!("/sys/class/net/{}/address", interface);
    let mac_str = fs::read_to_string(&mac_path).await?;
    Ok(v4::parse_mac_address(mac_str.trim())?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn StdError>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mac_addr = match &args.mac {
        Some(mac) => v4::parse_mac_address(mac)?,
        None => read_mac_address(&args.interface).await?,
    };

    let client = Client::bind(args.client_config())?;

    let xid = Xid::random();
    let discover = v4::build_discover(&mac_addr, xid);
    tracing::info!(
        xid = %xid,
        "Broadcasting DHCP Discover to {:?}",
        client.destinations()
    );

    let (handle, cancel) = cancellation();
    let Exchange {
        completion,
        mut responses,
        errors,
    } = client.simple_send_and_read(cancel, client.destinations(), &discover)?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received SIGINT, cancelling exchange");
            handle.cancel();
        }
    });

    let mut offers = 0;
    while let Some(response) = responses.recv().await {
        match v4::message_type(&response.packet) {
            Some(kind @ dhcproto::v4::MessageType::Offer) => {
                offers += 1;
                tracing::info!(
                    source = %response.source,
                    server = ?v4::server_identifier(&response.packet),
                    "Received {:?}, offered IP: {}",
                    kind,
                    response.packet.yiaddr()
                );
            }
            other => {
                tracing::debug!(source = %response.source, "Ignoring {:?} reply", other);
            }
        }
    }

    completion.wait().await;
    if let Ok(err) = errors.await {
        tracing::error!("Exchange failed: {}", err);
        return Err(err.into());
    }

    tracing::info!("Exchange finished with {} offer(s)", offers);
    Ok(())
}
