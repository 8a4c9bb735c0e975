//! Network attachment. The cellular modem (or any uplink) is managed by the host,
//! we only wait until the broker can be reached by name.
use log::{debug, info};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tokio::{net::lookup_host, time::sleep};

use crate::error::Error;

/// Waits until `host` resolves, polling at given interval.
/// Returns the first resolved address.
pub async fn wait_for_network(
    host: &str,
    port: u16,
    interval: std::time::Duration,
) -> SocketAddr {
    loop {
        match lookup_host((host, port)).await {
            Ok(mut addrs) => {
                if let Some(addr) = addrs.next() {
                    debug!("{} resolved to {}", host, addr);
                    return addr;
                }
                debug!("{}: no address", host);
            },
            Err(e) => {
                debug!("{}: {}", host, e);
            },
        }
        info!("waiting for network..");
        sleep(interval).await;
    }
}

/// Returns the local address used to reach `remote`.
/// Nothing is actually sent.
pub fn local_ip(remote: SocketAddr) -> Result<IpAddr, Error> {
    let bind = if remote.is_ipv4() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
    } else {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
    };

    let socket = UdpSocket::bind(bind)?;
    socket.connect(remote)?;
    Ok(socket.local_addr()?.ip())
}
