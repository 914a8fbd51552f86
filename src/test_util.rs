use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// A local address nothing is listening on.
///
/// The port is handed out by the OS and released again before returning.
pub fn next_addr() -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("failed to bind");
    listener.local_addr().expect("no local address")
}
