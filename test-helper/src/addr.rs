use std::net::{SocketAddr, TcpListener};

/// Gets a local address allocated by the OS which nothing is listening on.
///
/// Requests sent to this address will have their connection refused.
pub fn get_unused_addr() -> SocketAddr {
    let socket = TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}
