use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, UdpSocket};

/// Pending TCP connections queued by the kernel
const LISTEN_BACKLOG: i32 = 128;

fn socket(addr: SocketAddr, ty: Type, protocol: Protocol) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), ty, Some(protocol))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;

    // v4 and v6 listeners on the same port must not collide
    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }

    let sock_addr: SockAddr = addr.into();
    socket.bind(&sock_addr)?;
    Ok(socket)
}

/// Non-blocking UDP socket bound to `addr`, ready for `tokio::net::UdpSocket::from_std`
pub fn bind_udp(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = socket(addr, Type::DGRAM, Protocol::UDP)?;
    Ok(socket.into())
}

/// Non-blocking listening TCP socket bound to `addr`
pub fn bind_tcp(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = socket(addr, Type::STREAM, Protocol::TCP)?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ephemeral_v4_sockets() {
        let any_port = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
        let udp = bind_udp(any_port).unwrap();
        let tcp = bind_tcp(any_port).unwrap();
        assert_ne!(udp.local_addr().unwrap().port(), 0);
        assert!(tcp.local_addr().unwrap().is_ipv4());
    }

    #[test]
    fn v6_is_v6_only() {
        let any_port = SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 0);
        // hosts without IPv6 loopback cannot run this
        if let Ok(udp) = bind_udp(any_port) {
            let socket = Socket::from(udp);
            assert!(socket.only_v6().unwrap());
        }
    }
}
