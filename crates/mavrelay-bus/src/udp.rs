use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, trace, warn};

use crate::error::{BusError, Result};
use crate::message::{decode_datagram, encode_datagram, BusMessage, MAX_DATAGRAM};
use crate::{Bus, BusSubscription};

/// Default multicast group shared by every process on the bus.
pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 76, 67);

/// Default bus port.
pub const DEFAULT_PORT: u16 = 7667;

/// UDP multicast bus settings.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    /// Multicast TTL. 0 keeps traffic on this host.
    pub ttl: u32,
    /// Local interface to send and join on.
    pub interface: Ipv4Addr,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP,
            port: DEFAULT_PORT,
            ttl: 0,
            interface: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl BusConfig {
    pub fn group_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.group, self.port))
    }
}

/// Bus over UDP multicast. Each subscription owns its own socket.
#[derive(Debug)]
pub struct UdpBus {
    config: BusConfig,
    sender: Socket,
}

impl UdpBus {
    pub fn new(config: BusConfig) -> Result<Self> {
        let join_err = |source| BusError::Join {
            addr: config.group_addr(),
            source,
        };
        let sender = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(join_err)?;
        sender.set_multicast_ttl_v4(config.ttl).map_err(join_err)?;
        sender.set_multicast_loop_v4(true).map_err(join_err)?;
        if !config.interface.is_unspecified() {
            sender
                .set_multicast_if_v4(&config.interface)
                .map_err(join_err)?;
        }
        debug!(group = %config.group_addr(), ttl = config.ttl, "udp bus ready");
        Ok(Self { config, sender })
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }
}

impl Bus for UdpBus {
    type Subscription = UdpSubscription;

    fn publish(&self, topic: &str, message: &BusMessage) -> Result<()> {
        let datagram = encode_datagram(topic, message)?;
        let sent = self
            .sender
            .send_to(&datagram, &self.config.group_addr().into())?;
        trace!(topic, bytes = sent, "published");
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<UdpSubscription> {
        let addr = self.config.group_addr();
        let join_err = |source| BusError::Join { addr, source };

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(join_err)?;
        socket.set_reuse_address(true).map_err(join_err)?;
        #[cfg(unix)]
        socket.set_reuse_port(true).map_err(join_err)?;
        let bind = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.config.port);
        socket.bind(&bind.into()).map_err(join_err)?;
        socket
            .join_multicast_v4(&self.config.group, &self.config.interface)
            .map_err(join_err)?;

        debug!(topic, group = %addr, "subscribed");
        Ok(UdpSubscription::new(socket.into(), topic))
    }
}

/// Subscription on a [`UdpBus`].
pub struct UdpSubscription {
    socket: UdpSocket,
    topic: String,
    buf: Vec<u8>,
}

impl UdpSubscription {
    fn new(socket: UdpSocket, topic: &str) -> Self {
        Self {
            socket,
            topic: topic.to_string(),
            buf: vec![0; MAX_DATAGRAM],
        }
    }

    fn recv_datagram(&mut self, timeout: Duration) -> Result<Option<usize>> {
        // A zero timeout would mean "block forever" to the socket.
        let timeout = timeout.max(Duration::from_millis(1));
        self.socket.set_read_timeout(Some(timeout))?;
        match self.socket.recv(&mut self.buf) {
            Ok(n) => Ok(Some(n)),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(BusError::Io(err)),
        }
    }
}

impl BusSubscription for UdpSubscription {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<BusMessage>> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let Some(len) = self.recv_datagram(remaining)? else {
                return Ok(None);
            };
            match decode_datagram(&self.buf[..len]) {
                Ok((topic, message)) if topic == self.topic => return Ok(Some(message)),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "discarding malformed bus datagram"),
            }
            if remaining.is_zero() {
                return Ok(None);
            }
        }
    }
}

impl std::fmt::Debug for UdpSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpSubscription")
            .field("topic", &self.topic)
            .finish()
    }
}
