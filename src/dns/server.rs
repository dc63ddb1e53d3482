use crate::dns::handlers::handle_datagram;
use crate::error::Error;
use crate::zone::ZoneStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Largest datagram read from the socket.
const MAX_DATAGRAM: usize = 4096;

/// Pause after a failed receive, so a persistently failing socket doesn't spin.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Lifecycle phase of a [`Listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Running,
    Draining,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    dispatch: JoinHandle<()>,
}

/// The UDP side of the server: one socket, one dispatch loop, one task per query.
///
/// Every query resolves against the [`ZoneStore`]'s active snapshot as it stood when the query
/// was received. Replacing the zone doesn't involve the listener at all; it keeps its socket
/// and keeps serving.
pub struct Listener {
    bind_addr: SocketAddr,
    grace_period: Duration,
    zone: Arc<ZoneStore>,
    phase: watch::Sender<Phase>,
    running: Mutex<Option<Running>>,
    span: Span,
}

impl Listener {
    /// Create a stopped listener. Events are logged inside `span`.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        grace_period: Duration,
        zone: Arc<ZoneStore>,
        span: Span,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Stopped);
        Listener {
            bind_addr,
            grace_period,
            zone,
            phase,
            running: Mutex::new(None),
            span,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Follow the listener through its phases. The receiver starts at the current phase.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Bind the socket and start serving. Returns the bound address, which differs from the
    /// configured one when binding port 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the listener isn't stopped, and [`Error::Bind`] if
    /// the socket can't be bound. Binding is not retried.
    pub async fn start(&self) -> Result<SocketAddr, Error> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let socket = UdpSocket::bind(self.bind_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: self.bind_addr,
                source,
            })?;
        let local_addr = socket.local_addr()?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let dispatch = DispatchLoop {
            socket: Arc::new(socket),
            zone: Arc::clone(&self.zone),
            grace_period: self.grace_period,
            span: self.span.clone(),
        };
        let dispatch = tokio::spawn(dispatch.run(shutdown_rx).instrument(self.span.clone()));

        *running = Some(Running {
            local_addr,
            shutdown,
            dispatch,
        });
        self.phase.send_replace(Phase::Running);
        self.span
            .in_scope(|| info!(addr = %local_addr, "DNS listening on UDP"));
        Ok(local_addr)
    }

    /// Stop receiving, give in-flight queries up to the grace period to finish, and close the
    /// socket. The port can be bound again once this returns. Stopping a stopped listener does
    /// nothing.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(Running {
            local_addr,
            shutdown,
            dispatch,
        }) = running.take()
        else {
            self.span.in_scope(|| debug!("stop requested while already stopped"));
            return;
        };

        self.phase.send_replace(Phase::Draining);
        self.span
            .in_scope(|| info!(addr = %local_addr, "draining DNS listener"));
        // An Err means the loop already exited on its own; joining it below still applies.
        let _ = shutdown.send(());
        if let Err(err) = dispatch.await {
            self.span
                .in_scope(|| error!(error = %err, "DNS dispatch loop failed"));
        }
        self.phase.send_replace(Phase::Stopped);
        self.span
            .in_scope(|| info!(addr = %local_addr, "DNS listener stopped"));
    }
}

struct DispatchLoop {
    socket: Arc<UdpSocket>,
    zone: Arc<ZoneStore>,
    grace_period: Duration,
    span: Span,
}

impl DispatchLoop {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut handlers = JoinSet::new();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(err) = joined {
                        error!(error = %err, "query handler failed");
                    }
                }
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => {
                        let query = answer_query(
                            Arc::clone(&self.socket),
                            Arc::clone(&self.zone),
                            buf[..len].to_vec(),
                            peer,
                        );
                        handlers.spawn(query.instrument(self.span.clone()));
                    }
                    Err(err) => {
                        warn!(error = %err, "UDP receive failed");
                        time::sleep(RECV_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        self.drain(handlers).await;
        // The socket closes when its last handle goes: ours here, the handlers' in `drain`.
        drop(self.socket);
    }

    async fn drain(&self, mut handlers: JoinSet<()>) {
        let in_flight = handlers.len();
        if in_flight > 0 {
            debug!(in_flight, "waiting for in-flight queries");
        }
        let finished = time::timeout(self.grace_period, async {
            while handlers.join_next().await.is_some() {}
        })
        .await;
        if finished.is_err() {
            warn!(
                abandoned = handlers.len(),
                grace_period = ?self.grace_period,
                "query handlers exceeded the drain grace period; aborting"
            );
            handlers.abort_all();
            while handlers.join_next().await.is_some() {}
        }
    }
}

async fn answer_query(
    socket: Arc<UdpSocket>,
    zone: Arc<ZoneStore>,
    datagram: Vec<u8>,
    peer: SocketAddr,
) {
    // One snapshot per query, taken before resolution starts.
    let snapshot = zone.get();
    let Some(response) = handle_datagram(&datagram, &snapshot) else {
        return;
    };
    if let Err(err) = socket.send_to(&response, peer).await {
        debug!(%peer, error = %err, "failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::Snapshot;
    use std::time::Instant;

    const GRACE: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn drain_aborts_handlers_that_outlive_the_grace_period() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = socket.local_addr().unwrap();
        let dispatch = DispatchLoop {
            socket: Arc::clone(&socket),
            zone: Arc::new(ZoneStore::new(Snapshot::default(), Span::none())),
            grace_period: GRACE,
            span: Span::none(),
        };

        let mut handlers = JoinSet::new();
        let stuck = Arc::clone(&socket);
        handlers.spawn(async move {
            let _socket = stuck;
            std::future::pending::<()>().await;
        });
        handlers.spawn(async {});
        drop(socket);

        let started = Instant::now();
        dispatch.drain(handlers).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= GRACE, "returned after {elapsed:?}");
        assert!(elapsed < GRACE + Duration::from_secs(2), "returned after {elapsed:?}");

        // The aborted handler released its socket handle; dropping ours closes the socket.
        drop(dispatch);
        UdpSocket::bind(addr).await.expect("port released after drain");
    }

    #[tokio::test]
    async fn drain_returns_as_soon_as_handlers_finish() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let dispatch = DispatchLoop {
            socket,
            zone: Arc::new(ZoneStore::new(Snapshot::default(), Span::none())),
            grace_period: Duration::from_secs(30),
            span: Span::none(),
        };
        let mut handlers = JoinSet::new();
        handlers.spawn(time::sleep(Duration::from_millis(20)));

        time::timeout(Duration::from_secs(5), dispatch.drain(handlers))
            .await
            .expect("drain waited for the full grace period");
    }
}
