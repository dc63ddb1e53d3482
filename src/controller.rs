//! Lifecycle and zone updates.

use crate::config::Config;
use crate::dns::{Listener, Phase};
use crate::error::Error;
use crate::zone::{
    build_dns_challenge_zone, build_http_challenge_zone, parse_zone, Dns01Entry, Snapshot,
    ZoneStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info_span, warn, Span};

/// Owns the zone and the listener serving it.
///
/// Updates go through [`Controller::update_zone`]: the new zone text is parsed completely
/// before anything is published, and publishing is a single snapshot swap. The listener is
/// never stopped or rebound for an update.
pub struct Controller {
    zone: Arc<ZoneStore>,
    listener: Listener,
    span: Span,
}

impl Controller {
    /// Create a controller serving `initial` once started. `span` is the logging handle for
    /// the controller; the zone store and listener log in child spans of it.
    #[must_use]
    pub fn new(config: &Config, initial: Snapshot, span: Span) -> Self {
        let zone = Arc::new(ZoneStore::new(
            initial,
            info_span!(parent: &span, "zone"),
        ));
        let listener = Listener::new(
            config.dns_udp_bind_addr,
            config.drain_grace_period,
            Arc::clone(&zone),
            info_span!(parent: &span, "dns"),
        );
        Controller {
            zone,
            listener,
            span,
        }
    }

    /// Start answering queries for the zone installed at construction (or since replaced).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the DNS socket can't be bound, and [`Error::AlreadyRunning`]
    /// if the controller was already started.
    pub async fn start(&self) -> Result<SocketAddr, Error> {
        self.listener.start().await
    }

    /// Gracefully stop the listener. See [`Listener::stop`].
    pub async fn stop(&self) {
        self.listener.stop().await;
    }

    /// Replace the served zone with `zone_text`. All or nothing: if the text is invalid the
    /// error is returned and the previous zone stays active.
    ///
    /// # Errors
    ///
    /// See [`parse_zone`].
    pub fn update_zone(&self, zone_text: &str) -> Result<Arc<Snapshot>, Error> {
        let snapshot = parse_zone(zone_text).map_err(|err| {
            self.span
                .in_scope(|| warn!(error = %err, "rejected zone update"));
            err
        })?;
        Ok(self.zone.replace(snapshot))
    }

    /// Serve HTTP-01 challenges: point every domain in `domains` at `ip`.
    ///
    /// # Errors
    ///
    /// See [`build_http_challenge_zone`].
    pub fn update_http_challenge<D: AsRef<str>>(
        &self,
        domains: &[D],
        ip: &str,
    ) -> Result<Arc<Snapshot>, Error> {
        self.update_zone(&build_http_challenge_zone(domains, ip)?)
    }

    /// Serve DNS-01 challenges for `entries`.
    ///
    /// # Errors
    ///
    /// See [`build_dns_challenge_zone`].
    pub fn update_dns_challenge(&self, entries: &[Dns01Entry]) -> Result<Arc<Snapshot>, Error> {
        let pairs: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.domain.as_str(), e.token.as_str()))
            .collect();
        self.update_zone(&build_dns_challenge_zone(&pairs)?)
    }

    /// The active zone.
    #[must_use]
    pub fn zone(&self) -> Arc<Snapshot> {
        self.zone.get()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.listener.phase()
    }

    /// See [`Listener::subscribe`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.listener.subscribe()
    }

    /// The bound DNS address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    #[derive(Clone, Default)]
    struct InfoEvents(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for InfoEvents {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::INFO {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn controller(initial: &str) -> Controller {
        let config = Config {
            dns_udp_bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Config::default()
        };
        Controller::new(&config, parse_zone(initial).unwrap(), Span::none())
    }

    #[test]
    fn update_replaces_the_whole_zone() {
        let controller = controller("abc.com. 60 A 1.2.3.4\ntest.com. 60 A 1.2.3.4");
        let published = controller
            .update_dns_challenge(&[Dns01Entry {
                domain: "abc.com".to_string(),
                token: "TEST_TOKEN1".to_string(),
            }])
            .unwrap();
        assert_eq!(published.generation(), 2);
        assert_eq!(
            controller.zone().to_string(),
            "_acme-challenge.abc.com. 300 TXT \"TEST_TOKEN1\""
        );
    }

    #[test]
    fn invalid_update_leaves_the_zone_untouched() {
        let controller = controller("abc.com. 60 A 1.2.3.4");
        let before = controller.zone();

        let err = controller
            .update_zone("abc.com. 60 A 1.2.3.4\nbad line")
            .unwrap_err();
        assert!(err.is_validation());
        assert!(controller.update_http_challenge(&["abc.com"], "nope").is_err());
        assert!(controller.update_http_challenge(&[""], "1.2.3.4").is_err());

        assert!(Arc::ptr_eq(&before, &controller.zone()));
    }

    #[test]
    fn each_update_is_logged_once() {
        let controller = controller("abc.com. 60 A 1.2.3.4");
        let events = InfoEvents::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        tracing::subscriber::with_default(subscriber, || {
            controller.update_zone("test.com. 60 A 5.6.7.8").unwrap();
            assert!(controller.update_zone("bad line").is_err());
        });
        assert_eq!(events.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribers_follow_the_phases() {
        let controller = controller("abc.com. 60 A 1.2.3.4");
        let mut phases = controller.subscribe();
        assert_eq!(*phases.borrow_and_update(), Phase::Stopped);

        controller.start().await.unwrap();
        phases.changed().await.unwrap();
        assert_eq!(*phases.borrow_and_update(), Phase::Running);

        controller.stop().await;
        phases.changed().await.unwrap();
        assert_eq!(*phases.borrow_and_update(), Phase::Stopped);
    }

    #[tokio::test]
    async fn start_and_stop_walk_the_phases() {
        let controller = controller("abc.com. 60 A 1.2.3.4");
        assert_eq!(controller.phase(), Phase::Stopped);
        let addr = controller.start().await.unwrap();
        assert_eq!(controller.phase(), Phase::Running);
        assert_eq!(controller.local_addr().await, Some(addr));
        assert!(matches!(controller.start().await, Err(Error::AlreadyRunning)));

        controller.update_zone("test.com. 60 A 5.6.7.8").unwrap();
        assert_eq!(controller.phase(), Phase::Running);
        assert_eq!(controller.local_addr().await, Some(addr));

        controller.stop().await;
        assert_eq!(controller.phase(), Phase::Stopped);
        assert_eq!(controller.local_addr().await, None);
        // Stopping twice is harmless.
        controller.stop().await;
    }
}
