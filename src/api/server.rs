use crate::api::routes;
use crate::config::SharedConfig;
use crate::controller::Controller;
use crate::error::Error;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub controller: Arc<Controller>,
}

impl AppState {
    /// Reject zone changes from clients outside the configured ACL.
    pub(super) fn authorize(&self, client_addr: SocketAddr) -> Result<IpAddr, Error> {
        let client_ip = client_addr.ip();
        if !self.config.update_permitted(client_ip) {
            tracing::debug!("rejected update from {client_ip}");
            return Err(Error::AuthForbidden(client_ip));
        }
        Ok(client_ip)
    }
}

/// Bind the HTTP API and return the future serving it.
///
/// # Errors
///
/// Returns an error if [`Config::api_bind_addr`][crate::config::Config::api_bind_addr] can't
/// be bound.
pub fn new(
    config: SharedConfig,
    controller: Arc<Controller>,
) -> hyper::Result<impl Future<Output = hyper::Result<()>>> {
    let server = axum::Server::try_bind(&config.api_bind_addr)?;
    Ok(server.serve(
        routes::new(AppState { config, controller })
            .into_make_service_with_connect_info::<SocketAddr>(),
    ))
}
