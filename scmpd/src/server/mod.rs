//! Channel dispatch — the `russh::server::Handler` implementation that
//! enforces spec.md §4.1's admission rules and dispatches the five
//! known request types.

mod dispatch;

use std::collections::HashMap;
use std::sync::Arc;

use russh::keys::PublicKey;
use russh::server::{Auth, Handler, Msg, Server as RusshServer, Session};
use russh::{Channel, ChannelId, MethodSet};
use tracing::{info, warn};

use crate::config::ScmpdConfig;
use crate::keys::is_authorized_key;

const MAX_AUTH_TRIES: u8 = 2;

/// Only `sftp` is an allowed subsystem name (spec.md §3, §4.1).
fn is_supported_subsystem(name: &str) -> bool {
    name == "sftp"
}

/// Factory handed to `russh::server::run_stream` for one connection.
/// The agent drives the accept loop itself (see `main.rs`) rather than
/// using `Server::run_on_address`, so only `new_client` is exercised.
pub struct ScmpdServer {
    pub config: Arc<ScmpdConfig>,
}

impl RusshServer for ScmpdServer {
    type Handler = ScmpdHandler;

    fn new_client(&mut self, _peer_addr: Option<std::net::SocketAddr>) -> ScmpdHandler {
        ScmpdHandler {
            config: self.config.clone(),
            auth_tries: 0,
            authenticated_user: None,
            session_channel: None,
            channels: HashMap::new(),
            stdin_buffers: HashMap::new(),
        }
    }
}

/// Per-connection state (spec.md §3, "Connection state"). A fresh
/// instance is created per TCP connection and dropped at disconnect.
pub struct ScmpdHandler {
    config: Arc<ScmpdConfig>,
    auth_tries: u8,
    authenticated_user: Option<String>,
    session_channel: Option<ChannelId>,
    channels: HashMap<ChannelId, Channel<Msg>>,
    stdin_buffers: HashMap<ChannelId, Vec<u8>>,
}

impl Handler for ScmpdHandler {
    type Error = anyhow::Error;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        warn!(user, "rejecting auth-none, public key required");
        Ok(Auth::Reject {
            proceed_with_methods: Some(MethodSet::PUBLICKEY),
            partial_success: false,
        })
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        self.auth_tries += 1;
        if self.auth_tries > MAX_AUTH_TRIES {
            warn!(user, "exceeded maximum authentication attempts");
            return Ok(Auth::Reject {
                proceed_with_methods: None,
                partial_success: false,
            });
        }

        if user != self.config.ssh_server.authorized_user {
            warn!(user, "rejecting: not the authorized user");
            return Ok(Auth::Reject {
                proceed_with_methods: Some(MethodSet::PUBLICKEY),
                partial_success: false,
            });
        }

        if !is_authorized_key(public_key, &self.config.ssh_server.authorized_keys) {
            warn!(user, "rejecting: key not in AuthorizedKeys");
            return Ok(Auth::Reject {
                proceed_with_methods: Some(MethodSet::PUBLICKEY),
                partial_success: false,
            });
        }

        info!(user, "authenticated");
        self.authenticated_user = Some(user.to_string());
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.session_channel.is_some() {
            warn!("rejecting second session channel on this connection");
            return Ok(false);
        }
        let id = channel.id();
        self.session_channel = Some(id);
        self.channels.insert(id, channel);
        Ok(true)
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        _channel: Channel<Msg>,
        _host_to_connect: &str,
        _port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(false)
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.stdin_buffers
            .entry(channel)
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let stdin = self.stdin_buffers.remove(&channel).unwrap_or_default();
        match dispatch::handle_exec(&self.config, channel, data, stdin, session).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "channel handler failure, closing channel");
                session.close(channel)?;
                Ok(())
            }
        }
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !is_supported_subsystem(name) {
            warn!(name, "rejecting unsupported subsystem");
            session.channel_failure(channel)?;
            return Ok(());
        }
        let Some(chan) = self.channels.remove(&channel) else {
            session.channel_failure(channel)?;
            return Ok(());
        };
        session.channel_success(channel)?;
        dispatch::serve_sftp(chan).await;
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.stdin_buffers.remove(&channel);
        self.channels.remove(&channel);
        if self.session_channel == Some(channel) {
            self.session_channel = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sftp_is_the_only_supported_subsystem() {
        assert!(is_supported_subsystem("sftp"));
        assert!(!is_supported_subsystem("sftp2"));
        assert!(!is_supported_subsystem(""));
        assert!(!is_supported_subsystem("shell"));
    }
}
