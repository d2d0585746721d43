//! Local HTTP listener for the authorization redirect.
//!
//! Requests without a `code` or `error` parameter (the browser warming up the
//! redirect URI, favicon fetches) get a waiting page and are otherwise ignored.
//! The first request carrying either parameter is handed to the caller via
//! [`CallbackServer::next_callback`]; the HTTP response stays open until the
//! caller answers it with [`PendingCallback::respond`].
//!
//! The listener binds the IPv4 loopback and, when available, the IPv6 loopback
//! on the same port, so `http://localhost:{port}` works whichever address the
//! browser resolves first.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use {
    axum::{
        Router,
        extract::{RawQuery, State},
        http::StatusCode,
        response::{Html, IntoResponse, Response},
    },
    tokio::{
        net::TcpListener,
        sync::{mpsc, oneshot, watch},
        task::JoinHandle,
    },
    tracing::{debug, warn},
    url::form_urlencoded,
};

use crate::{error::OAuthError, pages, types::AuthorizationResult};

#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    /// Lenient query parsing: undecodable escapes pass through as-is and the
    /// first occurrence of a repeated key wins.
    fn from_query(raw: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            let slot = match &*key {
                "code" => &mut params.code,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// `error` wins over `code`; empty values count as absent.
    fn into_result(self) -> Option<AuthorizationResult> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Some(AuthorizationResult::Denied {
                error,
                description: self.error_description.filter(|d| !d.is_empty()),
            });
        }
        self.code
            .filter(|c| !c.is_empty())
            .map(AuthorizationResult::Code)
    }
}

struct CallbackReply {
    status: StatusCode,
    body: String,
}

/// A decisive redirect whose HTTP response is still outstanding.
pub struct PendingCallback {
    result: AuthorizationResult,
    reply: oneshot::Sender<CallbackReply>,
}

impl PendingCallback {
    pub fn result(&self) -> &AuthorizationResult {
        &self.result
    }

    /// Send the HTML response back to the browser.
    pub fn respond(self, status: StatusCode, body: String) {
        if self.reply.send(CallbackReply { status, body }).is_err() {
            debug!("browser went away before the callback response was sent");
        }
    }
}

pub struct CallbackServer {
    local_addrs: Vec<SocketAddr>,
    callbacks: mpsc::Receiver<PendingCallback>,
    shutdown: watch::Sender<()>,
    tasks: Vec<JoinHandle<std::io::Result<()>>>,
}

impl CallbackServer {
    /// Bind on `127.0.0.1:{port}` and, if possible, `[::1]` on the same port.
    /// Port 0 picks a free port.
    pub async fn bind(port: u16) -> Result<Self, OAuthError> {
        let v4 = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
            .await
            .map_err(|source| OAuthError::Bind { port, source })?;
        let v4_addr = v4
            .local_addr()
            .map_err(|source| OAuthError::Bind { port, source })?;

        let mut listeners = vec![(v4, v4_addr)];
        match TcpListener::bind(SocketAddr::from((Ipv6Addr::LOCALHOST, v4_addr.port()))).await {
            Ok(v6) => match v6.local_addr() {
                Ok(addr) => listeners.push((v6, addr)),
                Err(e) => debug!(error = %e, "ipv6 loopback listener has no address"),
            },
            Err(e) => debug!(error = %e, "ipv6 loopback unavailable, listening on ipv4 only"),
        }

        let (tx, callbacks) = mpsc::channel(8);
        let (shutdown, shutdown_rx) = watch::channel(());
        let app = Router::new().fallback(handle_callback).with_state(tx);

        let mut local_addrs = Vec::with_capacity(listeners.len());
        let mut tasks = Vec::with_capacity(listeners.len());
        for (listener, addr) in listeners {
            tasks.push(serve(listener, app.clone(), shutdown_rx.clone()));
            local_addrs.push(addr);
        }

        debug!(addrs = ?local_addrs, "callback listener started");

        Ok(Self {
            local_addrs,
            callbacks,
            shutdown,
            tasks,
        })
    }

    /// The IPv4 loopback address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addrs[0]
    }

    /// Every address the listener accepts on.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Wait for the next request carrying a `code` or `error` parameter.
    pub async fn next_callback(&mut self) -> Result<PendingCallback, OAuthError> {
        self.callbacks.recv().await.ok_or(OAuthError::CallbackClosed)
    }

    /// Stop accepting callbacks and wait for in-flight responses to flush.
    pub async fn shutdown(self) {
        let Self {
            callbacks,
            shutdown,
            tasks,
            ..
        } = self;
        // Dropping the receiver answers any queued callbacks with the closed page.
        drop(callbacks);
        let _ = shutdown.send(());
        for task in tasks {
            match task.await {
                Ok(Ok(())) => debug!("callback listener stopped"),
                Ok(Err(e)) => warn!(error = %e, "callback listener exited with error"),
                Err(e) => warn!(error = %e, "callback listener task failed"),
            }
        }
    }
}

fn serve(
    listener: TcpListener,
    app: Router,
    mut shutdown: watch::Receiver<()>,
) -> JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
    })
}

async fn handle_callback(
    State(tx): State<mpsc::Sender<PendingCallback>>,
    RawQuery(query): RawQuery,
) -> Response {
    let Some(result) = CallbackParams::from_query(query.as_deref()).into_result() else {
        return Html(pages::waiting()).into_response();
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    let pending = PendingCallback {
        result,
        reply: reply_tx,
    };
    if tx.send(pending).await.is_err() {
        return Html(pages::closed()).into_response();
    }

    match reply_rx.await {
        Ok(reply) => (reply.status, Html(reply.body)).into_response(),
        Err(_) => Html(pages::closed()).into_response(),
    }
}
