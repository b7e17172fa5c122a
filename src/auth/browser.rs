//! Browser hand-off: send the user to the authorize URL and wait for the redirect.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use warp::path::FullPath;
use warp::Filter;

use super::error::AuthError;
use super::redirect::RedirectTarget;

const DEFAULT_WAIT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = "<!doctype html><html><head><title>Login complete</title></head>\
<body><h1>Login complete</h1><p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<!doctype html><html><head><title>Login failed</title></head>\
<body><h1>Login failed</h1><p>Return to the terminal for details.</p></body></html>";

/// Query parameters of the redirect request.
type CallbackQuery = BTreeMap<String, String>;
type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackQuery>>>>;

/// How an auth session in the browser ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserOutcome {
    /// The redirect arrived; `url` is the full redirect URL.
    Success { url: String },
    /// The user backed out explicitly.
    Cancel,
    /// The session was closed or timed out without a redirect.
    Dismiss,
}

/// Opens an authorize URL and reports the redirect back.
#[async_trait]
pub trait AuthBrowser: Send + Sync {
    async fn open_auth_session(
        &self,
        authorize_url: &str,
        redirect_uri: &str,
    ) -> Result<BrowserOutcome, AuthError>;
}

/// Receives the redirect on a local `127.0.0.1` HTTP server.
///
/// The server starts in [`bind`](Self::bind) and stops once the redirect has
/// arrived, the wait has timed out, or the browser is dropped.
///
/// # Example
/// ```no_run
/// use discord_auth::auth::browser::LoopbackBrowser;
/// use discord_auth::auth::redirect::RedirectTarget;
///
/// # async fn example() -> Result<(), discord_auth::auth::AuthError> {
/// let browser = LoopbackBrowser::bind(&RedirectTarget::loopback(0)).await?;
/// println!("register this redirect URI: {}", browser.redirect_uri());
/// # Ok(())
/// # }
/// ```
pub struct LoopbackBrowser {
    port: u16,
    path: String,
    wait: Duration,
    open_browser: bool,
    redirect: Mutex<Option<oneshot::Receiver<CallbackQuery>>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl LoopbackBrowser {
    /// Start the redirect server for a loopback target. Port `0` picks a free port.
    pub async fn bind(target: &RedirectTarget) -> Result<Self, AuthError> {
        let RedirectTarget::Loopback { port, path } = target else {
            return Err(AuthError::Unsupported(format!(
                "loopback listener needs a loopback redirect, got {target}"
            )));
        };
        let path = if path.starts_with('/') {
            path.clone()
        } else {
            format!("/{path}")
        };

        let (redirect_tx, redirect_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let routes = callback_route(path.clone(), Arc::new(Mutex::new(Some(redirect_tx))));

        let requested = SocketAddr::from(([127, 0, 0, 1], *port));
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(requested, async move {
                shutdown_rx.await.ok();
            })
            .map_err(|err| {
                AuthError::Io(format!("failed to start redirect listener on {requested}: {err}"))
            })?;
        tokio::spawn(server);
        tracing::debug!(%addr, %path, "redirect listener started");

        Ok(Self {
            port: addr.port(),
            path,
            wait: DEFAULT_WAIT,
            open_browser: true,
            redirect: Mutex::new(Some(redirect_rx)),
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }

    pub fn with_timeout(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// When disabled the URL is only logged; the caller shows it to the user.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        RedirectTarget::Loopback {
            port: self.port,
            path: self.path.clone(),
        }
        .uri()
    }

    /// Rebuild the URL the browser was redirected to.
    fn redirect_url(&self, query: &CallbackQuery) -> String {
        let mut url = self.redirect_uri();
        if !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            url.push('?');
            url.push_str(&encoded);
        }
        url
    }

    fn stop(&self) {
        let sender = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            tracing::debug!(port = self.port, "stopping redirect listener");
            let _ = sender.send(());
        }
    }
}

impl Drop for LoopbackBrowser {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
impl AuthBrowser for LoopbackBrowser {
    async fn open_auth_session(
        &self,
        authorize_url: &str,
        redirect_uri: &str,
    ) -> Result<BrowserOutcome, AuthError> {
        let receiver = self
            .redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| {
                AuthError::Unsupported("loopback listener already served a login".to_string())
            })?;

        if redirect_uri != self.redirect_uri() {
            tracing::warn!(
                expected = %self.redirect_uri(),
                got = %redirect_uri,
                "redirect uri does not match the loopback listener"
            );
        }
        if self.open_browser {
            if let Err(err) = webbrowser::open(authorize_url) {
                tracing::warn!(error = %err, "failed to open the system browser");
            }
        }

        let received = tokio::time::timeout(self.wait, receiver).await;
        self.stop();
        match received {
            Ok(Ok(query)) => Ok(BrowserOutcome::Success {
                url: self.redirect_url(&query),
            }),
            Ok(Err(_)) => Err(AuthError::Io(
                "redirect listener stopped before the redirect arrived".to_string(),
            )),
            Err(_) => {
                tracing::info!(
                    wait_secs = self.wait.as_secs(),
                    "no redirect received before timeout"
                );
                Ok(BrowserOutcome::Dismiss)
            }
        }
    }
}

/// `GET {path}` hands its query to `sender` once; anything else is a 404.
fn callback_route(
    path: String,
    sender: CallbackSender,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone + Send + Sync + 'static
{
    warp::get()
        .and(warp::path::full())
        .and(warp::query::<CallbackQuery>())
        .and(warp::any().map(move || (path.clone(), sender.clone())))
        .and_then(
            |full: FullPath, query: CallbackQuery, (path, sender): (String, CallbackSender)| async move {
                if full.as_str() != path {
                    return Err(warp::reject::not_found());
                }
                let page = if query.contains_key("error") {
                    FAILURE_PAGE
                } else {
                    SUCCESS_PAGE
                };
                let pending = sender
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                match pending {
                    Some(tx) => {
                        let _ = tx.send(query);
                    }
                    None => tracing::debug!("redirect already received, ignoring repeat"),
                }
                Ok(warp::reply::html(page))
            },
        )
}
