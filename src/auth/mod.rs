//! Discord OAuth authorization-code flows and session storage.

pub mod backend;
pub mod browser;
pub mod discord;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod redirect;
pub mod service;
pub mod store;
pub mod token;

pub use browser::{AuthBrowser, BrowserOutcome, LoopbackBrowser};
pub use error::AuthError;
pub use flow::{AuthFlow, Authorized, AuthorizationRequest, FlowKind};
pub use redirect::{CallbackParams, RedirectTarget};
pub use service::{AuthService, AuthState, LoginOutcome};
pub use store::{FileSessionStore, SessionStore, SessionStoreConfig, StoredSession};
pub use token::Token;
