//! # Unchained
//!
//! HTTP resources on top of `unchained-core` serializers.
//!
//! A [`ResourceHandler`] owns a serializer factory and one view per verb.
//! Requests pass through [authentication](authentication) schemes and
//! [permissions](permissions) configured by a [`ViewConfig`], then have their
//! body decoded in the format named by `Content-Type` and their reply
//! encoded in the format named by `Accept`.
//!
//! ```ignore
//! let router = ResourceHandler::new(account_serializer)
//!     .with_view(ViewConfig::from_settings(&settings.server))
//!     .get(|_, serializer| async move { Ok(Reply::ok(serializer)) })
//!     .into_router("/accounts/:id");
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod authentication;
pub mod config;
pub mod error;
pub mod handler;
pub mod parsers;
pub mod permissions;
pub mod request;
pub mod telemetry;

pub use authentication::{
    AuthError, AuthFailure, Authentication, BasicAuthentication, MemorySessionStore,
    SessionAuthentication, SessionStore, TokenAuthentication, TokenProvider, UserProvider,
};
pub use config::{LoggingSettings, ServerSettings, Settings, SettingsError, ViewConfig};
pub use error::ApiError;
pub use handler::{Reply, ResourceHandler, Verb};
pub use permissions::{
    AllowAny, And, IsAdminUser, IsAuthenticated, IsAuthenticatedOrReadOnly, Or, Permission,
};
pub use request::{RequestContext, User, SAFE_METHODS};
pub use telemetry::init_tracing;
