//! # Weblounge Client
//!
//! [`HttpGateway`] implements the editor's repository traits on top of the
//! Weblounge REST API. [`ClientConfig`] is read from
//! `weblounge.config.json` in the working directory.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use weblounge_client::{ClientConfig, HttpGateway};
//! use weblounge_common::User;
//! use weblounge_editor::{EditSession, PageKey};
//!
//! let config = ClientConfig::load(".")?;
//! let gateway = Arc::new(HttpGateway::new(&config)?);
//! let user = config.user().unwrap_or_else(|| User::new("admin"));
//! let session = EditSession::open(gateway, user, &PageKey::path("/"), config.session_options()).await?;
//! ```

pub mod config;
pub mod endpoints;
pub mod http;

pub use config::{ClientConfig, UserConfig, DEFAULT_CONFIG_NAME};
pub use endpoints::Endpoints;
pub use http::HttpGateway;
