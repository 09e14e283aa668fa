//! Account lifecycle, token validation, and session refresh core for a social-networking backend
//! backed by a managed identity provider.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod account;
pub mod api;
pub mod config;
pub mod follow;
pub mod metrics;
pub mod post;
pub mod provider;
pub mod security;
pub mod session;
pub mod signer;
pub mod store;
pub mod token;
pub mod validation;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}
#[cfg(test)] mod testing;

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	account::AccountService,
	api::Api,
	config::Config,
	error::{AuthFailure, Conflict, Error, FieldError, Result, ValidationErrors},
	follow::{FlagUpdate, FollowService},
	post::{LikeState, PostService},
	provider::{CognitoClient, IdentityProvider, ProviderError},
	session::{SessionOutcome, SessionPolicy},
	store::MemoryStore,
	token::{Claims, TokenVerifier},
};
