//! Per-request session refresh policy.
//!
//! Cookies are read before the handler runs and the outgoing response is adjusted afterwards:
//!
//! | access  | refresh | decision                                                         |
//! |---------|---------|------------------------------------------------------------------|
//! | absent  | any     | untouched                                                        |
//! | valid   | any     | untouched                                                        |
//! | expired | absent  | access cookie cleared                                            |
//! | expired | present | refreshed; on failure both cleared and the session is signed out |
//! | invalid | any     | every present session cookie cleared                             |
//!
//! A key set that cannot be fetched leaves the cookies alone. Because the policy runs after the
//! handler, a request served at the moment of expiry may still see the stale token.

pub mod cookie;

// std
use std::future::Future;
// crates.io
use http::{HeaderMap, Request, Response};
// self
use crate::{
	_prelude::*,
	error::AuthFailure,
	metrics,
	provider::IdentityProvider,
	session::cookie::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
	token::{TokenError, TokenVerifier},
};

/// Session cookies captured from an inbound request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionCookies {
	/// Access token, if presented.
	pub access_token: Option<String>,
	/// Refresh token, if presented.
	pub refresh_token: Option<String>,
}

/// What the policy did to the response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
	/// Cookies left as the handler emitted them.
	Untouched,
	/// Stale or invalid session cookies were cleared.
	LoggedOut,
	/// A new access token was issued.
	Refreshed,
}

/// Refreshes expired access tokens on the way out of every request.
#[derive(Debug)]
pub struct SessionPolicy<P> {
	provider: Arc<P>,
	verifier: Arc<TokenVerifier>,
}
impl<P> SessionPolicy<P>
where
	P: IdentityProvider,
{
	/// Create a policy.
	pub fn new(provider: Arc<P>, verifier: Arc<TokenVerifier>) -> Self {
		Self { provider, verifier }
	}

	/// Capture session cookies from request headers.
	pub fn inspect(headers: &HeaderMap) -> SessionCookies {
		SessionCookies {
			access_token: cookie::parse_cookie(headers, ACCESS_TOKEN_COOKIE),
			refresh_token: cookie::parse_cookie(headers, REFRESH_TOKEN_COOKIE),
		}
	}

	/// Adjust the handler's response according to the captured cookies.
	///
	/// Returns [`AuthFailure::SessionExpired`] after clearing both cookies when a refresh is
	/// rejected; the response then carries the deletions.
	pub async fn apply<B>(
		&self,
		cookies: &SessionCookies,
		response: &mut Response<B>,
	) -> Result<SessionOutcome> {
		let Some(access_token) = cookies.access_token.as_deref() else {
			return Ok(SessionOutcome::Untouched);
		};
		let headers = response.headers_mut();
		let inspected = match self.verifier.inspect(access_token).await {
			Ok(inspected) => inspected,
			Err(TokenError::KeySetUnavailable(reason)) => {
				tracing::warn!(%reason, "key set unavailable, session left untouched");
				metrics::record_session_refresh("jwks_unavailable");

				return Ok(SessionOutcome::Untouched);
			},
			Err(e) => {
				tracing::debug!(reason = %e, "invalid access token, clearing session cookies");
				cookie::delete_cookie(headers, ACCESS_TOKEN_COOKIE)?;

				if cookies.refresh_token.is_some() {
					cookie::delete_cookie(headers, REFRESH_TOKEN_COOKIE)?;
				}

				metrics::record_session_refresh("invalid");

				return Ok(SessionOutcome::LoggedOut);
			},
		};

		if !inspected.expired {
			return Ok(SessionOutcome::Untouched);
		}

		let Some(refresh_token) = cookies.refresh_token.as_deref() else {
			cookie::delete_cookie(headers, ACCESS_TOKEN_COOKIE)?;
			metrics::record_session_refresh("expired");

			return Ok(SessionOutcome::LoggedOut);
		};

		match self.provider.refresh(refresh_token, &inspected.claims.username).await {
			Ok(tokens) => {
				cookie::set_cookie(
					headers,
					ACCESS_TOKEN_COOKIE,
					&tokens.access_token,
					Duration::from_secs(tokens.expires_in),
				)?;
				cookie::delete_cookie(headers, REFRESH_TOKEN_COOKIE)?;
				tracing::info!(user = %inspected.claims.username, "access token refreshed");
				metrics::record_session_refresh("refreshed");

				Ok(SessionOutcome::Refreshed)
			},
			Err(e) => {
				tracing::warn!(
					user = %inspected.claims.username,
					error = %e,
					"access token refresh failed, signing out"
				);
				cookie::clear_session(headers)?;

				// The access token is expired here, so sign out by account instead.
				if let Err(e) = self.provider.admin_sign_out(&inspected.claims.username).await {
					tracing::debug!(error = %e, "best-effort sign-out failed");
				}

				metrics::record_session_refresh("failed");

				Err(AuthFailure::SessionExpired.into())
			},
		}
	}

	/// Run `handler` with the policy around it.
	///
	/// On [`AuthFailure::SessionExpired`] the handler's response is discarded; callers render
	/// the error with [`cookie::clear_session`] applied.
	pub async fn wrap<B, R, F, Fut>(&self, request: Request<B>, handler: F) -> Result<Response<R>>
	where
		F: FnOnce(Request<B>) -> Fut,
		Fut: Future<Output = Response<R>>,
	{
		let cookies = Self::inspect(request.headers());
		let mut response = handler(request).await;

		self.apply(&cookies, &mut response).await?;

		Ok(response)
	}
}
