//! Identity provider contract and error classification.
//!
//! [`IdentityProvider`] is the seam between the account core and the managed identity service.
//! Implementations classify every failure into [`ProviderError`] before returning, so callers
//! never inspect raw provider error codes. No implementation retries internally.

pub mod client;

// std
use std::future::Future;
// crates.io
use aws_sdk_cognitoidentityprovider::{
	config::http::HttpResponse,
	error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
// self
use crate::{
	_prelude::*,
	error::{AuthFailure, Conflict},
	security::Secret,
};

pub use client::CognitoClient;

/// Result type returned at the provider boundary.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Sign-up payload accepted from clients.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignUpData {
	/// Email address, also the provider-side login name.
	pub email: String,
	/// Plain-text password, forwarded to the provider only.
	pub password: Secret,
	/// Public handle.
	pub username: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
}

/// Email and password pair used for password authentication.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
	/// Email address.
	pub email: String,
	/// Plain-text password.
	pub password: Secret,
}

/// Tokens issued by a successful password authentication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
	/// Signed JWT access token.
	pub access_token: String,
	/// Opaque refresh token.
	pub refresh_token: String,
	/// Access-token lifetime in seconds.
	pub expires_in: u64,
	/// Token type, normally `Bearer`.
	pub token_type: String,
}

/// Tokens issued by a refresh-token exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshedTokens {
	/// Newly minted access token.
	pub access_token: String,
	/// Access-token lifetime in seconds.
	pub expires_in: u64,
	/// Token type, normally `Bearer`.
	pub token_type: String,
}

/// Provider-side view of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderUser {
	/// Provider-assigned identifier.
	pub external_id: String,
	/// `email` attribute, when present.
	pub email: Option<String>,
	/// `preferred_username` attribute, when present.
	pub username: Option<String>,
	/// Whether the account is enabled.
	pub enabled: bool,
	/// Provider account status, e.g. `CONFIRMED`.
	pub status: Option<String>,
}

/// Operations the account core needs from the managed identity provider.
pub trait IdentityProvider: Send + Sync {
	/// Register a new account and return the provider-issued identifier.
	fn sign_up(&self, data: &SignUpData) -> impl Future<Output = ProviderResult<String>> + Send;

	/// Permanently delete an account.
	fn delete_user(&self, external_id: &str) -> impl Future<Output = ProviderResult<()>> + Send;

	/// Add an account to a group.
	fn add_user_to_group(
		&self,
		external_id: &str,
		group: &str,
	) -> impl Future<Output = ProviderResult<()>> + Send;

	/// Confirm an account without the email-confirmation round trip.
	fn confirm_user(&self, external_id: &str) -> impl Future<Output = ProviderResult<()>> + Send;

	/// Exchange an email and password for session tokens.
	fn authenticate(
		&self,
		credentials: &Credentials,
	) -> impl Future<Output = ProviderResult<AuthTokens>> + Send;

	/// Mint a new access token from a refresh token.
	///
	/// `username_claim` is the `username` claim of the expiring access token; the secret hash is
	/// computed over it.
	fn refresh(
		&self,
		refresh_token: &str,
		username_claim: &str,
	) -> impl Future<Output = ProviderResult<RefreshedTokens>> + Send;

	/// Invalidate every session issued for the token's account.
	///
	/// The provider rejects expired access tokens here; use [`IdentityProvider::admin_sign_out`]
	/// when only the account identifier is trustworthy.
	fn sign_out(&self, access_token: &str) -> impl Future<Output = ProviderResult<()>> + Send;

	/// Invalidate every session of an account by its identifier, with administrative credentials.
	fn admin_sign_out(&self, external_id: &str) -> impl Future<Output = ProviderResult<()>> + Send;

	/// Look up one account by attribute value.
	fn find_user(
		&self,
		attribute: &str,
		value: &str,
	) -> impl Future<Output = ProviderResult<Option<ProviderUser>>> + Send;
}

/// Classified provider failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
	/// Password or parameter rejected by provider policy.
	#[error("Invalid credentials format: {message}")]
	InvalidCredentialsFormat {
		/// Provider explanation, safe to show to the user.
		message: String,
	},
	/// Account with the same login already exists.
	#[error("Account already exists.")]
	DuplicateAccount,
	/// Account does not exist.
	#[error("Account not found.")]
	AccountNotFound,
	/// Credentials or token rejected.
	#[error("Not authorized.")]
	NotAuthorized,
	/// Network failure, timeout, throttling, or a 5xx response; safe to retry.
	#[error("Transient provider failure: {0}")]
	Transient(String),
	/// Anything the classifier does not recognise.
	#[error("Unexpected provider error {code}: {message}")]
	Unexpected {
		/// Unqualified provider error code.
		code: String,
		/// Provider message, for logs only.
		message: String,
	},
}
impl ProviderError {
	/// Classify a provider error response.
	///
	/// `code` may be fully qualified (`com.amazonaws...#UsernameExistsException`).
	pub fn classify(status: StatusCode, code: &str, message: &str) -> Self {
		let code = code.rsplit('#').next().unwrap_or(code);

		match code {
			"InvalidPasswordException" | "InvalidParameterException" =>
				Self::InvalidCredentialsFormat { message: message.to_owned() },
			"UsernameExistsException" | "AliasExistsException" => Self::DuplicateAccount,
			"UserNotFoundException" | "ResourceNotFoundException" => Self::AccountNotFound,
			"NotAuthorizedException"
			| "UserNotConfirmedException"
			| "PasswordResetRequiredException" => Self::NotAuthorized,
			"InternalErrorException" | "TooManyRequestsException" | "LimitExceededException" =>
				Self::Transient(code.to_owned()),
			_ if status.is_server_error() => Self::Transient(format!("{status} {code}")),
			_ => Self::Unexpected { code: code.to_owned(), message: message.to_owned() },
		}
	}

	/// Classify a failed SDK call.
	///
	/// Timeouts and dispatch failures are transient. Service errors go through
	/// [`ProviderError::classify`] with the response status and the modeled error code.
	pub fn from_sdk<E>(err: &SdkError<E, HttpResponse>) -> Self
	where
		E: ProvideErrorMetadata + std::error::Error + 'static,
	{
		match err {
			SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) =>
				Self::Transient(DisplayErrorContext(err).to_string()),
			SdkError::ServiceError(context) => {
				let status = StatusCode::from_u16(context.raw().status().as_u16())
					.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
				let source = context.err();

				Self::classify(
					status,
					source.code().unwrap_or_default(),
					source.message().unwrap_or_default(),
				)
			},
			SdkError::ResponseError(context) if context.raw().status().is_server_error() =>
				Self::Transient(DisplayErrorContext(err).to_string()),
			_ => Self::Unexpected { code: "Sdk".into(), message: DisplayErrorContext(err).to_string() },
		}
	}

	/// Whether the failure is worth retrying by the caller.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transient(_))
	}
}
impl From<ProviderError> for Error {
	fn from(value: ProviderError) -> Self {
		match value {
			ProviderError::InvalidCredentialsFormat { message } =>
				Error::validation("password", message),
			ProviderError::DuplicateAccount => Error::Conflict(Conflict::EmailTaken),
			ProviderError::AccountNotFound =>
				Error::NotFound { resource: "account", id: String::new() },
			ProviderError::NotAuthorized => Error::Authentication(AuthFailure::InvalidCredentials),
			ProviderError::Transient(reason) => Error::TransientProvider(reason),
			ProviderError::Unexpected { code, .. } => Error::UnexpectedProvider(code),
		}
	}
}
