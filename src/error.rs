//! Crate-wide error taxonomy and `Result` alias.

// std
use std::{
	collections::BTreeMap,
	fmt::{Display, Formatter, Result as FmtResult},
};
// crates.io
use http::StatusCode;
use serde::Serialize;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the accounts crate.
///
/// Provider and token failures are classified before they are turned into this type, so nothing
/// above the provider boundary ever sees a raw provider error code.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] http::Error),
	#[error(transparent)]
	Jsonwebtoken(#[from] jsonwebtoken::errors::Error),
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error("Authentication failed: {0}")]
	Authentication(AuthFailure),
	#[error("Configuration error for {field}: {reason}")]
	Config { field: &'static str, reason: String },
	#[error("Conflict: {0}")]
	Conflict(Conflict),
	#[error("Forbidden: {0}")]
	Forbidden(String),
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("{resource} '{id}' not found.")]
	NotFound { resource: &'static str, id: String },
	#[error("Store error: {0}")]
	Store(String),
	#[error("Identity provider is temporarily unavailable: {0}")]
	TransientProvider(String),
	#[error("Identity provider returned an unexpected error: {0}")]
	UnexpectedProvider(String),
	#[error("Validation failed: {0}")]
	Validation(ValidationErrors),
}
impl Error {
	/// Build a validation error carrying a single field entry.
	pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
		let mut errors = ValidationErrors::new();

		errors.push(FieldError::new(field, message));

		Self::Validation(errors)
	}

	/// HTTP status the error maps to at the request surface.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::Validation(_) => StatusCode::BAD_REQUEST,
			Self::Conflict(_) => StatusCode::CONFLICT,
			Self::Authentication(_) => StatusCode::UNAUTHORIZED,
			Self::Forbidden(_) => StatusCode::FORBIDDEN,
			Self::NotFound { .. } => StatusCode::NOT_FOUND,
			Self::TransientProvider(_) => StatusCode::SERVICE_UNAVAILABLE,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Whether the caller may safely retry the same operation.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::TransientProvider(_))
	}

	/// Message that is safe to return to clients.
	///
	/// Provider and internal details stay in the logs.
	pub fn public_message(&self) -> String {
		match self {
			Self::Validation(_) => "Validation failed.".into(),
			Self::Conflict(conflict) => conflict.to_string(),
			Self::Authentication(failure) => failure.to_string(),
			Self::Forbidden(reason) => reason.clone(),
			Self::NotFound { .. } => self.to_string(),
			Self::TransientProvider(_) => "Service temporarily unavailable, please retry.".into(),
			_ => "Internal server error.".into(),
		}
	}
}
impl From<Conflict> for Error {
	fn from(value: Conflict) -> Self {
		Self::Conflict(value)
	}
}
impl From<AuthFailure> for Error {
	fn from(value: AuthFailure) -> Self {
		Self::Authentication(value)
	}
}
impl From<ValidationErrors> for Error {
	fn from(value: ValidationErrors) -> Self {
		Self::Validation(value)
	}
}

/// Uniqueness and relationship-state conflicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conflict {
	/// Username already belongs to another account.
	UsernameTaken,
	/// Email address already belongs to another account.
	EmailTaken,
	/// Follow edge already exists.
	AlreadyFollowing,
	/// Unfollow requested without an existing edge.
	NotFollowing,
	/// Flag update requested without an existing edge.
	RelationshipNotFound,
}
impl Display for Conflict {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		let message = match self {
			Self::UsernameTaken => "Username is already in use.",
			Self::EmailTaken =>
				"This email address is already associated with an existing account.",
			Self::AlreadyFollowing => "Already following this user.",
			Self::NotFollowing => "Not following this user.",
			Self::RelationshipNotFound => "Follow relationship does not exist.",
		};

		f.write_str(message)
	}
}

/// Authentication failures, deliberately low on detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthFailure {
	/// Email or password rejected; which one is never revealed.
	InvalidCredentials,
	/// No access token was presented.
	MissingToken,
	/// Token failed verification (malformed, unknown key, bad signature, wrong issuer, expired).
	TokenInvalid,
	/// Session could not be refreshed and was signed out.
	SessionExpired,
	/// Token is valid but no local account matches its subject.
	UnknownUser,
}
impl Display for AuthFailure {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		let message = match self {
			Self::InvalidCredentials => "Invalid email or password.",
			Self::MissingToken => "Authentication required.",
			Self::TokenInvalid => "Invalid or expired access token.",
			Self::SessionExpired => "Session expired, please sign in again.",
			Self::UnknownUser => "Authenticated user not found.",
		};

		f.write_str(message)
	}
}

/// Single field-scoped validation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
	/// Name of the offending input field.
	pub field: &'static str,
	/// Client-facing explanation.
	pub message: String,
}
impl FieldError {
	/// Create a new field error.
	pub fn new(field: &'static str, message: impl Into<String>) -> Self {
		Self { field, message: message.into() }
	}
}

/// Field-level validation failures, at most one entry per field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
	fields: BTreeMap<&'static str, String>,
}
impl ValidationErrors {
	/// Create an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Record a failure; the first message recorded for a field wins.
	pub fn push(&mut self, error: FieldError) {
		self.fields.entry(error.field).or_insert(error.message);
	}

	/// Message recorded for the given field.
	pub fn get(&self, field: &str) -> Option<&str> {
		self.fields.get(field).map(String::as_str)
	}

	/// Whether the given field failed validation.
	pub fn contains(&self, field: &str) -> bool {
		self.fields.contains_key(field)
	}

	/// Number of invalid fields.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Whether no failures were recorded.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Iterate over `(field, message)` pairs in field order.
	pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
		self.fields.iter().map(|(field, message)| (*field, message.as_str()))
	}

	/// Convert into `Ok(())` when empty, or into [`Error::Validation`] otherwise.
	pub fn into_result(self) -> Result<()> {
		if self.is_empty() { Ok(()) } else { Err(Error::Validation(self)) }
	}
}
impl Display for ValidationErrors {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		for (i, (field, message)) in self.iter().enumerate() {
			if i > 0 {
				f.write_str("; ")?;
			}

			write!(f, "{field}: {message}")?;
		}

		Ok(())
	}
}
impl From<FieldError> for ValidationErrors {
	fn from(value: FieldError) -> Self {
		let mut errors = Self::new();

		errors.push(value);

		errors
	}
}
