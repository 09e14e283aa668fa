//! Account lifecycle orchestration across the identity provider and the local directory.
//!
//! Sign-up is a multi-step sequence against two systems with no shared transaction. Once the
//! provider has issued an identifier, any later failure deletes the provider account again
//! before the original error is returned.

// crates.io
use tracing::Instrument;
// self
use crate::{
	_prelude::*,
	config::Config,
	error::{AuthFailure, Conflict},
	metrics,
	provider::{AuthTokens, Credentials, IdentityProvider, ProviderError, SignUpData},
	store::{NewUser, User, UserDirectory},
	token::TokenVerifier,
	validation::{self, ValidationRules},
};

/// Orchestrates sign-up, sign-in, and sign-out.
#[derive(Debug)]
pub struct AccountService<P, D> {
	provider: Arc<P>,
	directory: Arc<D>,
	verifier: Arc<TokenVerifier>,
	rules: ValidationRules,
	default_group: String,
}
impl<P, D> AccountService<P, D>
where
	P: IdentityProvider,
	D: UserDirectory,
{
	/// Create the service.
	pub fn new(
		provider: Arc<P>,
		directory: Arc<D>,
		verifier: Arc<TokenVerifier>,
		config: &Config,
	) -> Result<Self> {
		Ok(Self {
			provider,
			directory,
			verifier,
			rules: ValidationRules::new()?,
			default_group: config.default_group.clone(),
		})
	}

	/// Register an account with the provider and mirror it locally.
	pub async fn create_user(&self, data: SignUpData) -> Result<User> {
		let span = tracing::info_span!("create_user", username = %data.username);
		let result = self.create_user_inner(&data).instrument(span).await;

		metrics::record_signup(match &result {
			Ok(_) => "success",
			Err(e) => error_label(e),
		});

		result
	}

	async fn create_user_inner(&self, data: &SignUpData) -> Result<User> {
		validation::validate_all(&self.rules, data, &validation::sign_up_checks())?;

		if !self.directory.is_username_available(&data.username).await? {
			return Err(Conflict::UsernameTaken.into());
		}
		if !self.directory.is_email_available(&data.email).await? {
			return Err(Conflict::EmailTaken.into());
		}

		let external_id = self.provider.sign_up(data).await?;

		tracing::debug!(%external_id, "provider account created");

		match self.complete_sign_up(&external_id, data).await {
			Ok(user) => {
				tracing::info!(%external_id, "account created");

				Ok(user)
			},
			Err(e) => {
				tracing::warn!(%external_id, error = %e, "sign-up failed after provider creation");
				self.roll_back(&external_id).await;

				Err(e)
			},
		}
	}

	async fn complete_sign_up(&self, external_id: &str, data: &SignUpData) -> Result<User> {
		self.provider.add_user_to_group(external_id, &self.default_group).await?;
		self.provider.confirm_user(external_id).await?;

		let user = self
			.directory
			.create_user(NewUser {
				external_id: external_id.to_owned(),
				email: data.email.clone(),
				username: data.username.clone(),
				first_name: data.first_name.clone(),
				last_name: data.last_name.clone(),
			})
			.await?;

		Ok(user)
	}

	async fn roll_back(&self, external_id: &str) {
		match self.provider.delete_user(external_id).await {
			Ok(()) => {
				tracing::info!(%external_id, "provider account rolled back");
				metrics::record_rollback("success");
			},
			Err(e) => {
				tracing::error!(%external_id, error = %e, "provider account rollback failed");
				metrics::record_rollback("failed");
			},
		}
	}

	/// Exchange credentials for session tokens.
	///
	/// Every provider rejection collapses into [`AuthFailure::InvalidCredentials`]; transient
	/// failures stay retryable.
	#[tracing::instrument(skip_all)]
	pub async fn sign_in(&self, credentials: Credentials) -> Result<AuthTokens> {
		if let Err(e) =
			validation::validate_all(&self.rules, &credentials, &validation::sign_in_checks())
		{
			metrics::record_signin("invalid");

			return Err(e);
		}

		match self.provider.authenticate(&credentials).await {
			Ok(tokens) => {
				metrics::record_signin("success");

				Ok(tokens)
			},
			Err(ProviderError::Transient(reason)) => {
				tracing::warn!(%reason, "sign-in failed transiently");
				metrics::record_signin("transient");

				Err(Error::TransientProvider(reason))
			},
			Err(e) => {
				tracing::debug!(error = %e, "sign-in rejected");
				metrics::record_signin("invalid_credentials");

				Err(AuthFailure::InvalidCredentials.into())
			},
		}
	}

	/// Invalidate every session of the token's account; failures are logged only.
	#[tracing::instrument(skip_all)]
	pub async fn sign_out(&self, access_token: &str) {
		if let Err(e) = self.provider.sign_out(access_token).await {
			tracing::debug!(error = %e, "best-effort sign-out failed");
		}
	}

	/// Resolve the local user behind a valid access token.
	pub async fn authenticated_user(&self, access_token: &str) -> Result<User> {
		let claims = self.verifier.verify(access_token).await?;

		self.directory
			.find_by_external_id(&claims.username)
			.await?
			.ok_or(Error::Authentication(AuthFailure::UnknownUser))
	}

	/// Directory backing the service.
	pub fn directory(&self) -> &D {
		&self.directory
	}
}

fn error_label(error: &Error) -> &'static str {
	match error {
		Error::Validation(_) => "invalid",
		Error::Conflict(_) => "conflict",
		Error::TransientProvider(_) => "transient",
		_ => "error",
	}
}
