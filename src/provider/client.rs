//! AWS SDK implementation of [`IdentityProvider`] for Cognito user pools.

// std
use std::future::Future;
// crates.io
use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::{
	Client,
	config::{
		self as sdk_config, Credentials, Region, http::HttpResponse, retry::RetryConfig,
		timeout::TimeoutConfig,
	},
	error::{ProvideErrorMetadata, SdkError},
	operation::initiate_auth::InitiateAuthOutput,
	types::{AttributeType, AuthFlowType, UserType},
};
// self
use crate::{
	_prelude::*,
	config::Config,
	metrics,
	provider::{
		AuthTokens, Credentials as PasswordCredentials, IdentityProvider, ProviderError,
		ProviderResult, ProviderUser, RefreshedTokens, SignUpData,
	},
	signer::SecretHasher,
};

const CREDENTIALS_SOURCE: &str = "social-accounts-config";

/// Cognito user-pool client.
///
/// Requests are signed and serialized by the AWS SDK. The SDK client is built once and shared
/// across clones. SDK retries are disabled; [`ProviderError::is_transient`] leaves the retry
/// decision to the caller.
#[derive(Clone, Debug)]
pub struct CognitoClient {
	sdk: Client,
	config: Arc<Config>,
	hasher: SecretHasher,
}
impl CognitoClient {
	/// Build a client from the static credentials in the configuration.
	///
	/// Use [`CognitoClient::load`] to resolve credentials through the default AWS chain.
	pub fn new(config: Arc<Config>) -> Result<Self> {
		config.validate()?;

		if !config.has_static_credentials() {
			return Err(Error::Config {
				field: "access_key_id",
				reason: "Static credentials are required; `CognitoClient::load` uses the default \
				         credential chain."
					.into(),
			});
		}

		let credentials = Credentials::new(
			config.access_key_id.clone(),
			config.secret_access_key.expose(),
			config.session_token.as_ref().map(|token| token.expose().to_owned()),
			None,
			CREDENTIALS_SOURCE,
		);

		Self::with_builder(config, sdk_config::Builder::new().credentials_provider(credentials))
	}

	/// Build a client, resolving credentials through the default AWS chain unless static ones
	/// are configured.
	pub async fn load(config: Arc<Config>) -> Result<Self> {
		if config.has_static_credentials() {
			return Self::new(config);
		}

		config.validate()?;

		let shared = aws_config::defaults(BehaviorVersion::latest())
			.region(Region::new(config.region.clone()))
			.load()
			.await;

		Self::with_builder(config, sdk_config::Builder::from(&shared))
	}

	/// Build a client around an SDK configuration builder.
	///
	/// Region, endpoint override, timeouts and the retry policy are always taken from `config`.
	pub fn with_builder(config: Arc<Config>, builder: sdk_config::Builder) -> Result<Self> {
		config.validate()?;

		let timeouts = TimeoutConfig::builder()
			.connect_timeout(config.connect_timeout)
			.operation_timeout(config.request_timeout)
			.build();
		let mut builder = builder
			.behavior_version(BehaviorVersion::latest())
			.region(Region::new(config.region.clone()))
			.retry_config(RetryConfig::disabled())
			.timeout_config(timeouts);

		if let Some(endpoint) = &config.endpoint {
			builder = builder.endpoint_url(endpoint.as_str());
		}

		let hasher = SecretHasher::new(config.client_id.clone(), config.client_secret.clone());

		Ok(Self { sdk: Client::from_conf(builder.build()), config, hasher })
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &Config {
		&self.config
	}

	async fn observe<T, E, F>(&self, operation: &'static str, call: F) -> ProviderResult<T>
	where
		E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
		F: Future<Output = std::result::Result<T, SdkError<E, HttpResponse>>>,
	{
		let start = Instant::now();
		let result = call.await;
		let elapsed = start.elapsed();

		metrics::record_provider_call(operation, result.is_ok(), elapsed);

		match result {
			Ok(output) => {
				tracing::debug!(operation, elapsed = ?elapsed, "provider call complete");

				Ok(output)
			},
			Err(e) => {
				let classified = ProviderError::from_sdk(&e);

				match &classified {
					ProviderError::Unexpected { code, message } => tracing::error!(
						operation,
						code = %code,
						message = %message,
						"unexpected provider error"
					),
					_ => tracing::warn!(operation, error = %classified, "provider call failed"),
				}

				Err(classified)
			},
		}
	}
}
impl IdentityProvider for CognitoClient {
	async fn sign_up(&self, data: &SignUpData) -> ProviderResult<String> {
		let request = self
			.sdk
			.sign_up()
			.client_id(self.hasher.client_id())
			.secret_hash(self.hasher.sign(&data.email))
			.username(&data.email)
			.password(data.password.expose())
			.user_attributes(attribute("preferred_username", &data.username)?)
			.user_attributes(attribute("given_name", &data.first_name)?)
			.user_attributes(attribute("family_name", &data.last_name)?);
		let output = self.observe("SignUp", request.send()).await?;

		Ok(output.user_sub().to_owned())
	}

	async fn delete_user(&self, external_id: &str) -> ProviderResult<()> {
		let request =
			self.sdk.admin_delete_user().user_pool_id(&self.config.user_pool_id).username(external_id);

		self.observe("AdminDeleteUser", request.send()).await.map(drop)
	}

	async fn add_user_to_group(&self, external_id: &str, group: &str) -> ProviderResult<()> {
		let request = self
			.sdk
			.admin_add_user_to_group()
			.user_pool_id(&self.config.user_pool_id)
			.username(external_id)
			.group_name(group);

		self.observe("AdminAddUserToGroup", request.send()).await.map(drop)
	}

	async fn confirm_user(&self, external_id: &str) -> ProviderResult<()> {
		let request = self
			.sdk
			.admin_confirm_sign_up()
			.user_pool_id(&self.config.user_pool_id)
			.username(external_id);

		self.observe("AdminConfirmSignUp", request.send()).await.map(drop)
	}

	async fn authenticate(&self, credentials: &PasswordCredentials) -> ProviderResult<AuthTokens> {
		let request = self
			.sdk
			.initiate_auth()
			.auth_flow(AuthFlowType::UserPasswordAuth)
			.client_id(self.hasher.client_id())
			.auth_parameters("USERNAME", &credentials.email)
			.auth_parameters("PASSWORD", credentials.password.expose())
			.auth_parameters("SECRET_HASH", self.hasher.sign(&credentials.email));
		let output = self.observe("InitiateAuth", request.send()).await?;
		let issued = Issued::from_output(&output)?;
		let refresh_token = issued.refresh_token.ok_or_else(|| ProviderError::Unexpected {
			code: "MissingRefreshToken".into(),
			message: "Password authentication returned no refresh token.".into(),
		})?;

		Ok(AuthTokens {
			access_token: issued.access_token,
			refresh_token,
			expires_in: issued.expires_in,
			token_type: issued.token_type,
		})
	}

	async fn refresh(
		&self,
		refresh_token: &str,
		username_claim: &str,
	) -> ProviderResult<RefreshedTokens> {
		let request = self
			.sdk
			.initiate_auth()
			.auth_flow(AuthFlowType::RefreshTokenAuth)
			.client_id(self.hasher.client_id())
			.auth_parameters("REFRESH_TOKEN", refresh_token)
			.auth_parameters("SECRET_HASH", self.hasher.sign(username_claim));
		let output = self.observe("InitiateAuth", request.send()).await?;
		let issued = Issued::from_output(&output)?;

		Ok(RefreshedTokens {
			access_token: issued.access_token,
			expires_in: issued.expires_in,
			token_type: issued.token_type,
		})
	}

	async fn sign_out(&self, access_token: &str) -> ProviderResult<()> {
		let request = self.sdk.global_sign_out().access_token(access_token);

		self.observe("GlobalSignOut", request.send()).await.map(drop)
	}

	async fn admin_sign_out(&self, external_id: &str) -> ProviderResult<()> {
		let request = self
			.sdk
			.admin_user_global_sign_out()
			.user_pool_id(&self.config.user_pool_id)
			.username(external_id);

		self.observe("AdminUserGlobalSignOut", request.send()).await.map(drop)
	}

	async fn find_user(&self, attribute: &str, value: &str) -> ProviderResult<Option<ProviderUser>> {
		let request = self
			.sdk
			.list_users()
			.user_pool_id(&self.config.user_pool_id)
			.filter(filter_literal(attribute, value))
			.limit(1);
		let output = self.observe("ListUsers", request.send()).await?;

		Ok(output.users().first().map(provider_user))
	}
}

/// Tokens common to both `InitiateAuth` flows.
struct Issued {
	access_token: String,
	refresh_token: Option<String>,
	expires_in: u64,
	token_type: String,
}
impl Issued {
	fn from_output(output: &InitiateAuthOutput) -> ProviderResult<Self> {
		let Some(result) = output.authentication_result() else {
			return Err(ProviderError::Unexpected {
				code: "UnsupportedChallenge".into(),
				message: output
					.challenge_name()
					.map_or_else(|| "none".into(), |challenge| challenge.as_str().to_owned()),
			});
		};
		let access_token = result.access_token().ok_or_else(|| ProviderError::Unexpected {
			code: "MissingAccessToken".into(),
			message: "Authentication returned no access token.".into(),
		})?;

		Ok(Self {
			access_token: access_token.to_owned(),
			refresh_token: result.refresh_token().map(str::to_owned),
			expires_in: u64::try_from(result.expires_in()).unwrap_or_default(),
			token_type: result.token_type().unwrap_or("Bearer").to_owned(),
		})
	}
}

fn attribute(name: &str, value: &str) -> ProviderResult<AttributeType> {
	AttributeType::builder().name(name).value(value).build().map_err(|e| {
		ProviderError::Unexpected { code: "InvalidAttribute".into(), message: e.to_string() }
	})
}

fn provider_user(user: &UserType) -> ProviderUser {
	let attribute = |name: &str| {
		user.attributes()
			.iter()
			.find(|a| a.name() == name)
			.and_then(|a| a.value())
			.map(str::to_owned)
	};

	ProviderUser {
		external_id: attribute("sub")
			.or_else(|| user.username().map(str::to_owned))
			.unwrap_or_default(),
		email: attribute("email"),
		username: attribute("preferred_username"),
		enabled: user.enabled(),
		status: user.user_status().map(|status| status.as_str().to_owned()),
	}
}

/// Escape a value for use inside a `ListUsers` filter literal.
fn filter_literal(attribute: &str, value: &str) -> String {
	format!("{attribute} = \"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
