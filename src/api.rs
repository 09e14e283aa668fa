//! Framework-agnostic request surface over `http` types.
//!
//! [`Api::handle`] routes a buffered request to the account, follow, and post services and
//! renders every error through [`Error::status_code`] and [`Error::public_message`]. The session
//! policy wraps every route except sign-out, which deletes the cookies itself. On sign-in the
//! policy runs after the handler, so a refresh triggered by stale request cookies replaces the
//! freshly issued ones.

// crates.io
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	account::AccountService,
	config::Config,
	error::AuthFailure,
	follow::FollowService,
	post::PostService,
	provider::{Credentials, IdentityProvider, SignUpData},
	session::{
		SessionPolicy,
		cookie::{self, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
	},
	store::{FollowStore, PostStore, User, UserDirectory},
	token::TokenVerifier,
};

type ApiResponse = Response<Vec<u8>>;

#[derive(Deserialize)]
struct NewPost {
	#[serde(default)]
	content: String,
}

#[derive(Serialize)]
struct SignedIn {
	token_type: String,
	expires_in: u64,
}

/// HTTP adapter over the account core.
#[derive(Debug)]
pub struct Api<P, S> {
	accounts: AccountService<P, S>,
	follows: FollowService<S>,
	posts: PostService<S>,
	session: SessionPolicy<P>,
	refresh_cookie_max_age: Duration,
}
impl<P, S> Api<P, S>
where
	P: IdentityProvider,
	S: UserDirectory + FollowStore + PostStore,
{
	/// Build the adapter and its token verifier from `config`.
	pub fn new(provider: Arc<P>, store: Arc<S>, config: &Config) -> Result<Self> {
		let verifier = Arc::new(TokenVerifier::new(config)?);

		Self::with_verifier(provider, store, verifier, config)
	}

	/// Build the adapter around an existing verifier.
	pub fn with_verifier(
		provider: Arc<P>,
		store: Arc<S>,
		verifier: Arc<TokenVerifier>,
		config: &Config,
	) -> Result<Self> {
		Ok(Self {
			accounts: AccountService::new(provider.clone(), store.clone(), verifier.clone(), config)?,
			follows: FollowService::new(store.clone()),
			posts: PostService::new(store),
			session: SessionPolicy::new(provider, verifier),
			refresh_cookie_max_age: config.refresh_cookie_max_age,
		})
	}

	/// Serve one request.
	pub async fn handle(&self, request: Request<Vec<u8>>) -> ApiResponse {
		if !is_session_managed(request.uri().path()) {
			return self.route(request).await;
		}

		match self.session.wrap(request, |request| self.route(request)).await {
			Ok(response) => response,
			Err(e) => {
				let mut response = error_response(&e);

				if let Err(e) = cookie::clear_session(response.headers_mut()) {
					tracing::error!(error = %e, "failed to clear session cookies");
				}

				response
			},
		}
	}

	async fn route(&self, request: Request<Vec<u8>>) -> ApiResponse {
		let method = request.method().as_str().to_owned();
		let path = request.uri().path().to_owned();
		let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
		let result = match (method.as_str(), segments.as_slice()) {
			("POST", ["signup"]) => self.sign_up(&request).await,
			("POST", ["signin"]) => self.sign_in(&request).await,
			("POST", ["signout"]) => self.sign_out(&request).await,
			("POST", [action @ ("follow" | "unfollow" | "mute" | "block")]) =>
				self.relationship(&request, action).await,
			("POST", ["posts"]) => self.create_post(&request).await,
			("DELETE", ["posts", id]) => self.delete_post(&request, id).await,
			("POST", ["posts", id, "like"]) => self.toggle_like(&request, id).await,
			_ => Err(Error::NotFound { resource: "route", id: path.clone() }),
		};

		tracing::debug!(%method, %path, ok = result.is_ok(), "request handled");

		result.unwrap_or_else(|e| error_response(&e))
	}

	async fn sign_up(&self, request: &Request<Vec<u8>>) -> Result<ApiResponse> {
		let data: SignUpData = parse_json(request.body())?;
		let user = self.accounts.create_user(data).await?;

		json_response(StatusCode::CREATED, &user)
	}

	async fn sign_in(&self, request: &Request<Vec<u8>>) -> Result<ApiResponse> {
		let credentials: Credentials = parse_json(request.body())?;
		let tokens = self.accounts.sign_in(credentials).await?;
		let mut response = json_response(StatusCode::OK, &SignedIn {
			token_type: tokens.token_type,
			expires_in: tokens.expires_in,
		})?;
		let headers = response.headers_mut();

		cookie::set_cookie(
			headers,
			ACCESS_TOKEN_COOKIE,
			&tokens.access_token,
			Duration::from_secs(tokens.expires_in),
		)?;
		cookie::set_cookie(
			headers,
			REFRESH_TOKEN_COOKIE,
			&tokens.refresh_token,
			self.refresh_cookie_max_age,
		)?;

		Ok(response)
	}

	async fn sign_out(&self, request: &Request<Vec<u8>>) -> Result<ApiResponse> {
		if let Some(token) = cookie::parse_cookie(request.headers(), ACCESS_TOKEN_COOKIE) {
			self.accounts.sign_out(&token).await;
		}

		let mut response = json_response(StatusCode::OK, &json!({ "message": "Signed out." }))?;

		cookie::clear_session(response.headers_mut())?;

		Ok(response)
	}

	async fn relationship(&self, request: &Request<Vec<u8>>, action: &str) -> Result<ApiResponse> {
		let user = self.current_user(request.headers()).await?;
		let query = Query::parse(request.uri().query());
		let target = query.require("user_id")?;

		if target != user.external_id
			&& self.accounts.directory().find_by_external_id(target).await?.is_none()
		{
			return Err(Error::NotFound { resource: "user", id: target.to_owned() });
		}

		match action {
			"follow" => {
				let follow = self.follows.follow(&user.external_id, target).await?;

				json_response(StatusCode::CREATED, &follow)
			},
			"unfollow" => {
				self.follows.unfollow(&user.external_id, target).await?;

				json_response(StatusCode::OK, &json!({ "message": "Unfollowed." }))
			},
			_ => {
				let value = query.flag("value")?;
				let changed = if action == "mute" {
					self.follows.mute(&user.external_id, target, value).await?
				} else {
					self.follows.block(&user.external_id, target, value).await?
				};

				json_response(StatusCode::OK, &json!({ "changed": changed }))
			},
		}
	}

	async fn create_post(&self, request: &Request<Vec<u8>>) -> Result<ApiResponse> {
		let user = self.current_user(request.headers()).await?;
		let NewPost { content } = parse_json(request.body())?;
		let post = self.posts.create_post(&user.external_id, &content).await?;

		json_response(StatusCode::CREATED, &post)
	}

	async fn delete_post(&self, request: &Request<Vec<u8>>, id: &str) -> Result<ApiResponse> {
		let user = self.current_user(request.headers()).await?;

		self.posts.delete_post(&user.external_id, parse_post_id(id)?).await?;

		let mut response = Response::new(Vec::new());

		*response.status_mut() = StatusCode::NO_CONTENT;

		Ok(response)
	}

	async fn toggle_like(&self, request: &Request<Vec<u8>>, id: &str) -> Result<ApiResponse> {
		let user = self.current_user(request.headers()).await?;
		let state = self.posts.toggle_like(&user.external_id, parse_post_id(id)?).await?;

		json_response(StatusCode::OK, &state)
	}

	async fn current_user(&self, headers: &HeaderMap) -> Result<User> {
		let token = cookie::parse_cookie(headers, ACCESS_TOKEN_COOKIE)
			.ok_or(Error::Authentication(AuthFailure::MissingToken))?;

		self.accounts.authenticated_user(&token).await
	}
}

struct Query(Vec<(String, String)>);
impl Query {
	fn parse(raw: Option<&str>) -> Self {
		Self(url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()).into_owned().collect())
	}

	fn get(&self, key: &str) -> Option<&str> {
		self.0.iter().find(|(k, v)| k == key && !v.is_empty()).map(|(_, v)| v.as_str())
	}

	fn require(&self, key: &'static str) -> Result<&str> {
		self.get(key).ok_or_else(|| Error::validation(key, "This field is required."))
	}

	fn flag(&self, key: &'static str) -> Result<bool> {
		match self.get(key) {
			None | Some("true") => Ok(true),
			Some("false") => Ok(false),
			Some(_) => Err(Error::validation(key, "Must be 'true' or 'false'.")),
		}
	}
}

fn is_session_managed(path: &str) -> bool {
	path.trim_end_matches('/') != "/signout"
}

fn parse_json<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_json::from_slice(body).map_err(|e| {
		tracing::debug!(error = %e, "rejecting malformed body");

		Error::validation("body", "Malformed JSON body.")
	})
}

fn parse_post_id(id: &str) -> Result<Uuid> {
	Uuid::parse_str(id).map_err(|_| Error::NotFound { resource: "post", id: id.to_owned() })
}

fn json_response<T>(status: StatusCode, body: &T) -> Result<ApiResponse>
where
	T: Serialize,
{
	let response = Response::builder()
		.status(status)
		.header(CONTENT_TYPE, "application/json")
		.body(serde_json::to_vec(body)?)?;

	Ok(response)
}

fn error_response(error: &Error) -> ApiResponse {
	let status = error.status_code();

	if status.is_server_error() {
		tracing::error!(%error, "request failed");
	} else {
		tracing::debug!(%error, "request rejected");
	}

	let body = match error {
		Error::Validation(errors) => json!({ "errors": errors }),
		_ => json!({ "error": error.public_message() }),
	};
	let mut response = Response::new(body.to_string().into_bytes());

	*response.status_mut() = status;
	response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

	response
}
