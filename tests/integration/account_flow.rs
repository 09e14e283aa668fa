//! Sign-up, rollback, and sign-in through the HTTP adapter and the Cognito client.

// std
use std::sync::Arc;
// crates.io
use http::{Request, StatusCode, header::COOKIE};
use serde_json::json;
use social_accounts::{Api, CognitoClient, MemoryStore, Result};
use wiremock::{MockServer, ResponseTemplate, matchers::body_partial_json};
// self
use crate::support::{self, USER_SUB};

fn post(uri: &str, body: serde_json::Value) -> Request<Vec<u8>> {
	Request::builder().method("POST").uri(uri).body(body.to_string().into_bytes()).unwrap()
}

async fn api(server: &MockServer, store: Arc<MemoryStore>) -> Result<Api<CognitoClient, MemoryStore>> {
	let config = support::config(server);
	let client = CognitoClient::new(Arc::new(config.clone()))?;

	Api::new(Arc::new(client), store, &config)
}

async fn mount_sign_up(server: &MockServer) {
	support::cognito("SignUp")
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!({ "UserSub": USER_SUB, "UserConfirmed": false })),
		)
		.expect(1)
		.mount(server)
		.await;
	support::cognito("AdminAddUserToGroup")
		.and(body_partial_json(json!({ "Username": USER_SUB, "GroupName": "Member" })))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
		.expect(1)
		.mount(server)
		.await;
}

#[tokio::test]
async fn sign_up_creates_confirmed_grouped_account() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	mount_sign_up(&server).await;
	support::cognito("AdminConfirmSignUp")
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
		.expect(1)
		.mount(&server)
		.await;
	support::cognito("AdminDeleteUser")
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
		.expect(0)
		.mount(&server)
		.await;

	let store = Arc::new(MemoryStore::new());
	let api = api(&server, store.clone()).await?;
	let response =
		api.handle(post("/signup", support::sign_up_body("jane@example.com", "jane_doe"))).await;

	assert_eq!(response.status(), StatusCode::CREATED);
	assert_eq!(store.user_count().await, 1);
	assert_eq!(support::received_operations(&server).await, [
		"SignUp",
		"AdminAddUserToGroup",
		"AdminConfirmSignUp"
	]);

	server.verify().await;

	Ok(())
}

#[tokio::test]
async fn failed_confirmation_rolls_back_provider_account() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	mount_sign_up(&server).await;
	support::cognito("AdminConfirmSignUp")
		.respond_with(support::cognito_error(500, "InternalErrorException"))
		.mount(&server)
		.await;
	support::cognito("AdminDeleteUser")
		.and(body_partial_json(json!({ "Username": USER_SUB })))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
		.expect(1)
		.mount(&server)
		.await;

	let store = Arc::new(MemoryStore::new());
	let api = api(&server, store.clone()).await?;
	let response =
		api.handle(post("/signup", support::sign_up_body("jane@example.com", "jane_doe"))).await;

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(store.user_count().await, 0);

	server.verify().await;

	Ok(())
}

#[tokio::test]
async fn weak_password_is_a_field_error() -> Result<()> {
	let server = MockServer::start().await;

	support::cognito("SignUp")
		.respond_with(support::cognito_error(400, "InvalidPasswordException"))
		.mount(&server)
		.await;

	let api = api(&server, Arc::new(MemoryStore::new())).await?;
	let response =
		api.handle(post("/signup", support::sign_up_body("jane@example.com", "jane_doe"))).await;
	let body: serde_json::Value = serde_json::from_slice(response.body())?;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(body["errors"]["password"], "mocked failure");
	assert_eq!(support::received_operations(&server).await, ["SignUp"]);

	Ok(())
}

#[tokio::test]
async fn signed_in_user_can_post() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	support::mount_jwks(&server).await;
	mount_sign_up(&server).await;
	support::cognito("AdminConfirmSignUp")
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
		.mount(&server)
		.await;
	support::cognito("InitiateAuth")
		.and(body_partial_json(json!({
			"AuthFlow": "USER_PASSWORD_AUTH",
			"AuthParameters": { "USERNAME": "jane@example.com" }
		})))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"AuthenticationResult": {
				"AccessToken": support::mint(USER_SUB, 3600),
				"RefreshToken": "opaque-refresh",
				"ExpiresIn": 3600,
				"TokenType": "Bearer"
			}
		})))
		.expect(1)
		.mount(&server)
		.await;

	let api = api(&server, Arc::new(MemoryStore::new())).await?;

	api.handle(post("/signup", support::sign_up_body("jane@example.com", "jane_doe"))).await;

	let signed_in = api
		.handle(post("/signin", json!({ "email": "jane@example.com", "password": "Passw0rd!" })))
		.await;

	assert_eq!(signed_in.status(), StatusCode::OK);

	let cookies: Vec<String> = signed_in
		.headers()
		.get_all(http::header::SET_COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.filter_map(|value| value.split(';').next())
		.map(str::to_owned)
		.collect();

	assert_eq!(cookies.len(), 2);
	assert!(cookies.iter().any(|c| c == "refresh_token=opaque-refresh"));

	let mut request = post("/posts", json!({ "content": "first post" }));

	request.headers_mut().insert(COOKIE, cookies.join("; ").parse().unwrap());

	let created = api.handle(request).await;

	assert_eq!(created.status(), StatusCode::CREATED);
	assert!(created.headers().get(http::header::SET_COOKIE).is_none());

	server.verify().await;

	Ok(())
}
