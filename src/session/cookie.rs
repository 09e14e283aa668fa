//! Session cookie parsing and `Set-Cookie` rendering.

// crates.io
use http::{
	HeaderMap, HeaderValue,
	header::{COOKIE, SET_COOKIE},
};
// self
use crate::_prelude::*;

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const ATTRIBUTES: &str = "HttpOnly; Secure; SameSite=Strict; Path=/";
const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Read a cookie from every `Cookie` header on the request.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|raw| raw.split(';'))
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(key, value)| *key == name && !value.is_empty())
		.map(|(_, value)| value.to_owned())
}

/// `Set-Cookie` value storing `value` for `max_age`.
pub fn render(name: &str, value: &str, max_age: Duration) -> String {
	format!("{name}={value}; {ATTRIBUTES}; Max-Age={}", max_age.as_secs())
}

/// `Set-Cookie` value deleting `name`.
pub fn render_deletion(name: &str) -> String {
	format!("{name}=; {ATTRIBUTES}; Max-Age=0; Expires={EPOCH}")
}

/// Write a cookie, replacing any `Set-Cookie` already emitted for the same name.
pub fn set_cookie(headers: &mut HeaderMap, name: &str, value: &str, max_age: Duration) -> Result<()> {
	replace(headers, name, render(name, value, max_age))
}

/// Delete a cookie, replacing any `Set-Cookie` already emitted for the same name.
pub fn delete_cookie(headers: &mut HeaderMap, name: &str) -> Result<()> {
	replace(headers, name, render_deletion(name))
}

/// Delete both session cookies.
pub fn clear_session(headers: &mut HeaderMap) -> Result<()> {
	delete_cookie(headers, ACCESS_TOKEN_COOKIE)?;
	delete_cookie(headers, REFRESH_TOKEN_COOKIE)
}

/// `Set-Cookie` value currently emitted for `name`, if any.
pub fn emitted(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get_all(SET_COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.find(|value| cookie_name(value) == Some(name))
		.map(str::to_owned)
}

/// Whether the emitted `Set-Cookie` for `name` deletes it.
pub fn is_deleted(headers: &HeaderMap, name: &str) -> bool {
	emitted(headers, name).is_some_and(|value| value.contains("Max-Age=0"))
}

fn replace(headers: &mut HeaderMap, name: &str, rendered: String) -> Result<()> {
	let value = HeaderValue::from_str(&rendered).map_err(|e| Error::Http(e.into()))?;
	let kept: Vec<HeaderValue> = headers
		.get_all(SET_COOKIE)
		.iter()
		.filter(|existing| existing.to_str().ok().and_then(cookie_name) != Some(name))
		.cloned()
		.collect();

	headers.remove(SET_COOKIE);

	for existing in kept {
		headers.append(SET_COOKIE, existing);
	}

	headers.append(SET_COOKIE, value);

	Ok(())
}

fn cookie_name(set_cookie: &str) -> Option<&str> {
	set_cookie.split_once('=').map(|(name, _)| name.trim())
}
