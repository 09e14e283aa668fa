//! Field validation for sign-up, sign-in, and post input.
//!
//! A check is a plain function over the input that reports at most one [`FieldError`].
//! [`validate_all`] runs every check and collects the failures, so a client learns about every
//! invalid field at once. Checks do no I/O.

// crates.io
use regex::Regex;
// self
use crate::{
	_prelude::*,
	error::{FieldError, ValidationErrors},
	provider::{Credentials, SignUpData},
};

/// Maximum post length in characters.
pub const MAX_POST_CHARS: usize = 280;

const NAME_PATTERN: &str = r"^[a-zA-ZÀ-ÖØ-öø-ǿ]+([ \-']?[a-zA-ZÀ-ÖØ-öø-ǿ]+)?$";
const USERNAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_]{2,14}$";

/// Field check over an input of type `T`.
pub type Check<T> = fn(&ValidationRules, &T) -> std::result::Result<(), FieldError>;

/// Compiled patterns shared by every check.
#[derive(Clone, Debug)]
pub struct ValidationRules {
	name: Regex,
	username: Regex,
}
impl ValidationRules {
	/// Compile the patterns.
	pub fn new() -> Result<Self> {
		let compile = |pattern: &str| {
			Regex::new(pattern).map_err(|e| Error::Config { field: "validation", reason: e.to_string() })
		};

		Ok(Self { name: compile(NAME_PATTERN)?, username: compile(USERNAME_PATTERN)? })
	}

	/// Whether `value` is a well-formed given or family name.
	pub fn is_valid_name(&self, value: &str) -> bool {
		self.name.is_match(value)
	}

	/// Whether `value` is a well-formed username.
	///
	/// Starts with a letter, 3 to 15 characters from `[A-Za-z0-9_]`, no `__`, no trailing `_`.
	pub fn is_valid_username(&self, value: &str) -> bool {
		self.username.is_match(value) && !value.contains("__") && !value.ends_with('_')
	}
}

/// Run every check and collect the failures.
pub fn validate_all<T>(rules: &ValidationRules, input: &T, checks: &[Check<T>]) -> Result<()> {
	let mut errors = ValidationErrors::new();

	for check in checks {
		if let Err(error) = check(rules, input) {
			errors.push(error);
		}
	}

	errors.into_result()
}

/// Checks applied to a sign-up payload.
pub fn sign_up_checks() -> [Check<SignUpData>; 5] {
	[
		|rules, data| check_name(rules, "first_name", &data.first_name),
		|rules, data| check_name(rules, "last_name", &data.last_name),
		|rules, data| check_username(rules, &data.username),
		|_, data| check_email(&data.email),
		|_, data| check_password(data.password.expose()),
	]
}

/// Checks applied to sign-in credentials.
pub fn sign_in_checks() -> [Check<Credentials>; 2] {
	[
		|_, credentials| check_email(&credentials.email),
		|_, credentials| check_password(credentials.password.expose()),
	]
}

/// Given or family name.
pub fn check_name(
	rules: &ValidationRules,
	field: &'static str,
	value: &str,
) -> std::result::Result<(), FieldError> {
	if value.trim().is_empty() {
		return Err(FieldError::new(field, "Cannot be empty."));
	}
	if !rules.is_valid_name(value) {
		return Err(FieldError::new(
			field,
			"Must only contain alphabetic characters from the Latin alphabet.",
		));
	}

	Ok(())
}

/// Public handle.
pub fn check_username(rules: &ValidationRules, value: &str) -> std::result::Result<(), FieldError> {
	if value.is_empty() {
		return Err(FieldError::new("username", "Username cannot be empty."));
	}
	if !rules.is_valid_username(value) {
		return Err(FieldError::new("username", "Invalid username."));
	}

	Ok(())
}

/// Email address.
pub fn check_email(value: &str) -> std::result::Result<(), FieldError> {
	if value.trim().is_empty() {
		return Err(FieldError::new("email", "Email cannot be empty."));
	}

	let valid = match value.split_once('@') {
		Some((local, domain)) =>
			!local.is_empty()
				&& !domain.contains('@')
				&& domain.contains('.')
				&& !domain.starts_with('.')
				&& !domain.ends_with('.')
				&& !value.chars().any(char::is_whitespace),
		None => false,
	};

	if valid { Ok(()) } else { Err(FieldError::new("email", "Enter a valid email address.")) }
}

/// Password presence; strength is enforced by the provider.
pub fn check_password(value: &str) -> std::result::Result<(), FieldError> {
	if value.is_empty() {
		return Err(FieldError::new("password", "Password cannot be empty."));
	}

	Ok(())
}

/// Post body: 1 to 280 characters, whitespace included.
pub fn check_content(value: &str) -> std::result::Result<(), FieldError> {
	if value.is_empty() {
		return Err(FieldError::new("content", "Post content cannot be empty."));
	}
	if value.chars().count() > MAX_POST_CHARS {
		return Err(FieldError::new(
			"content",
			format!("Post content must be at most {MAX_POST_CHARS} characters."),
		));
	}

	Ok(())
}
