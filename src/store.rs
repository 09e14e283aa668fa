//! Local persistence seams for users, follow edges, posts, and likes.
//!
//! The traits mirror what a relational schema provides: unique constraints are reported as
//! [`StoreError::UniqueViolation`] and stay authoritative even when callers pre-check
//! availability.

pub mod memory;

// std
use std::future::Future;
// crates.io
use serde::Serialize;
use uuid::Uuid;
// self
use crate::{_prelude::*, error::Conflict};

pub use memory::MemoryStore;

/// Result type returned by store implementations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Local projection of a provider account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
	/// Provider-assigned identifier.
	pub external_id: String,
	/// Unique email address.
	pub email: String,
	/// Unique public handle.
	pub username: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Creation time.
	pub created_at: DateTime<Utc>,
}

/// Insert payload for [`User`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
	/// Provider-assigned identifier.
	pub external_id: String,
	/// Email address.
	pub email: String,
	/// Public handle.
	pub username: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
}

/// Directed follow edge with per-edge flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Follow {
	/// Follower external id.
	pub follower: String,
	/// Followed external id.
	pub followed: String,
	/// Follower muted the followed user.
	pub is_muted: bool,
	/// Follower blocked the followed user.
	pub is_blocked: bool,
	/// Creation time.
	pub created_at: DateTime<Utc>,
}
impl Follow {
	/// Fresh edge with both flags cleared.
	pub fn new(follower: impl Into<String>, followed: impl Into<String>) -> Self {
		Self {
			follower: follower.into(),
			followed: followed.into(),
			is_muted: false,
			is_blocked: false,
			created_at: Utc::now(),
		}
	}
}

/// Short-form post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
	/// Post identifier.
	pub id: Uuid,
	/// Author external id.
	pub author: String,
	/// Body, 1 to 280 characters.
	pub content: String,
	/// Creation time.
	pub created_at: DateTime<Utc>,
}

/// Like of a post by a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Like {
	/// Liked post.
	pub post_id: Uuid,
	/// Liking user's external id.
	pub user: String,
	/// Creation time.
	pub created_at: DateTime<Utc>,
}

/// Constraint reported by [`StoreError::UniqueViolation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniqueField {
	/// `users.external_id`
	ExternalId,
	/// `users.email`
	Email,
	/// `users.username`
	Username,
	/// `follows(follower, followed)`
	FollowPair,
	/// `likes(post_id, user)`
	LikePair,
}

/// Store failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
	/// A unique constraint rejected the write.
	#[error("Unique constraint violated on {0:?}.")]
	UniqueViolation(UniqueField),
	/// Storage backend failure.
	#[error("Store backend failure: {0}")]
	Backend(String),
}
impl From<StoreError> for Error {
	fn from(value: StoreError) -> Self {
		match value {
			StoreError::UniqueViolation(UniqueField::Email) => Error::Conflict(Conflict::EmailTaken),
			StoreError::UniqueViolation(UniqueField::Username) =>
				Error::Conflict(Conflict::UsernameTaken),
			StoreError::UniqueViolation(UniqueField::FollowPair) =>
				Error::Conflict(Conflict::AlreadyFollowing),
			other => Error::Store(other.to_string()),
		}
	}
}

/// Local user records.
pub trait UserDirectory: Send + Sync {
	/// Insert a user; unique on external id, email, and username.
	fn create_user(&self, user: NewUser) -> impl Future<Output = StoreResult<User>> + Send;

	/// Whether no user holds `username`.
	fn is_username_available(&self, username: &str)
	-> impl Future<Output = StoreResult<bool>> + Send;

	/// Whether no user holds `email`.
	fn is_email_available(&self, email: &str) -> impl Future<Output = StoreResult<bool>> + Send;

	/// Look up a user by provider identifier.
	fn find_by_external_id(
		&self,
		external_id: &str,
	) -> impl Future<Output = StoreResult<Option<User>>> + Send;

	/// Remove a user and everything hanging off it; returns whether a row was removed.
	fn delete_user(&self, external_id: &str) -> impl Future<Output = StoreResult<bool>> + Send;
}

/// Follow edges.
pub trait FollowStore: Send + Sync {
	/// Insert an edge; unique on `(follower, followed)`.
	fn insert_follow(&self, follow: Follow) -> impl Future<Output = StoreResult<Follow>> + Send;

	/// Fetch the edge for an ordered pair.
	fn find_follow(
		&self,
		follower: &str,
		followed: &str,
	) -> impl Future<Output = StoreResult<Option<Follow>>> + Send;

	/// Overwrite the flags of an existing edge; returns `false` when no edge exists.
	fn save_follow(&self, follow: &Follow) -> impl Future<Output = StoreResult<bool>> + Send;

	/// Remove the edge for an ordered pair; returns whether one existed.
	fn delete_follow(
		&self,
		follower: &str,
		followed: &str,
	) -> impl Future<Output = StoreResult<bool>> + Send;

	/// Edges where `user` is the follower.
	fn following(&self, user: &str) -> impl Future<Output = StoreResult<Vec<Follow>>> + Send;

	/// Edges where `user` is followed.
	fn followers(&self, user: &str) -> impl Future<Output = StoreResult<Vec<Follow>>> + Send;
}

/// Posts and likes.
pub trait PostStore: Send + Sync {
	/// Insert a post.
	fn insert_post(&self, post: Post) -> impl Future<Output = StoreResult<Post>> + Send;

	/// Fetch a post.
	fn find_post(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<Post>>> + Send;

	/// Delete a post and its likes; returns whether it existed.
	fn delete_post(&self, id: Uuid) -> impl Future<Output = StoreResult<bool>> + Send;

	/// Insert a like; unique on `(post_id, user)`.
	fn insert_like(&self, like: Like) -> impl Future<Output = StoreResult<Like>> + Send;

	/// Remove a like; returns whether it existed.
	fn delete_like(&self, post_id: Uuid, user: &str)
	-> impl Future<Output = StoreResult<bool>> + Send;

	/// Number of likes on a post.
	fn like_count(&self, post_id: Uuid) -> impl Future<Output = StoreResult<usize>> + Send;
}
