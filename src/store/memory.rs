//! In-memory store enforcing the same unique constraints as the relational schema.

// std
use std::collections::HashMap;
// crates.io
use tokio::sync::RwLock;
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	store::{
		Follow, FollowStore, Like, NewUser, Post, PostStore, StoreError, StoreResult, UniqueField,
		User, UserDirectory,
	},
};

#[derive(Debug, Default)]
struct Tables {
	users: HashMap<String, User>,
	follows: HashMap<(String, String), Follow>,
	posts: HashMap<Uuid, Post>,
	likes: HashMap<(Uuid, String), Like>,
}

/// Process-local store; every write runs under one lock so constraint checks are atomic.
///
/// Email uniqueness ignores ASCII case. Usernames compare exactly.
#[derive(Debug, Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}
impl MemoryStore {
	/// Create an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored users.
	pub async fn user_count(&self) -> usize {
		self.tables.read().await.users.len()
	}

	/// Number of stored follow edges.
	pub async fn follow_count(&self) -> usize {
		self.tables.read().await.follows.len()
	}
}
impl UserDirectory for MemoryStore {
	async fn create_user(&self, user: NewUser) -> StoreResult<User> {
		let mut tables = self.tables.write().await;

		if tables.users.contains_key(&user.external_id) {
			return Err(StoreError::UniqueViolation(UniqueField::ExternalId));
		}
		if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
			return Err(StoreError::UniqueViolation(UniqueField::Email));
		}
		if tables.users.values().any(|u| u.username == user.username) {
			return Err(StoreError::UniqueViolation(UniqueField::Username));
		}

		let user = User {
			external_id: user.external_id,
			email: user.email,
			username: user.username,
			first_name: user.first_name,
			last_name: user.last_name,
			created_at: Utc::now(),
		};

		tables.users.insert(user.external_id.clone(), user.clone());

		Ok(user)
	}

	async fn is_username_available(&self, username: &str) -> StoreResult<bool> {
		Ok(!self.tables.read().await.users.values().any(|u| u.username == username))
	}

	async fn is_email_available(&self, email: &str) -> StoreResult<bool> {
		Ok(!self.tables.read().await.users.values().any(|u| u.email.eq_ignore_ascii_case(email)))
	}

	async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
		Ok(self.tables.read().await.users.get(external_id).cloned())
	}

	async fn delete_user(&self, external_id: &str) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;

		if tables.users.remove(external_id).is_none() {
			return Ok(false);
		}

		tables.follows.retain(|(follower, followed), _| {
			follower != external_id && followed != external_id
		});

		let authored: Vec<Uuid> =
			tables.posts.values().filter(|p| p.author == external_id).map(|p| p.id).collect();

		tables.posts.retain(|_, post| post.author != external_id);
		tables
			.likes
			.retain(|(post_id, user), _| user != external_id && !authored.contains(post_id));

		Ok(true)
	}
}
impl FollowStore for MemoryStore {
	async fn insert_follow(&self, follow: Follow) -> StoreResult<Follow> {
		let mut tables = self.tables.write().await;
		let key = (follow.follower.clone(), follow.followed.clone());

		if tables.follows.contains_key(&key) {
			return Err(StoreError::UniqueViolation(UniqueField::FollowPair));
		}

		tables.follows.insert(key, follow.clone());

		Ok(follow)
	}

	async fn find_follow(&self, follower: &str, followed: &str) -> StoreResult<Option<Follow>> {
		let key = (follower.to_owned(), followed.to_owned());

		Ok(self.tables.read().await.follows.get(&key).cloned())
	}

	async fn save_follow(&self, follow: &Follow) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;
		let key = (follow.follower.clone(), follow.followed.clone());

		match tables.follows.get_mut(&key) {
			Some(existing) => {
				existing.is_muted = follow.is_muted;
				existing.is_blocked = follow.is_blocked;

				Ok(true)
			},
			None => Ok(false),
		}
	}

	async fn delete_follow(&self, follower: &str, followed: &str) -> StoreResult<bool> {
		let key = (follower.to_owned(), followed.to_owned());

		Ok(self.tables.write().await.follows.remove(&key).is_some())
	}

	async fn following(&self, user: &str) -> StoreResult<Vec<Follow>> {
		let tables = self.tables.read().await;
		let mut edges: Vec<Follow> =
			tables.follows.values().filter(|f| f.follower == user).cloned().collect();

		edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));

		Ok(edges)
	}

	async fn followers(&self, user: &str) -> StoreResult<Vec<Follow>> {
		let tables = self.tables.read().await;
		let mut edges: Vec<Follow> =
			tables.follows.values().filter(|f| f.followed == user).cloned().collect();

		edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));

		Ok(edges)
	}
}
impl PostStore for MemoryStore {
	async fn insert_post(&self, post: Post) -> StoreResult<Post> {
		self.tables.write().await.posts.insert(post.id, post.clone());

		Ok(post)
	}

	async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
		Ok(self.tables.read().await.posts.get(&id).cloned())
	}

	async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;

		if tables.posts.remove(&id).is_none() {
			return Ok(false);
		}

		tables.likes.retain(|(post_id, _), _| *post_id != id);

		Ok(true)
	}

	async fn insert_like(&self, like: Like) -> StoreResult<Like> {
		let mut tables = self.tables.write().await;
		let key = (like.post_id, like.user.clone());

		if tables.likes.contains_key(&key) {
			return Err(StoreError::UniqueViolation(UniqueField::LikePair));
		}

		tables.likes.insert(key, like.clone());

		Ok(like)
	}

	async fn delete_like(&self, post_id: Uuid, user: &str) -> StoreResult<bool> {
		Ok(self.tables.write().await.likes.remove(&(post_id, user.to_owned())).is_some())
	}

	async fn like_count(&self, post_id: Uuid) -> StoreResult<usize> {
		Ok(self.tables.read().await.likes.keys().filter(|(id, _)| *id == post_id).count())
	}
}
