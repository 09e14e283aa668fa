//! Short-form posts and likes.

// crates.io
use serde::Serialize;
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	error::ValidationErrors,
	store::{Like, Post, PostStore, StoreError, UniqueField},
	validation,
};

/// Like state after a toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LikeState {
	/// Whether the caller now likes the post.
	pub liked: bool,
	/// Total likes on the post.
	pub likes: usize,
}

/// Post authoring and likes.
#[derive(Debug)]
pub struct PostService<S> {
	store: Arc<S>,
}
impl<S> PostService<S>
where
	S: PostStore,
{
	/// Create the service.
	pub fn new(store: Arc<S>) -> Self {
		Self { store }
	}

	/// Publish a post after validating its content.
	pub async fn create_post(&self, author: &str, content: &str) -> Result<Post> {
		validation::check_content(content).map_err(ValidationErrors::from)?;

		let post = Post {
			id: Uuid::new_v4(),
			author: author.to_owned(),
			content: content.to_owned(),
			created_at: Utc::now(),
		};

		Ok(self.store.insert_post(post).await?)
	}

	/// Delete one of the caller's posts.
	#[tracing::instrument(skip(self))]
	pub async fn delete_post(&self, user: &str, post_id: Uuid) -> Result<()> {
		let post = self.find(post_id).await?;

		if post.author != user {
			return Err(Error::Forbidden("You can only delete your own posts.".into()));
		}

		self.store.delete_post(post_id).await?;

		Ok(())
	}

	/// Like the post, or unlike it when already liked.
	pub async fn toggle_like(&self, user: &str, post_id: Uuid) -> Result<LikeState> {
		self.find(post_id).await?;

		let liked = if self.store.delete_like(post_id, user).await? {
			false
		} else {
			let like = Like { post_id, user: user.to_owned(), created_at: Utc::now() };

			match self.store.insert_like(like).await {
				// Lost a race against a concurrent like from the same user.
				Ok(_) | Err(StoreError::UniqueViolation(UniqueField::LikePair)) => true,
				Err(e) => return Err(e.into()),
			}
		};

		Ok(LikeState { liked, likes: self.store.like_count(post_id).await? })
	}

	async fn find(&self, post_id: Uuid) -> Result<Post> {
		self.store
			.find_post(post_id)
			.await?
			.ok_or_else(|| Error::NotFound { resource: "post", id: post_id.to_string() })
	}
}
