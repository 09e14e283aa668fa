//! Directed follow edges with per-edge mute and block flags.

// self
use crate::{
	_prelude::*,
	error::Conflict,
	store::{Follow, FollowStore},
};

/// Partial flag update; `None` leaves a flag as it is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlagUpdate {
	/// New mute state.
	pub is_muted: Option<bool>,
	/// New block state.
	pub is_blocked: Option<bool>,
}
impl FlagUpdate {
	fn apply(self, follow: &mut Follow) -> bool {
		let mut changed = false;

		if let Some(muted) = self.is_muted
			&& follow.is_muted != muted
		{
			follow.is_muted = muted;
			changed = true;
		}
		if let Some(blocked) = self.is_blocked
			&& follow.is_blocked != blocked
		{
			follow.is_blocked = blocked;
			changed = true;
		}

		changed
	}
}

/// Manages follow edges between users identified by external id.
#[derive(Debug)]
pub struct FollowService<S> {
	store: Arc<S>,
}
impl<S> FollowService<S>
where
	S: FollowStore,
{
	/// Create the service.
	pub fn new(store: Arc<S>) -> Self {
		Self { store }
	}

	/// Start following `followed`.
	#[tracing::instrument(skip(self))]
	pub async fn follow(&self, follower: &str, followed: &str) -> Result<Follow> {
		reject_self(follower, followed, "You cannot follow yourself.")?;

		if self.store.find_follow(follower, followed).await?.is_some() {
			return Err(Conflict::AlreadyFollowing.into());
		}

		// The store's pair constraint settles concurrent inserts.
		let follow = self.store.insert_follow(Follow::new(follower, followed)).await?;

		tracing::debug!("follow edge created");

		Ok(follow)
	}

	/// Stop following `followed`.
	#[tracing::instrument(skip(self))]
	pub async fn unfollow(&self, follower: &str, followed: &str) -> Result<()> {
		reject_self(follower, followed, "You cannot unfollow yourself.")?;

		if !self.store.delete_follow(follower, followed).await? {
			return Err(Conflict::NotFollowing.into());
		}

		tracing::debug!("follow edge removed");

		Ok(())
	}

	/// Apply the provided flags to an existing edge; returns whether anything changed.
	#[tracing::instrument(skip(self))]
	pub async fn update_flags(
		&self,
		follower: &str,
		followed: &str,
		update: FlagUpdate,
	) -> Result<bool> {
		let mut follow = self
			.store
			.find_follow(follower, followed)
			.await?
			.ok_or(Error::Conflict(Conflict::RelationshipNotFound))?;

		if !update.apply(&mut follow) {
			return Ok(false);
		}
		if !self.store.save_follow(&follow).await? {
			// Removed between the read and the write.
			return Err(Conflict::RelationshipNotFound.into());
		}

		Ok(true)
	}

	/// Set the mute flag.
	pub async fn mute(&self, follower: &str, followed: &str, muted: bool) -> Result<bool> {
		self.update_flags(follower, followed, FlagUpdate { is_muted: Some(muted), is_blocked: None })
			.await
	}

	/// Set the block flag.
	pub async fn block(&self, follower: &str, followed: &str, blocked: bool) -> Result<bool> {
		self.update_flags(follower, followed, FlagUpdate {
			is_muted: None,
			is_blocked: Some(blocked),
		})
		.await
	}

	/// Edges where `user` follows someone.
	pub async fn following(&self, user: &str) -> Result<Vec<Follow>> {
		Ok(self.store.following(user).await?)
	}

	/// Edges where someone follows `user`.
	pub async fn followers(&self, user: &str) -> Result<Vec<Follow>> {
		Ok(self.store.followers(user).await?)
	}
}

fn reject_self(follower: &str, followed: &str, message: &str) -> Result<()> {
	if follower == followed { Err(Error::validation("user_id", message)) } else { Ok(()) }
}
