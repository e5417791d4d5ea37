use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Education, Experience, Post, Profile, ProfileUpdate, User};

/// Errors from the persistence collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("stored document is malformed: {0}")]
    Document(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Identity records, keyed by id with unique emails.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Display-name side effect of a profile upsert.
    async fn set_name(&self, id: Uuid, name: &str) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Keyed document store: one profile per owner, upserted by owner identity,
/// never by a client-supplied document id.
///
/// Entry mutations are atomic per owner: a push prepends (most-recent-first)
/// and a remove excludes exactly the entry with the matching id, returning
/// the unchanged document when nothing matches. All mutating operations
/// return `None` when the owner has no profile.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_owner(&self, owner: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn list(&self) -> Result<Vec<Profile>, StoreError>;

    /// Merge the supplied fields into the owner's document, creating it when
    /// absent. Fields not named by the update are left untouched.
    async fn upsert(&self, owner: Uuid, update: ProfileUpdate) -> Result<Profile, StoreError>;

    async fn set_image(&self, owner: Uuid, url: &str) -> Result<Option<Profile>, StoreError>;

    async fn push_experience(
        &self,
        owner: Uuid,
        entry: Experience,
    ) -> Result<Option<Profile>, StoreError>;

    async fn remove_experience(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<Option<Profile>, StoreError>;

    async fn push_education(
        &self,
        owner: Uuid,
        entry: Education,
    ) -> Result<Option<Profile>, StoreError>;

    async fn remove_education(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<Option<Profile>, StoreError>;

    async fn delete_by_owner(&self, owner: Uuid) -> Result<(), StoreError>;
}

/// Posts participate only in the account-deletion cascade; there is no post
/// API surface, so the trait carries just what the cascade and its
/// verification need.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(&self, post: Post) -> Result<(), StoreError>;

    async fn count_by_owner(&self, owner: Uuid) -> Result<u64, StoreError>;

    /// Delete every post owned by the identity, returning the removed count.
    async fn delete_by_owner(&self, owner: Uuid) -> Result<u64, StoreError>;
}
