use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Education, Experience, Post, Profile, ProfileUpdate, User};
use super::store::{PostStore, ProfileStore, StoreError, UserStore};

/// In-memory backend over all three collections.
///
/// Backs local development runs without a DATABASE_URL and the integration
/// tests. Mutations take the write lock for their whole read-modify-write,
/// so per-owner entry operations are atomic here just as in the Postgres
/// backend.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    profiles: RwLock<HashMap<Uuid, Profile>>,
    posts: RwLock<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_name(&self, id: Uuid, name: &str) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.name = name.to_string();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.users.write().await.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_by_owner(&self, owner: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.read().await.get(&owner).cloned())
    }

    async fn list(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.profiles.read().await.values().cloned().collect())
    }

    async fn upsert(&self, owner: Uuid, update: ProfileUpdate) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.entry(owner).or_insert_with(|| Profile::new(owner));
        profile.website = update.website;
        profile.skills = update.skills;
        profile.social = update.social;
        for (key, value) in update.extra {
            profile.extra.insert(key, value);
        }
        Ok(profile.clone())
    }

    async fn set_image(&self, owner: Uuid, url: &str) -> Result<Option<Profile>, StoreError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&owner).map(|profile| {
            profile.image = Some(url.to_string());
            profile.clone()
        }))
    }

    async fn push_experience(
        &self,
        owner: Uuid,
        entry: Experience,
    ) -> Result<Option<Profile>, StoreError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&owner).map(|profile| {
            profile.experience.insert(0, entry);
            profile.clone()
        }))
    }

    async fn remove_experience(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<Option<Profile>, StoreError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&owner).map(|profile| {
            profile.experience.retain(|entry| entry.id != entry_id);
            profile.clone()
        }))
    }

    async fn push_education(
        &self,
        owner: Uuid,
        entry: Education,
    ) -> Result<Option<Profile>, StoreError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&owner).map(|profile| {
            profile.education.insert(0, entry);
            profile.clone()
        }))
    }

    async fn remove_education(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<Option<Profile>, StoreError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&owner).map(|profile| {
            profile.education.retain(|entry| entry.id != entry_id);
            profile.clone()
        }))
    }

    async fn delete_by_owner(&self, owner: Uuid) -> Result<(), StoreError> {
        self.profiles.write().await.remove(&owner);
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert(&self, post: Post) -> Result<(), StoreError> {
        self.posts.write().await.push(post);
        Ok(())
    }

    async fn count_by_owner(&self, owner: Uuid) -> Result<u64, StoreError> {
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .filter(|post| post.user == owner)
            .count() as u64)
    }

    async fn delete_by_owner(&self, owner: Uuid) -> Result<u64, StoreError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|post| post.user != owner);
        Ok((before - posts.len()) as u64)
    }
}
