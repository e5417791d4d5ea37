use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::database::models::{
    Education, Experience, Profile, ProfileUpdate, ProfileView, SocialLinks,
};
use crate::database::store::{PostStore, ProfileStore, StoreError, UserStore};
use crate::error::ApiError;
use crate::storage::{ObjectStorage, StorageError};

/// Upsert payload. Fixed fields are destructured; everything else rides in
/// `rest` and passes through to the stored document's extension bag.
#[derive(Debug, Deserialize)]
pub struct ProfilePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Either an ordered list or a comma-separated string.
    #[serde(default)]
    pub skills: Option<Value>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ExperiencePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub current: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EducationPayload {
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub fieldofstudy: Option<String>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub current: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Result of an avatar upload: the profile with the URL attached, or just
/// the URL when the caller has no profile yet.
#[derive(Debug)]
pub enum AvatarUpload {
    Attached(ProfileView),
    Unattached { image: String },
}

#[derive(Debug, Error)]
pub enum ProfileServiceError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("There Is No Profile For This User")]
    MissingOwnProfile,

    #[error("There Is No Profile For the given User")]
    MissingUserProfile,

    #[error("No file uploaded")]
    EmptyUpload,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ProfileServiceError> for ApiError {
    fn from(err: ProfileServiceError) -> Self {
        match err {
            ProfileServiceError::Validation(errors) => ApiError::validation(errors),
            ProfileServiceError::MissingOwnProfile => {
                ApiError::bad_request("There Is No Profile For This User")
            }
            ProfileServiceError::MissingUserProfile => {
                ApiError::bad_request("There Is No Profile For the given User")
            }
            ProfileServiceError::EmptyUpload => ApiError::bad_request("No file uploaded"),
            ProfileServiceError::Store(e) => e.into(),
            ProfileServiceError::Storage(e) => e.into(),
        }
    }
}

// Fixed-schema keys that never enter the extension bag, so a passthrough
// field cannot shadow a typed one on the stored document.
const RESERVED_KEYS: &[&str] = &[
    "user",
    "website",
    "skills",
    "social",
    "experience",
    "education",
    "image",
];

/// Profile mutation and lookup. Every write is scoped to the identity the
/// authentication guard resolved, never to a client-supplied id.
pub struct ProfileService {
    users: Arc<dyn UserStore>,
    profiles: Arc<dyn ProfileStore>,
    posts: Arc<dyn PostStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl ProfileService {
    pub fn new(
        users: Arc<dyn UserStore>,
        profiles: Arc<dyn ProfileStore>,
        posts: Arc<dyn PostStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            users,
            profiles,
            posts,
            storage,
        }
    }

    /// Create or update the caller's profile. Validation runs before any
    /// write; a supplied display name propagates to the identity record.
    pub async fn upsert(
        &self,
        owner: Uuid,
        payload: ProfilePayload,
    ) -> Result<ProfileView, ProfileServiceError> {
        let mut errors = Vec::new();
        if !has_content(payload.rest.get("status")) {
            errors.push("Status is required".to_string());
        }
        let skills = normalize_skills(payload.skills.as_ref());
        if skills.is_empty() {
            errors.push("Skills is required".to_string());
        }
        if !errors.is_empty() {
            return Err(ProfileServiceError::Validation(errors));
        }

        let social = SocialLinks {
            youtube: normalize_link(payload.youtube.as_deref()),
            twitter: normalize_link(payload.twitter.as_deref()),
            instagram: normalize_link(payload.instagram.as_deref()),
            linkedin: normalize_link(payload.linkedin.as_deref()),
            facebook: normalize_link(payload.facebook.as_deref()),
            github: normalize_link(payload.github.as_deref()),
        };

        let mut extra = payload.rest;
        extra.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

        let update = ProfileUpdate {
            website: normalize_link(payload.website.as_deref()),
            skills,
            social,
            extra,
        };

        if let Some(name) = payload
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            self.users.set_name(owner, name).await?;
        }

        let profile = self.profiles.upsert(owner, update).await?;
        self.with_owner_name(profile).await
    }

    pub async fn own_profile(&self, owner: Uuid) -> Result<ProfileView, ProfileServiceError> {
        let profile = self
            .profiles
            .find_by_owner(owner)
            .await?
            .ok_or(ProfileServiceError::MissingOwnProfile)?;
        self.with_owner_name(profile).await
    }

    pub async fn profile_for(&self, user_id: Uuid) -> Result<ProfileView, ProfileServiceError> {
        let profile = self
            .profiles
            .find_by_owner(user_id)
            .await?
            .ok_or(ProfileServiceError::MissingUserProfile)?;
        self.with_owner_name(profile).await
    }

    pub async fn all_profiles(&self) -> Result<Vec<ProfileView>, ProfileServiceError> {
        let mut views = Vec::new();
        for profile in self.profiles.list().await? {
            views.push(self.with_owner_name(profile).await?);
        }
        Ok(views)
    }

    /// Remove the identity's posts, profile, and account record. The three
    /// deletions run concurrently and independently; a failure surfaces once
    /// and nothing is rolled back.
    pub async fn delete_account(&self, owner: Uuid) -> Result<(), ProfileServiceError> {
        let (removed_posts, _, _) = tokio::try_join!(
            self.posts.delete_by_owner(owner),
            self.profiles.delete_by_owner(owner),
            self.users.delete(owner),
        )?;
        tracing::info!(%owner, removed_posts, "account deleted");
        Ok(())
    }

    /// Store the avatar buffer remotely, then attach the returned URL to the
    /// caller's profile. A storage failure leaves the profile untouched.
    pub async fn attach_avatar(
        &self,
        owner: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<AvatarUpload, ProfileServiceError> {
        if data.is_empty() {
            return Err(ProfileServiceError::EmptyUpload);
        }

        let image_url = self.storage.put(data, content_type).await?;

        match self.profiles.set_image(owner, &image_url).await? {
            Some(profile) => Ok(AvatarUpload::Attached(self.with_owner_name(profile).await?)),
            None => Ok(AvatarUpload::Unattached { image: image_url }),
        }
    }

    /// Add a work-history entry at the front of the list (most-recent-first).
    /// The caller must already own a profile; there is no implicit creation.
    pub async fn add_experience(
        &self,
        owner: Uuid,
        payload: ExperiencePayload,
    ) -> Result<ProfileView, ProfileServiceError> {
        let mut errors = Vec::new();
        let title = required_field(payload.title, "Title is required", &mut errors);
        let company = required_field(payload.company, "Company is required", &mut errors);
        let from = validate_date_range(payload.from, payload.to, &mut errors);
        if !errors.is_empty() {
            return Err(ProfileServiceError::Validation(errors));
        }

        let entry = Experience {
            id: Uuid::new_v4(),
            title,
            company,
            location: payload.location,
            from,
            to: payload.to,
            current: payload.current,
            description: payload.description,
        };

        let profile = self
            .profiles
            .push_experience(owner, entry)
            .await?
            .ok_or(ProfileServiceError::MissingOwnProfile)?;
        self.with_owner_name(profile).await
    }

    /// Remove the experience entry with the given id. A non-matching id is a
    /// no-op returning the unchanged profile.
    pub async fn remove_experience(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<ProfileView, ProfileServiceError> {
        let profile = self
            .profiles
            .remove_experience(owner, entry_id)
            .await?
            .ok_or(ProfileServiceError::MissingOwnProfile)?;
        self.with_owner_name(profile).await
    }

    pub async fn add_education(
        &self,
        owner: Uuid,
        payload: EducationPayload,
    ) -> Result<ProfileView, ProfileServiceError> {
        let mut errors = Vec::new();
        let school = required_field(payload.school, "School is required", &mut errors);
        let degree = required_field(payload.degree, "Degree is required", &mut errors);
        let fieldofstudy =
            required_field(payload.fieldofstudy, "Field of study is required", &mut errors);
        let from = validate_date_range(payload.from, payload.to, &mut errors);
        if !errors.is_empty() {
            return Err(ProfileServiceError::Validation(errors));
        }

        let entry = Education {
            id: Uuid::new_v4(),
            school,
            degree,
            fieldofstudy,
            from,
            to: payload.to,
            current: payload.current,
            description: payload.description,
        };

        let profile = self
            .profiles
            .push_education(owner, entry)
            .await?
            .ok_or(ProfileServiceError::MissingOwnProfile)?;
        self.with_owner_name(profile).await
    }

    /// Remove the education entry with the given id, filtering the education
    /// list. Same no-op-on-miss semantics as experience removal.
    pub async fn remove_education(
        &self,
        owner: Uuid,
        entry_id: Uuid,
    ) -> Result<ProfileView, ProfileServiceError> {
        let profile = self
            .profiles
            .remove_education(owner, entry_id)
            .await?
            .ok_or(ProfileServiceError::MissingOwnProfile)?;
        self.with_owner_name(profile).await
    }

    async fn with_owner_name(&self, profile: Profile) -> Result<ProfileView, ProfileServiceError> {
        let name = self
            .users
            .find_by_id(profile.user)
            .await?
            .map(|user| user.name)
            .unwrap_or_default();
        Ok(ProfileView::new(profile, name))
    }
}

fn has_content(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Skills arrive either as an ordered list (kept as-is) or a comma-separated
/// string (split and trimmed). Order is preserved, duplicates are kept.
fn normalize_skills(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            s.split(',').map(|skill| skill.trim().to_string()).collect()
        }
        _ => Vec::new(),
    }
}

/// Canonicalize to an https-preferred absolute URL; empty input stays the
/// empty string. Input that does not parse as a URL is kept verbatim rather
/// than rejected.
fn normalize_link(raw: Option<&str>) -> String {
    let trimmed = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return String::new(),
    };

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&candidate) {
        Ok(mut url) => {
            if url.scheme() == "http" {
                let _ = url.set_scheme("https");
            }
            let mut normalized = url.to_string();
            // A bare host parses to a trailing "/"; drop it.
            if url.path() == "/" && url.query().is_none() && url.fragment().is_none() {
                normalized.pop();
            }
            normalized
        }
        Err(_) => trimmed.to_string(),
    }
}

fn required_field(value: Option<String>, message: &str, errors: &mut Vec<String>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.push(message.to_string());
            String::new()
        }
    }
}

/// `from` is required, and when `to` is present it must come strictly after.
fn validate_date_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    errors: &mut Vec<String>,
) -> NaiveDate {
    const MESSAGE: &str = "From date is required and needs to be from the past";
    match from {
        Some(from) => {
            if to.is_some_and(|to| from >= to) {
                errors.push(MESSAGE.to_string());
            }
            from
        }
        None => {
            errors.push(MESSAGE.to_string());
            NaiveDate::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn service() -> ProfileService {
        let store = Arc::new(MemoryStore::new());
        ProfileService::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(MemoryStorage::new()),
        )
    }

    fn upsert_payload(skills: Value) -> ProfilePayload {
        serde_json::from_value(json!({
            "status": "Developer",
            "skills": skills,
        }))
        .unwrap()
    }

    #[test]
    fn normalize_link_prefers_https() {
        assert_eq!(normalize_link(Some("example.com")), "https://example.com");
        assert_eq!(
            normalize_link(Some("http://example.com/a")),
            "https://example.com/a"
        );
        assert_eq!(
            normalize_link(Some("https://example.com")),
            "https://example.com"
        );
        assert_eq!(normalize_link(Some("  ")), "");
        assert_eq!(normalize_link(None), "");
    }

    #[test]
    fn skills_string_splits_and_trims_in_order() {
        let skills = normalize_skills(Some(&json!("a, b ,c")));
        assert_eq!(skills, vec!["a", "b", "c"]);
    }

    #[test]
    fn skills_list_is_kept_as_is() {
        let skills = normalize_skills(Some(&json!(["a", "b", "a"])));
        assert_eq!(skills, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn upsert_validation_failure_writes_nothing() {
        let service = service();
        let owner = Uuid::new_v4();
        let payload: ProfilePayload = serde_json::from_value(json!({})).unwrap();

        let err = service.upsert(owner, payload).await.unwrap_err();
        match err {
            ProfileServiceError::Validation(errors) => {
                assert_eq!(errors, vec!["Status is required", "Skills is required"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            service.own_profile(owner).await.unwrap_err(),
            ProfileServiceError::MissingOwnProfile
        ));
    }

    #[tokio::test]
    async fn upsert_passes_unknown_fields_through() {
        let service = service();
        let owner = Uuid::new_v4();
        let payload: ProfilePayload = serde_json::from_value(json!({
            "status": "Developer",
            "skills": "rust",
            "bio": "hello",
            "experience": "cannot shadow the typed list",
        }))
        .unwrap();

        let view = service.upsert(owner, payload).await.unwrap();
        assert_eq!(view.extra["status"], "Developer");
        assert_eq!(view.extra["bio"], "hello");
        // Reserved keys never enter the extension bag.
        assert!(view.experience.is_empty());
        assert!(!view.extra.contains_key("experience"));
    }

    #[tokio::test]
    async fn add_experience_rejects_inverted_date_range() {
        let service = service();
        let owner = Uuid::new_v4();
        service
            .upsert(owner, upsert_payload(json!("rust")))
            .await
            .unwrap();

        let payload: ExperiencePayload = serde_json::from_value(json!({
            "title": "Engineer",
            "company": "Acme",
            "from": "2024-05-01",
            "to": "2023-01-01",
        }))
        .unwrap();
        let err = service.add_experience(owner, payload).await.unwrap_err();
        assert!(matches!(err, ProfileServiceError::Validation(_)));

        let view = service.own_profile(owner).await.unwrap();
        assert!(view.experience.is_empty());
    }

    struct BrokenStorage;

    #[async_trait::async_trait]
    impl ObjectStorage for BrokenStorage {
        async fn put(&self, _data: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
            Err(StorageError::Upload("endpoint unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn storage_failure_leaves_the_profile_untouched() {
        let store = Arc::new(MemoryStore::new());
        let service = ProfileService::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(BrokenStorage),
        );
        let owner = Uuid::new_v4();
        service
            .upsert(owner, upsert_payload(json!("rust")))
            .await
            .unwrap();

        let err = service
            .attach_avatar(owner, vec![1, 2, 3], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileServiceError::Storage(_)));

        let view = service.own_profile(owner).await.unwrap();
        assert!(view.image.is_none());
    }

    #[tokio::test]
    async fn concurrent_upserts_resolve_to_one_whole_document() {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(ProfileService::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(MemoryStorage::new()),
        ));
        let owner = Uuid::new_v4();

        let first: ProfilePayload = serde_json::from_value(json!({
            "status": "Developer",
            "skills": "rust",
            "website": "https://a.example",
        }))
        .unwrap();
        let second: ProfilePayload = serde_json::from_value(json!({
            "status": "Designer",
            "skills": "figma",
            "website": "https://b.example",
        }))
        .unwrap();

        let a = tokio::spawn({
            let service = service.clone();
            async move { service.upsert(owner, first).await }
        });
        let b = tokio::spawn({
            let service = service.clone();
            async move { service.upsert(owner, second).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Whichever write lands last wins wholesale; fields from the two
        // payloads never interleave.
        let view = service.own_profile(owner).await.unwrap();
        let outcome = (
            view.extra["status"].as_str().unwrap(),
            view.skills.as_slice(),
            view.website.as_str(),
        );
        assert!(
            outcome == ("Developer", &["rust".to_string()][..], "https://a.example")
                || outcome == ("Designer", &["figma".to_string()][..], "https://b.example"),
            "interleaved document: {outcome:?}"
        );
    }

    #[tokio::test]
    async fn delete_account_removes_posts_profile_and_identity() {
        let store = Arc::new(MemoryStore::new());
        let service = ProfileService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MemoryStorage::new()),
        );

        let user = crate::database::models::User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        );
        let owner = user.id;
        UserStore::insert(store.as_ref(), user).await.unwrap();
        service
            .upsert(owner, upsert_payload(json!("rust")))
            .await
            .unwrap();
        let post = crate::database::models::Post {
            id: Uuid::new_v4(),
            user: owner,
            text: "hello".to_string(),
            name: None,
            likes: vec![],
            comments: vec![],
            date: chrono::Utc::now(),
        };
        PostStore::insert(store.as_ref(), post).await.unwrap();

        service.delete_account(owner).await.unwrap();

        assert_eq!(store.count_by_owner(owner).await.unwrap(), 0);
        assert!(store.find_by_id(owner).await.unwrap().is_none());
        assert!(matches!(
            service.own_profile(owner).await.unwrap_err(),
            ProfileServiceError::MissingOwnProfile
        ));
    }

    #[tokio::test]
    async fn add_experience_without_profile_fails() {
        let service = service();
        let payload: ExperiencePayload = serde_json::from_value(json!({
            "title": "Engineer",
            "company": "Acme",
            "from": "2020-01-01",
        }))
        .unwrap();
        let err = service
            .add_experience(Uuid::new_v4(), payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileServiceError::MissingOwnProfile));
    }
}
