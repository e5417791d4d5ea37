use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Fixed set of social links. All six keys are always present on the stored
/// document; unset entries are empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default)]
    pub youtube: String,
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub facebook: String,
    #[serde(default)]
    pub github: String,
}

/// Work history entry. The id is server-generated at insertion time and is
/// the only handle for targeted removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub from: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub id: Uuid,
    pub school: String,
    pub degree: String,
    pub fieldofstudy: String,
    pub from: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One profile document per identity, keyed by owner. `extra` is the
/// extension bag for passthrough upsert fields (status, company, bio, ...)
/// that are not part of the fixed schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user: Uuid,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub social: SocialLinks,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn new(owner: Uuid) -> Self {
        Self {
            user: owner,
            website: String::new(),
            skills: Vec::new(),
            social: SocialLinks::default(),
            experience: Vec::new(),
            education: Vec::new(),
            image: None,
            extra: Map::new(),
        }
    }
}

/// Normalized field set written by a profile upsert. Only these fields (plus
/// the extension bag) are replaced; experience, education and image on an
/// existing document are left untouched.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub website: String,
    pub skills: Vec<String>,
    pub social: SocialLinks,
    pub extra: Map<String, Value>,
}

impl ProfileUpdate {
    /// Render as the partial document merged into the stored profile.
    pub fn into_document(self, owner: Uuid) -> Value {
        let mut doc = Map::new();
        doc.insert("user".into(), json!(owner));
        doc.insert("website".into(), json!(self.website));
        doc.insert("skills".into(), json!(self.skills));
        doc.insert("social".into(), json!(self.social));
        for (key, value) in self.extra {
            doc.insert(key, value);
        }
        Value::Object(doc)
    }
}

/// Display identity of a profile's owner.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerInfo {
    pub id: Uuid,
    pub name: String,
}

/// Profile as returned to clients: the raw document with the owner reference
/// expanded to `{id, name}` for display.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: OwnerInfo,
    pub website: String,
    pub skills: Vec<String>,
    pub social: SocialLinks,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileView {
    pub fn new(profile: Profile, owner_name: String) -> Self {
        Self {
            user: OwnerInfo {
                id: profile.user,
                name: owner_name,
            },
            website: profile.website,
            skills: profile.skills,
            social: profile.social,
            experience: profile.experience,
            education: profile.education,
            image: profile.image,
            extra: profile.extra,
        }
    }
}
