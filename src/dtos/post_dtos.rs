use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::dtos::form_errors::FormErrors;
use crate::models::group::Group;
use crate::models::post::{Post, PostView};
use crate::models::user::UserPublic;
use crate::pagination::Page;

/// Post create/edit form, accepted as JSON or urlencoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    #[validate(length(min = 1, code = "required"))]
    pub text: String,
    /// Raw group choice; `None` for "no group". Resolved against the store
    /// when the form is cleaned.
    #[serde(default, deserialize_with = "optional_choice")]
    pub group: Option<String>,
}

impl PostForm {
    pub fn from_post(post: &Post) -> Self {
        PostForm {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
        }
    }
}

/// Output of a successfully cleaned `PostForm`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChoice {
    Id(i64),
    Text(String),
}

fn trimmed_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_string()).unwrap_or_default())
}

fn optional_choice<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawChoice> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawChoice::Id(id)) => Some(id.to_string()),
        Some(RawChoice::Text(s)) => {
            let s = s.trim();
            if s.is_empty() { None } else { Some(s.to_string()) }
        }
        None => None,
    })
}

/// Context for the create/edit form page.
#[derive(Debug, Serialize)]
pub struct PostFormContext {
    pub form: PostForm,
    pub errors: FormErrors,
    pub groups: Vec<Group>,
    pub is_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexContext {
    pub page: Page<PostView>,
}

#[derive(Debug, Serialize)]
pub struct GroupContext {
    pub group: Group,
    pub page: Page<PostView>,
}

#[derive(Debug, Serialize)]
pub struct ProfileContext {
    pub author: UserPublic,
    pub post_count: u64,
    pub page: Page<PostView>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailContext {
    pub post: PostView,
}
