use serde::Deserialize;
use validator::Validate;

/// Admin form for creating a group.
#[derive(Debug, Deserialize, Validate)]
pub struct GroupForm {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 50))]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}
