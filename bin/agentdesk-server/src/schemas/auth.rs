use agentdesk_core::entities::UserProfile;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    /// Accepted for form compatibility; never checked.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileDeleted {
    pub deleted: bool,
}

impl LoginResponse {
    pub fn new(user: &UserProfile, token: &str) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            token: token.to_owned(),
        }
    }
}
