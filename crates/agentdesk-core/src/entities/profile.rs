use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::error::{CoreError, CoreResult};
use crate::store::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: i64,
    pub username: String,
    pub nickname: String,
    pub phone: String,
    pub bio: String,
    pub avatar_url: String,
}

impl UserProfile {
    pub fn default_admin() -> Self {
        Self {
            user_id: 1,
            username: "admin".to_owned(),
            nickname: "Administrator".to_owned(),
            phone: "13800000000".to_owned(),
            bio: "System administrator".to_owned(),
            avatar_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub title: String,
    pub path: String,
    pub icon: String,
    pub permission: String,
    pub sort_order: i32,
}

impl MenuItem {
    fn new(title: &str, path: &str, icon: &str, permission: &str, sort_order: i32) -> Self {
        Self {
            title: title.to_owned(),
            path: path.to_owned(),
            icon: icon.to_owned(),
            permission: permission.to_owned(),
            sort_order,
        }
    }

    /// Navigation entries of the console, in display order.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("Home", "/home", "House", "home:view", 1),
            Self::new("Apps", "/home/apps", "Grid", "apps:view", 2),
            Self::new("Agents", "/home/agents", "Grid", "agents:view", 3),
            Self::new("Profile", "/home/profile", "User", "profile:view", 9),
        ]
    }
}

/// Patch for the signed-in user's profile.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

pub trait ProfileStore: Send + Sync + 'static {
    /// Resolve the user for a login attempt; unknown names fall back to the
    /// default user.
    fn login(&self, username: Option<&str>) -> impl Future<Output = CoreResult<UserProfile>> + Send;
    fn profile(&self) -> impl Future<Output = CoreResult<UserProfile>> + Send;
    fn update_profile(
        &self,
        req: UpdateProfileRequest,
    ) -> impl Future<Output = CoreResult<UserProfile>> + Send;
    fn menus(&self) -> impl Future<Output = CoreResult<Vec<MenuItem>>> + Send;
}

impl ProfileStore for MemoryStore {
    async fn login(&self, username: Option<&str>) -> CoreResult<UserProfile> {
        let data = self.lock().await;
        let user = username
            .and_then(|name| data.users.iter().find(|u| u.username == name))
            .or_else(|| data.users.first())
            .cloned()
            .ok_or_else(|| CoreError::Internal("no users configured".to_owned()))?;
        debug!(user_id = user.user_id, username = %user.username, "login");
        Ok(user)
    }

    async fn profile(&self) -> CoreResult<UserProfile> {
        let data = self.lock().await;
        data.users
            .first()
            .cloned()
            .ok_or_else(|| CoreError::Internal("no users configured".to_owned()))
    }

    async fn update_profile(&self, req: UpdateProfileRequest) -> CoreResult<UserProfile> {
        let mut data = self.lock().await;
        let user = data
            .users
            .first_mut()
            .ok_or_else(|| CoreError::Internal("no users configured".to_owned()))?;
        if let Some(nickname) = req.nickname {
            user.nickname = nickname;
        }
        if let Some(phone) = req.phone {
            user.phone = phone;
        }
        if let Some(bio) = req.bio {
            user.bio = bio;
        }
        if let Some(avatar_url) = req.avatar_url {
            user.avatar_url = avatar_url;
        }
        Ok(user.clone())
    }

    async fn menus(&self) -> CoreResult<Vec<MenuItem>> {
        let data = self.lock().await;
        let mut menus = data.menus.clone();
        menus.sort_by_key(|m| m.sort_order);
        Ok(menus)
    }
}
