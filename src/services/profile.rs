use std::sync::Arc;
use validator::Validate;

use crate::domain::aggregates::{User, UserProfile};
use crate::store::CommerceStore;
use crate::Result;

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn CommerceStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn CommerceStore>) -> Self { Self { store } }

    pub async fn get(&self, user: &User) -> Result<UserProfile> {
        Ok(self.store.find_profile(user.id).await?.unwrap_or_else(|| UserProfile::empty(user.id)))
    }

    pub async fn update(&self, user: &User, mut profile: UserProfile) -> Result<UserProfile> {
        profile.user_id = user.id;
        profile.validate()?;
        self.store.save_profile(&profile).await?;
        Ok(profile)
    }
}
