// Profiles and the user directory
use crate::error::ClientResult;
use crate::gateway::{DynAccountApi, Profile, ProfilePage};
use crate::model::{User, UserId};

/// Another user's profile with as many of their posts as have been paged in.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub profile: Profile,
    next: Option<String>,
}

impl UserProfile {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

impl From<ProfilePage> for UserProfile {
    fn from(page: ProfilePage) -> Self {
        Self {
            profile: page.profile,
            next: page.next,
        }
    }
}

pub struct ProfileService {
    api: DynAccountApi,
}

impl ProfileService {
    pub fn new(api: DynAccountApi) -> Self {
        Self { api }
    }

    /// The signed-in user's profile and posts.
    pub async fn own(&self) -> ClientResult<Profile> {
        self.api.profile().await
    }

    pub async fn of(&self, id: UserId) -> ClientResult<UserProfile> {
        Ok(self.api.user_profile(id, None).await?.into())
    }

    /// Append the next page of the user's posts. Returns how many were new.
    pub async fn load_more(&self, profile: &mut UserProfile) -> ClientResult<usize> {
        let Some(cursor) = profile.next.take() else {
            return Ok(0);
        };
        let page = match self.api.user_profile(profile.profile.user.id, Some(&cursor)).await {
            Ok(page) => page,
            Err(e) => {
                profile.next = Some(cursor);
                return Err(e);
            }
        };

        let posts = &mut profile.profile.posts;
        let before = posts.len();
        for post in page.profile.posts {
            if !posts.iter().any(|p| p.id == post.id) {
                posts.push(post);
            }
        }
        profile.next = page.next;
        Ok(posts.len() - before)
    }

    /// Everyone except `me`, ordered by username. Used as the chat contact list.
    pub async fn contacts(&self, me: UserId) -> ClientResult<Vec<User>> {
        let mut users: Vec<User> = self
            .api
            .users()
            .await?
            .into_iter()
            .filter(|u| u.id != me)
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}
