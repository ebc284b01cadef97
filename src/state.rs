use std::sync::Arc;

use crate::auth::{Authenticator, LoginPolicy, UserContext};
use crate::config::Config;
use crate::db;
use crate::error::ClientResult;
use crate::feed::FeedSynchronizer;
use crate::gateway::HttpGateway;
use crate::notifications::NotificationFeed;
use crate::posts::PostService;
use crate::profile::ProfileService;
use crate::reactions::ReactionToggler;
use crate::session::{DynSessionStore, SqliteSessionStore};
use crate::store::Store;
use crate::surveys::SurveyService;
use crate::upload::ImageUploader;

/// Everything a command needs, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: DynSessionStore,
    pub store: Store,
    pub user: UserContext,
    pub gateway: Arc<HttpGateway>,
    pub auth: Arc<Authenticator>,
    pub feed: Arc<FeedSynchronizer>,
    pub reactions: Arc<ReactionToggler>,
    pub posts: Arc<PostService>,
    pub surveys: Arc<SurveyService>,
    pub notifications: Arc<NotificationFeed>,
    pub profiles: Arc<ProfileService>,
    pub uploader: Arc<ImageUploader>,
}

impl AppState {
    /// Open the on-disk session store named by `config` and wire the services over it.
    pub fn open(config: Config) -> ClientResult<Self> {
        let pool = db::create_pool(config.session_db_path()?)?;
        db::run_migrations(&pool)?;
        Self::with_session(config, Arc::new(SqliteSessionStore::new(pool)))
    }

    pub fn with_session(config: Config, session: DynSessionStore) -> ClientResult<Self> {
        let gateway = Arc::new(HttpGateway::from_config(&config, session.clone())?);
        let store = Store::default();
        let user = UserContext::default();

        let auth = Arc::new(Authenticator::new(
            gateway.clone(),
            session.clone(),
            user.clone(),
            LoginPolicy::from_config(&config.auth),
        ));

        Ok(Self {
            feed: Arc::new(FeedSynchronizer::new(gateway.clone(), store.clone())),
            reactions: Arc::new(ReactionToggler::new(gateway.clone(), store.clone())),
            posts: Arc::new(PostService::new(gateway.clone(), store.clone(), user.clone())),
            surveys: Arc::new(SurveyService::new(gateway.clone(), store.clone(), user.clone())),
            notifications: Arc::new(NotificationFeed::new(gateway.clone())),
            profiles: Arc::new(ProfileService::new(gateway.clone())),
            uploader: Arc::new(ImageUploader::new(&config.upload)),
            auth,
            gateway,
            session,
            store,
            user,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigArgs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_session_store_and_starts_signed_out() {
        let temp_dir = TempDir::new().unwrap();
        let args = ConfigArgs {
            data_dir: Some(temp_dir.path().to_path_buf()),
            base_url: Some("http://127.0.0.1:9".into()),
            ..Default::default()
        };
        let state = AppState::open(Config::load(&args).unwrap()).unwrap();

        assert!(temp_dir.path().join("session.db").exists());
        assert_eq!(state.gateway.base_url().as_str(), "http://127.0.0.1:9/");
        assert!(state.auth.restore().await.unwrap().is_none());
        assert!(state.user.current().is_none());
        assert!(state.store.read(|s| s.loading));
    }
}
