use crate::catalog::Catalog;
use crate::persistence::JsonUserStore;
use crate::playback::{MediaRenderer, TracingRenderer};
use crate::user::{AuthManager, PlaylistManager, UserManager};
use std::sync::Arc;

use super::ServerConfig;

pub type GuardedCatalog = Arc<Catalog>;
pub type GuardedAuthManager = Arc<AuthManager>;
pub type GuardedPlaylistManager = Arc<PlaylistManager>;
pub type GuardedUserManager = Arc<UserManager>;

/// Builds the renderer of a new playback session, given the session label.
pub type RendererFactory = Arc<dyn Fn(&str) -> Box<dyn MediaRenderer> + Send + Sync>;

/// Services shared by every connection. Cheap to clone.
#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub catalog: GuardedCatalog,
    pub auth_manager: GuardedAuthManager,
    pub playlist_manager: GuardedPlaylistManager,
    pub user_manager: GuardedUserManager,
    pub renderer_factory: RendererFactory,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        catalog: Arc<Catalog>,
        user_store: Arc<JsonUserStore>,
        auth_manager: AuthManager,
    ) -> Self {
        let playlist_manager = PlaylistManager::new(catalog.clone(), user_store.clone());
        let user_manager = UserManager::new(user_store);
        ServerState {
            config,
            catalog,
            auth_manager: Arc::new(auth_manager),
            playlist_manager: Arc::new(playlist_manager),
            user_manager: Arc::new(user_manager),
            renderer_factory: Arc::new(|label: &str| {
                Box::new(TracingRenderer::new(label)) as Box<dyn MediaRenderer>
            }),
        }
    }

    pub fn with_renderer_factory(mut self, factory: RendererFactory) -> Self {
        self.renderer_factory = factory;
        self
    }

    pub fn make_renderer(&self, label: &str) -> Box<dyn MediaRenderer> {
        (self.renderer_factory)(label)
    }
}
