//! Application state shared across handlers

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::SessionConfig;
use crate::password::CredentialHasher;
use crate::session::SessionManager;
use crate::storage::{AccountStore, Backend, CatalogStore, QuizStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub quizzes: Arc<dyn QuizStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub sessions: SessionManager,
    pub hasher: CredentialHasher,
    pub session_config: Arc<SessionConfig>,
}

impl AppState {
    pub fn new(
        backend: Backend,
        sessions: SessionManager,
        hasher: CredentialHasher,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            accounts: backend.accounts,
            quizzes: backend.quizzes,
            catalog: backend.catalog,
            sessions,
            hasher,
            session_config: Arc::new(session_config),
        }
    }

    /// Session id presented by the client, if any
    pub fn session_id(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.session_config.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|sid| !sid.is_empty())
    }

    /// Cookie carrying a freshly issued session id
    pub fn session_cookie(&self, sid: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.session_config.ttl_seconds).unwrap_or(i64::MAX);
        self.build_cookie(sid, time::Duration::seconds(max_age))
    }

    /// Cookie telling the client to drop its session id
    pub fn expired_session_cookie(&self) -> Cookie<'static> {
        self.build_cookie(String::new(), time::Duration::ZERO)
    }

    fn build_cookie(&self, value: String, max_age: time::Duration) -> Cookie<'static> {
        Cookie::build((self.session_config.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.session_config.secure_cookie)
            .max_age(max_age)
            .build()
    }
}
