//! In-memory store
//!
//! Everything lives behind one `RwLock`, so each trait call is atomic with
//! respect to the others. Data is lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, CatalogStore, QuizStore, StoreError, StoreResult};
use crate::models::{
    Language, NewLanguage, NewQuiz, NewQuizResult, NewStatus, NewUser, Quiz, QuizResult, Status,
    UpdateUser, User, UserField, catalog,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    quizzes: HashMap<Uuid, Quiz>,
    results: HashMap<Uuid, QuizResult>,
    statuses: Vec<Status>,
    languages: Vec<Language>,
}

impl Inner {
    /// Whether a user other than `except` already holds `value` in `field`
    fn conflict(&self, field: UserField, value: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .filter(|u| Some(u.id) != except)
            .any(|u| field.of(u).to_lowercase() == value.to_lowercase())
    }

    fn push_status(&mut self, new_status: NewStatus) -> Status {
        let status = Status {
            id: Uuid::new_v4(),
            name: new_status.name,
            description: new_status.description,
            color: new_status.color,
            created_at: Utc::now(),
        };
        self.statuses.push(status.clone());
        status
    }

    fn push_language(&mut self, new_language: NewLanguage) -> Language {
        let language = Language {
            id: Uuid::new_v4(),
            name: new_language.name,
            count: new_language.count,
            percentage: new_language.percentage,
        };
        self.languages.push(language.clone());
        language
    }
}

/// Map-backed implementation of every store trait
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the sample statuses and languages
    pub fn seeded() -> Self {
        let mut inner = Inner::default();
        for status in catalog::seed_statuses() {
            inner.push_status(status);
        }
        for language in catalog::seed_languages() {
            inner.push_language(language);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_field(&self, field: UserField, value: &str) -> StoreResult<Option<User>> {
        let needle = value.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| field.of(u).to_lowercase() == needle)
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;

        if inner.conflict(UserField::Username, &new_user.username, None) {
            return Err(StoreError::DuplicateKey(UserField::Username));
        }
        if inner.conflict(UserField::Email, &new_user.email, None) {
            return Err(StoreError::DuplicateKey(UserField::Email));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            profile_picture: None,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;

        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if let Some(username) = &changes.username {
            if inner.conflict(UserField::Username, username, Some(id)) {
                return Err(StoreError::DuplicateKey(UserField::Username));
            }
        }
        if let Some(email) = &changes.email {
            if inner.conflict(UserField::Email, email, Some(id)) {
                return Err(StoreError::DuplicateKey(UserField::Email));
            }
        }

        // Checked above; nothing can remove the entry while the write lock is held
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(picture) = changes.profile_picture {
            user.profile_picture = Some(picture);
        }
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        match self.inner.write().await.users.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn create_quiz(&self, new_quiz: NewQuiz) -> StoreResult<Quiz> {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            name: new_quiz.name,
            category: new_quiz.category,
            created_by: new_quiz.created_by,
            created_at: Utc::now(),
        };
        self.inner
            .write()
            .await
            .quizzes
            .insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn list_quizzes(&self) -> StoreResult<Vec<Quiz>> {
        let mut quizzes: Vec<Quiz> = self.inner.read().await.quizzes.values().cloned().collect();
        quizzes.sort_by_key(|q| q.created_at);
        Ok(quizzes)
    }

    async fn find_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>> {
        Ok(self.inner.read().await.quizzes.get(&id).cloned())
    }

    async fn list_quizzes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Quiz>> {
        let mut quizzes: Vec<Quiz> = self
            .inner
            .read()
            .await
            .quizzes
            .values()
            .filter(|q| q.created_by == user_id)
            .cloned()
            .collect();
        quizzes.sort_by_key(|q| q.created_at);
        Ok(quizzes)
    }

    async fn create_result(&self, new_result: NewQuizResult) -> StoreResult<QuizResult> {
        let mut inner = self.inner.write().await;
        if !inner.quizzes.contains_key(&new_result.quiz_id) {
            return Err(StoreError::NotFound);
        }

        let result = QuizResult {
            id: Uuid::new_v4(),
            quiz_id: new_result.quiz_id,
            user_id: new_result.user_id,
            score: new_result.score,
            completed_at: Utc::now(),
        };
        inner.results.insert(result.id, result.clone());
        Ok(result)
    }

    async fn list_results_by_user(&self, user_id: Uuid) -> StoreResult<Vec<QuizResult>> {
        let mut results: Vec<QuizResult> = self
            .inner
            .read()
            .await
            .results
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        results.sort_by_key(|r| r.completed_at);
        Ok(results)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_statuses(&self) -> StoreResult<Vec<Status>> {
        Ok(self.inner.read().await.statuses.clone())
    }

    async fn create_status(&self, new_status: NewStatus) -> StoreResult<Status> {
        Ok(self.inner.write().await.push_status(new_status))
    }

    async fn list_languages(&self) -> StoreResult<Vec<Language>> {
        Ok(self.inner.read().await.languages.clone())
    }

    async fn create_language(&self, new_language: NewLanguage) -> StoreResult<Language> {
        Ok(self.inner.write().await.push_language(new_language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> NewUser {
        NewUser::new("alice".into(), "a@x.com".into(), "hash.salt".into())
    }

    #[tokio::test]
    async fn create_then_find_case_insensitively() {
        let store = MemoryStore::new();
        let user = store.create(alice()).await.unwrap();
        assert_eq!(user.role, "user");
        assert!(user.profile_picture.is_none());

        let by_name = store.find_by_field(UserField::Username, "ALICE").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(user.id));

        let by_email = store.find_by_field(UserField::Email, "A@X.COM").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        assert_eq!(store.find_by_id(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn duplicate_username_or_email_creates_nothing() {
        let store = MemoryStore::new();
        store.create(alice()).await.unwrap();

        let err = store
            .create(NewUser::new("Alice".into(), "other@x.com".into(), "h.s".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(UserField::Username)));

        let err = store
            .create(NewUser::new("bob".into(), "A@x.com".into(), "h.s".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(UserField::Email)));

        assert!(store.find_by_field(UserField::Username, "bob").await.unwrap().is_none());
        assert_eq!(store.inner.read().await.users.len(), 1);
    }

    #[tokio::test]
    async fn update_applies_only_given_fields() {
        let store = MemoryStore::new();
        let user = store.create(alice()).await.unwrap();

        let updated = store
            .update(
                user.id,
                UpdateUser {
                    email: Some("alice@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "alice@x.com");
        assert_eq!(updated.password_hash, "hash.salt");
        assert_eq!(updated.created_at, user.created_at);
    }

    #[tokio::test]
    async fn update_rejects_taken_values_but_allows_own() {
        let store = MemoryStore::new();
        let alice = store.create(alice()).await.unwrap();
        store
            .create(NewUser::new("bob".into(), "b@x.com".into(), "h.s".into()))
            .await
            .unwrap();

        let err = store
            .update(
                alice.id,
                UpdateUser {
                    username: Some("BOB".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(UserField::Username)));

        let same = store
            .update(
                alice.id,
                UpdateUser {
                    username: Some("Alice".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.username, "Alice");
    }

    #[tokio::test]
    async fn update_and_delete_missing_ids_are_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        let err = store.update(id, UpdateUser::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let err = store.delete(id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_frees_username_and_email() {
        let store = MemoryStore::new();
        let user = store.create(alice()).await.unwrap();
        store.delete(user.id).await.unwrap();

        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        store.create(alice()).await.unwrap();
    }

    #[tokio::test]
    async fn results_require_an_existing_quiz() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();

        let err = store
            .create_result(NewQuizResult {
                quiz_id: Uuid::new_v4(),
                user_id,
                score: 3,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let quiz = store
            .create_quiz(NewQuiz {
                name: "Ownership".into(),
                category: "Rust".into(),
                created_by: user_id,
            })
            .await
            .unwrap();
        store
            .create_result(NewQuizResult {
                quiz_id: quiz.id,
                user_id,
                score: 9,
            })
            .await
            .unwrap();

        assert_eq!(store.list_quizzes_by_user(user_id).await.unwrap(), vec![quiz]);
        assert_eq!(store.list_results_by_user(user_id).await.unwrap().len(), 1);
        assert!(store.list_results_by_user(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeded_store_has_catalog_data() {
        let store = MemoryStore::seeded();
        let statuses = store.list_statuses().await.unwrap();
        assert_eq!(statuses.len(), 4);
        assert_eq!(statuses[0].name, "API Service");

        let languages = store.list_languages().await.unwrap();
        assert_eq!(languages.len(), 6);
        assert_eq!(languages[0].name, "JavaScript");
        assert_eq!(languages[0].percentage, 45);
    }

    #[tokio::test]
    async fn seeding_through_the_trait_matches_the_seeded_store() {
        let store = MemoryStore::new();
        crate::storage::seed_catalog(&store).await.unwrap();
        crate::storage::seed_catalog(&store).await.unwrap();

        let reference = MemoryStore::seeded();
        let names = |statuses: Vec<Status>| statuses.into_iter().map(|s| s.name).collect::<Vec<_>>();
        assert_eq!(
            names(store.list_statuses().await.unwrap()),
            names(reference.list_statuses().await.unwrap())
        );
        assert_eq!(store.list_languages().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn created_catalog_entries_are_listed_last() {
        let store = MemoryStore::seeded();

        let status = store
            .create_status(NewStatus {
                name: "Cache Service".into(),
                description: "Operating normally".into(),
                color: "#10B981".into(),
            })
            .await
            .unwrap();
        let statuses = store.list_statuses().await.unwrap();
        assert_eq!(statuses.len(), 5);
        assert_eq!(statuses.last(), Some(&status));

        let language = store
            .create_language(NewLanguage {
                name: "Rust".into(),
                count: 1,
                percentage: 1,
            })
            .await
            .unwrap();
        assert_eq!(store.list_languages().await.unwrap().last(), Some(&language));
    }
}
