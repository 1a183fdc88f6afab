// ============================
// notes-backend-lib/src/storage.rs
// ============================
//! Storage abstraction with an in-memory implementation.
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notes_common::{Category, Id, Note, UserProfile};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::validation::{NewNote, NoteSearch, NoteSort};

/// Categories a single user may own
pub const MAX_CATEGORIES_PER_USER: usize = 5;

/// Stored user, including the password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub name: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            name: self.name.clone(),
        }
    }
}

/// Stored note changes; `None` leaves a field as it is
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Id>,
}

/// Trait for storage backends.
///
/// Every category and note operation is scoped to its owner: a record owned by
/// someone else behaves exactly like a missing one.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Liveness probe
    async fn ping(&self) -> Result<(), AppError>;

    /// Insert a user; `Conflict` if the username is taken
    async fn create_user(&self, user: UserRecord) -> Result<UserProfile, AppError>;

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AppError>;

    /// Change name and/or password hash; `NotFound` if the user is gone
    async fn update_user(
        &self,
        username: &str,
        name: Option<String>,
        password_hash: Option<String>,
    ) -> Result<UserProfile, AppError>;

    /// Insert a category, enforcing [`MAX_CATEGORIES_PER_USER`]
    async fn create_category(&self, owner: &str, name: String) -> Result<Category, AppError>;

    /// Categories of `owner`, ordered by id
    async fn list_categories(&self, owner: &str) -> Result<Vec<Category>, AppError>;

    async fn rename_category(
        &self,
        owner: &str,
        id: Id,
        name: String,
    ) -> Result<Option<Category>, AppError>;

    /// Delete a category and the owner's notes in it. `false` if not found.
    async fn delete_category(&self, owner: &str, id: Id) -> Result<bool, AppError>;

    /// Insert a note stamped with `now`; the category must belong to `owner`
    async fn create_note(
        &self,
        owner: &str,
        note: NewNote,
        now: DateTime<Utc>,
    ) -> Result<Note, AppError>;

    /// One page of matching notes (with embedded category) and the total match count
    async fn search_notes(&self, owner: &str, query: &NoteSearch)
        -> Result<(Vec<Note>, u64), AppError>;

    async fn find_note(&self, owner: &str, id: Id) -> Result<Option<Note>, AppError>;

    /// Apply `patch` and set `updatedAt` to `now`; `None` if the note is not
    /// found. A new category must belong to `owner`.
    async fn update_note(
        &self,
        owner: &str,
        id: Id,
        patch: NotePatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Note>, AppError>;

    async fn delete_note(&self, owner: &str, id: Id) -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
struct CategoryRow {
    owner: String,
    name: String,
}

#[derive(Debug, Clone)]
struct NoteRow {
    owner: String,
    title: String,
    content: String,
    category_id: Id,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, UserRecord>,
    categories: BTreeMap<Id, CategoryRow>,
    notes: BTreeMap<Id, NoteRow>,
    next_category_id: Id,
    next_note_id: Id,
}

impl Tables {
    fn owned_category(&self, owner: &str, id: Id) -> Option<Category> {
        self.categories
            .get(&id)
            .filter(|row| row.owner == owner)
            .map(|row| Category {
                id,
                name: row.name.clone(),
            })
    }

    fn category_count(&self, owner: &str) -> usize {
        self.categories.values().filter(|c| c.owner == owner).count()
    }

    fn note(&self, id: Id, row: &NoteRow, with_category: bool) -> Note {
        let category = if with_category {
            self.owned_category(&row.owner, row.category_id)
        } else {
            None
        };
        Note {
            id,
            title: row.title.clone(),
            content: row.content.clone(),
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category,
        }
    }
}

fn category_not_found() -> AppError {
    AppError::NotFound("Category not found".to_string())
}

/// In-memory implementation of the Storage trait
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), AppError> {
        let _tables = self.tables.read().await;
        Ok(())
    }

    async fn create_user(&self, user: UserRecord) -> Result<UserProfile, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.username) {
            return Err(AppError::Conflict("username already exists".to_string()));
        }
        let profile = user.profile();
        tables.users.insert(user.username.clone(), user);
        Ok(profile)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.tables.read().await.users.get(username).cloned())
    }

    async fn update_user(
        &self,
        username: &str,
        name: Option<String>,
        password_hash: Option<String>,
    ) -> Result<UserProfile, AppError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(username)
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        Ok(user.profile())
    }

    async fn create_category(&self, owner: &str, name: String) -> Result<Category, AppError> {
        let mut tables = self.tables.write().await;
        if tables.category_count(owner) >= MAX_CATEGORIES_PER_USER {
            return Err(AppError::BadRequest("Category limit reached".to_string()));
        }
        tables.next_category_id += 1;
        let id = tables.next_category_id;
        tables.categories.insert(
            id,
            CategoryRow {
                owner: owner.to_string(),
                name: name.clone(),
            },
        );
        Ok(Category { id, name })
    }

    async fn list_categories(&self, owner: &str) -> Result<Vec<Category>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .iter()
            .filter(|(_, row)| row.owner == owner)
            .map(|(id, row)| Category {
                id: *id,
                name: row.name.clone(),
            })
            .collect())
    }

    async fn rename_category(
        &self,
        owner: &str,
        id: Id,
        name: String,
    ) -> Result<Option<Category>, AppError> {
        let mut tables = self.tables.write().await;
        match tables.categories.get_mut(&id) {
            Some(row) if row.owner == owner => {
                row.name = name.clone();
                Ok(Some(Category { id, name }))
            }
            _ => Ok(None),
        }
    }

    async fn delete_category(&self, owner: &str, id: Id) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.owned_category(owner, id).is_none() {
            return Ok(false);
        }
        tables
            .notes
            .retain(|_, note| !(note.owner == owner && note.category_id == id));
        tables.categories.remove(&id);
        Ok(true)
    }

    async fn create_note(
        &self,
        owner: &str,
        note: NewNote,
        now: DateTime<Utc>,
    ) -> Result<Note, AppError> {
        let mut tables = self.tables.write().await;
        if tables.owned_category(owner, note.category_id).is_none() {
            return Err(category_not_found());
        }
        tables.next_note_id += 1;
        let id = tables.next_note_id;
        let row = NoteRow {
            owner: owner.to_string(),
            title: note.title,
            content: note.content,
            category_id: note.category_id,
            created_at: now,
            updated_at: now,
        };
        let created = tables.note(id, &row, false);
        tables.notes.insert(id, row);
        Ok(created)
    }

    async fn search_notes(
        &self,
        owner: &str,
        query: &NoteSearch,
    ) -> Result<(Vec<Note>, u64), AppError> {
        let tables = self.tables.read().await;
        let matches = |row: &NoteRow| {
            row.owner == owner
                && query.category_id.map_or(true, |c| row.category_id == c)
                && query.search.as_deref().map_or(true, |needle| {
                    row.title.contains(needle) || row.content.contains(needle)
                })
        };

        let mut hits: Vec<(&Id, &NoteRow)> =
            tables.notes.iter().filter(|(_, row)| matches(row)).collect();
        if query.sort == NoteSort::Newest {
            hits.reverse();
        }

        let total = hits.len() as u64;
        let skip = usize::try_from((query.page - 1).saturating_mul(query.size)).unwrap_or(usize::MAX);
        let take = usize::try_from(query.size).unwrap_or(usize::MAX);
        let page = hits
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(id, row)| tables.note(*id, row, true))
            .collect();
        Ok((page, total))
    }

    async fn find_note(&self, owner: &str, id: Id) -> Result<Option<Note>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .get(&id)
            .filter(|row| row.owner == owner)
            .map(|row| tables.note(id, row, true)))
    }

    async fn update_note(
        &self,
        owner: &str,
        id: Id,
        patch: NotePatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Note>, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.notes.get(&id).is_some_and(|row| row.owner == owner) {
            return Ok(None);
        }
        if let Some(category_id) = patch.category_id {
            if tables.owned_category(owner, category_id).is_none() {
                return Err(category_not_found());
            }
        }

        let Some(row) = tables.notes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(content) = patch.content {
            row.content = content;
        }
        if let Some(category_id) = patch.category_id {
            row.category_id = category_id;
        }
        row.updated_at = now;
        let row = row.clone();
        Ok(Some(tables.note(id, &row, false)))
    }

    async fn delete_note(&self, owner: &str, id: Id) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.notes.get(&id).is_some_and(|row| row.owner == owner) {
            return Ok(false);
        }
        tables.notes.remove(&id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn user(name: &str) -> UserRecord {
        UserRecord {
            username: name.to_string(),
            name: name.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn new_note(title: &str, content: &str, category_id: Id) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: content.to_string(),
            category_id,
        }
    }

    fn search(page: u64, size: u64) -> NoteSearch {
        NoteSearch {
            page,
            size,
            search: None,
            category_id: None,
            sort: NoteSort::Oldest,
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let storage = MemoryStorage::new();
        storage.create_user(user("test")).await.unwrap();
        let err = storage.create_user(user("test")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_user_changes_only_given_fields() {
        let storage = MemoryStorage::new();
        storage.create_user(user("test")).await.unwrap();
        let profile = storage
            .update_user("test", Some("Renamed".to_string()), None)
            .await
            .unwrap();
        assert_eq!(profile.name, "Renamed");
        let stored = storage.find_user("test").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hash");
    }

    #[tokio::test]
    async fn category_limit_is_per_user() {
        let storage = MemoryStorage::new();
        for i in 0..MAX_CATEGORIES_PER_USER {
            storage.create_category("a", format!("c{i}")).await.unwrap();
        }
        let err = storage.create_category("a", "extra".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        storage.create_category("b", "mine".to_string()).await.unwrap();
        assert_eq!(storage.list_categories("a").await.unwrap().len(), 5);
        assert_eq!(storage.list_categories("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn categories_are_scoped_to_owner() {
        let storage = MemoryStorage::new();
        let cat = storage.create_category("a", "work".to_string()).await.unwrap();
        assert!(storage.list_categories("b").await.unwrap().is_empty());
        assert!(storage
            .rename_category("b", cat.id, "x".to_string())
            .await
            .unwrap()
            .is_none());
        assert!(!storage.delete_category("b", cat.id).await.unwrap());
        assert_eq!(storage.list_categories("a").await.unwrap(), vec![cat]);
    }

    #[tokio::test]
    async fn deleting_category_deletes_its_notes() {
        let storage = MemoryStorage::new();
        let work = storage.create_category("a", "work".to_string()).await.unwrap();
        let home = storage.create_category("a", "home".to_string()).await.unwrap();
        let doomed = storage.create_note("a", new_note("t1", "c", work.id), at(0)).await.unwrap();
        let kept = storage.create_note("a", new_note("t2", "c", home.id), at(0)).await.unwrap();

        assert!(storage.delete_category("a", work.id).await.unwrap());
        assert!(storage.find_note("a", doomed.id).await.unwrap().is_none());
        assert!(storage.find_note("a", kept.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn note_needs_owned_category() {
        let storage = MemoryStorage::new();
        let theirs = storage.create_category("b", "x".to_string()).await.unwrap();
        let err = storage
            .create_note("a", new_note("t", "c", theirs.id), at(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_pages_filters_and_sorts() {
        let storage = MemoryStorage::new();
        let work = storage.create_category("a", "work".to_string()).await.unwrap();
        let home = storage.create_category("a", "home".to_string()).await.unwrap();
        for i in 1..=12 {
            let cat = if i % 2 == 0 { work.id } else { home.id };
            storage
                .create_note("a", new_note(&format!("note {i}"), "body", cat), at(0))
                .await
                .unwrap();
        }
        storage
            .create_note("a", new_note("groceries", "buy milk", home.id), at(0))
            .await
            .unwrap();
        let other = storage.create_category("b", "b".to_string()).await.unwrap();
        storage
            .create_note("b", new_note("milk", "not yours", other.id), at(0))
            .await
            .unwrap();

        let (page, total) = storage.search_notes("a", &search(2, 10)).await.unwrap();
        assert_eq!(total, 13);
        assert_eq!(page.len(), 3);
        assert!(page.iter().all(|n| n.category.is_some()));

        let mut query = search(1, 10);
        query.search = Some("milk".to_string());
        let (page, total) = storage.search_notes("a", &query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].title, "groceries");

        let mut query = search(1, 100);
        query.category_id = Some(work.id);
        let (_, total) = storage.search_notes("a", &query).await.unwrap();
        assert_eq!(total, 6);

        let mut query = search(1, 1);
        query.sort = NoteSort::Newest;
        let (page, _) = storage.search_notes("a", &query).await.unwrap();
        assert_eq!(page[0].title, "groceries");
    }

    #[tokio::test]
    async fn update_note_applies_patch() {
        let storage = MemoryStorage::new();
        let work = storage.create_category("a", "work".to_string()).await.unwrap();
        let home = storage.create_category("a", "home".to_string()).await.unwrap();
        let note = storage.create_note("a", new_note("t", "c", work.id), at(0)).await.unwrap();

        let updated = storage
            .update_note(
                "a",
                note.id,
                NotePatch {
                    title: Some("new".to_string()),
                    content: None,
                    category_id: Some(home.id),
                },
                at(90),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.content, "c");
        assert_eq!(updated.category_id, home.id);
        assert_eq!(updated.created_at, at(0));
        assert_eq!(updated.updated_at, at(90));

        assert!(storage
            .update_note("b", note.id, NotePatch::default(), at(100))
            .await
            .unwrap()
            .is_none());
        assert!(storage.delete_note("a", note.id).await.unwrap());
        assert!(!storage.delete_note("a", note.id).await.unwrap());
    }
}
