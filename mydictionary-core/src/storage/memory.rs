//! Volatile tier: an insertion-ordered `Vec` owned by the tier's queue.

use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Entity, StorageError, StorageResult, StorageTier, StorageType};
use crate::queue::{OperationHandle, OperationQueue};

/// In-memory tier for one entity kind.
///
/// Lookups are linear scans. Readers get copies; the collection itself is
/// only touched from units of work running on the tier's queue.
pub struct MemoryStorage<E: Entity> {
    queue: OperationQueue,
    entities: Arc<RwLock<Vec<E>>>,
}

impl<E: Entity> Clone for MemoryStorage<E> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            entities: self.entities.clone(),
        }
    }
}

impl<E: Entity> MemoryStorage<E> {
    /// Creates an empty tier with its own concurrent queue.
    pub fn new() -> Self {
        Self::with_queue(OperationQueue::concurrent(format!("{}.memory", E::KIND)))
    }

    pub fn with_queue(queue: OperationQueue) -> Self {
        Self::with_entities(queue, Vec::new())
    }

    /// Creates a tier pre-populated with `entities`, in order.
    pub fn with_entities(queue: OperationQueue, entities: Vec<E>) -> Self {
        Self {
            queue,
            entities: Arc::new(RwLock::new(entities)),
        }
    }
}

impl<E: Entity> Default for MemoryStorage<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> StorageTier<E> for MemoryStorage<E> {
    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }

    fn count(&self) -> OperationHandle<usize, StorageError> {
        let entities = self.entities.clone();
        self.queue.enqueue(move || async move {
            let entities = entities.read().await;
            Ok(entities.len())
        })
    }

    fn create(&self, entity: E) -> OperationHandle<E, StorageError> {
        let entities = self.entities.clone();
        self.queue.enqueue(move || insert(entities, entity))
    }

    fn create_many(&self, batch: Vec<E>) -> BoxFuture<'static, Vec<StorageResult<E>>> {
        let entities = self.entities.clone();
        let len = batch.len();
        let handle = self.queue.enqueue(move || insert_batch(entities, batch));

        Box::pin(async move {
            match handle.await {
                Ok(results) => results,
                // The batch never ran; every entity shares the queue's verdict.
                Err(e) => (0..len).map(|_| Err(batch_failure(&e))).collect(),
            }
        })
    }

    fn read(&self, id: E::Id) -> OperationHandle<E, StorageError> {
        let entities = self.entities.clone();
        self.queue.enqueue(move || find(entities, id))
    }

    fn read_all(&self) -> OperationHandle<Vec<E>, StorageError> {
        let entities = self.entities.clone();
        self.queue.enqueue(move || async move {
            let entities = entities.read().await;
            Ok(entities.clone())
        })
    }

    fn update(&self, id: E::Id, patch: E::Patch) -> OperationHandle<E, StorageError> {
        let entities = self.entities.clone();
        self.queue.enqueue(move || replace(entities, id, patch))
    }

    fn delete(&self, id: E::Id) -> OperationHandle<(), StorageError> {
        let entities = self.entities.clone();
        self.queue.enqueue(move || remove(entities, id))
    }

    fn delete_all(&self) -> OperationHandle<(), StorageError> {
        let entities = self.entities.clone();
        self.queue.enqueue(move || async move {
            entities.write().await.clear();
            tracing::debug!(kind = E::KIND, "cleared memory tier");
            Ok(())
        })
    }
}

type Entities<E> = Arc<RwLock<Vec<E>>>;

async fn insert<E: Entity>(entities: Entities<E>, entity: E) -> StorageResult<E> {
    let mut entities = entities.write().await;
    push_unique(&mut entities, entity)
}

/// Inserts the whole batch under one write lock so it lands in order.
async fn insert_batch<E: Entity>(
    entities: Entities<E>,
    batch: Vec<E>,
) -> StorageResult<Vec<StorageResult<E>>> {
    let mut entities = entities.write().await;
    Ok(batch
        .into_iter()
        .map(|entity| push_unique(&mut entities, entity))
        .collect())
}

fn push_unique<E: Entity>(entities: &mut Vec<E>, entity: E) -> StorageResult<E> {
    let id = entity.id();
    if entities.iter().any(|e| e.id() == id) {
        return Err(StorageError::already_exists::<E>(&id));
    }
    entities.push(entity.clone());
    tracing::debug!(kind = E::KIND, %id, "created in memory");
    Ok(entity)
}

fn batch_failure(e: &StorageError) -> StorageError {
    match e {
        StorageError::Cancelled => StorageError::Cancelled,
        _ => StorageError::Abandoned,
    }
}

async fn find<E: Entity>(entities: Entities<E>, id: E::Id) -> StorageResult<E> {
    let entities = entities.read().await;
    entities
        .iter()
        .find(|e| e.id() == id)
        .cloned()
        .ok_or_else(|| StorageError::not_found::<E>(&id))
}

async fn replace<E: Entity>(
    entities: Entities<E>,
    id: E::Id,
    patch: E::Patch,
) -> StorageResult<E> {
    let mut entities = entities.write().await;
    let position = entities
        .iter()
        .position(|e| e.id() == id)
        .ok_or_else(|| StorageError::not_found::<E>(&id))?;

    let mut updated = entities[position].clone();
    updated.apply(patch);

    let new_id = updated.id();
    if new_id != id && entities.iter().any(|e| e.id() == new_id) {
        return Err(StorageError::already_exists::<E>(&new_id));
    }

    entities[position] = updated.clone();
    tracing::debug!(kind = E::KIND, %id, "updated in memory");
    Ok(updated)
}

async fn remove<E: Entity>(entities: Entities<E>, id: E::Id) -> StorageResult<()> {
    let mut entities = entities.write().await;
    let position = entities
        .iter()
        .position(|e| e.id() == id)
        .ok_or_else(|| StorageError::not_found::<E>(&id))?;
    entities.remove(position);
    tracing::debug!(kind = E::KIND, %id, "deleted from memory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JwtCredential, Word, WordPatch};
    use chrono::{Duration, Utc};

    fn word(id: i64, text: &str) -> Word {
        Word::new(id, 1, text, format!("{} description", text)).with_language(1, "English")
    }

    #[tokio::test]
    async fn test_create_and_count() {
        let storage = MemoryStorage::<Word>::new();
        assert_eq!(storage.count().await.unwrap(), 0);

        let created = storage.create(word(1, "MOSF")).await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_id_fails() {
        let storage = MemoryStorage::<Word>::new();
        storage.create(word(1, "one")).await.unwrap();

        let err = storage.create(word(1, "again")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { kind: "word", .. }));
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_read_returns_equal_copy() {
        let storage = MemoryStorage::<Word>::new();
        let original = word(7, "Haus");
        storage.create(original.clone()).await.unwrap();

        let fetched = storage.read(7).await.unwrap();
        assert_eq!(fetched, original);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let storage = MemoryStorage::<Word>::new();
        let err = storage.read(99).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_all_preserves_insertion_order() {
        let storage = MemoryStorage::<Word>::new();
        for id in [5, 2, 9] {
            storage.create(word(id, "w")).await.unwrap();
        }

        let ids: Vec<i64> = storage
            .read_all()
            .await
            .unwrap()
            .iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_create_many_applies_batch_in_order() {
        let storage = MemoryStorage::<Word>::new();
        storage.create(word(3, "existing")).await.unwrap();

        let batch: Vec<Word> = (1..=50).map(|id| word(id, "w")).collect();
        let results = storage.create_many(batch).await;

        assert_eq!(results.len(), 50);
        assert!(matches!(
            results[2],
            Err(StorageError::AlreadyExists { kind: "word", .. })
        ));
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 49);

        let ids: Vec<i64> = storage
            .read_all()
            .await
            .unwrap()
            .iter()
            .map(|w| w.id)
            .collect();
        let mut expected = vec![3];
        expected.extend((1..=50).filter(|id| *id != 3));
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_update() {
        let storage = MemoryStorage::<Word>::new();
        storage.create(word(1, "MOSF")).await.unwrap();

        let updated = storage
            .update(
                1,
                WordPatch {
                    text: "MOSFC".to_string(),
                    description: "metal-oxide-semiconductor-field-c".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.text, "MOSFC");
        assert_eq!(storage.read(1).await.unwrap().text, "MOSFC");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let storage = MemoryStorage::<Word>::new();
        let err = storage
            .update(
                3,
                WordPatch {
                    text: "x".to_string(),
                    description: "y".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_can_rekey_jwt() {
        let storage = MemoryStorage::<JwtCredential>::new();
        let old = JwtCredential::new("old-token", Utc::now());
        storage.create(old).await.unwrap();

        let new = JwtCredential::new("new-token", Utc::now() + Duration::days(1));
        storage
            .update("old-token".to_string(), new.clone())
            .await
            .unwrap();

        assert!(storage.read("old-token".to_string()).await.is_err());
        assert_eq!(storage.read("new-token".to_string()).await.unwrap(), new);
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let storage = MemoryStorage::<Word>::new();
        for id in 1..=3 {
            storage.create(word(id, "w")).await.unwrap();
        }

        storage.delete(2).await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 2);
        assert!(storage.delete(2).await.unwrap_err().is_not_found());

        storage.delete_all().await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 0);

        // Clearing an empty tier is fine.
        storage.delete_all().await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_with_entities() {
        let storage = MemoryStorage::with_entities(
            OperationQueue::serial("word.memory"),
            vec![word(1, "a"), word(2, "b")],
        );
        assert_eq!(storage.count().await.unwrap(), 2);
        assert_eq!(storage.storage_type(), StorageType::Memory);
    }
}
