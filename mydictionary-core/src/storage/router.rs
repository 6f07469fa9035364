//! Routes each CRUD call to the tier(s) named by a [`StorageType`].

use futures::future::join_all;
use sqlx::SqlitePool;

use super::{
    collect_results, MemoryStorage, SqliteEntity, SqliteStorage, StorageError, StorageResult,
    StorageTier, StorageType, TierResult,
};
use crate::queue::OperationHandle;

/// Storage router for one entity kind.
///
/// Every call returns one [`TierResult`] per tier touched: none for
/// [`StorageType::None`], one for a single tier, and memory then durable for
/// [`StorageType::All`]. Tier failures are reported individually, never
/// folded into a single status.
pub struct Storage<E: SqliteEntity> {
    memory: MemoryStorage<E>,
    durable: SqliteStorage<E>,
}

impl<E: SqliteEntity> Clone for Storage<E> {
    fn clone(&self) -> Self {
        Self {
            memory: self.memory.clone(),
            durable: self.durable.clone(),
        }
    }
}

impl<E: SqliteEntity> Storage<E> {
    /// Creates a router with an empty memory tier and a durable tier on `pool`.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_tiers(MemoryStorage::new(), SqliteStorage::new(pool))
    }

    pub fn with_tiers(memory: MemoryStorage<E>, durable: SqliteStorage<E>) -> Self {
        Self { memory, durable }
    }

    pub fn memory(&self) -> &MemoryStorage<E> {
        &self.memory
    }

    pub fn durable(&self) -> &SqliteStorage<E> {
        &self.durable
    }

    fn tiers(&self, storage_type: StorageType) -> Vec<&dyn StorageTier<E>> {
        let mut tiers: Vec<&dyn StorageTier<E>> = Vec::with_capacity(2);
        if matches!(storage_type, StorageType::Memory | StorageType::All) {
            tiers.push(&self.memory);
        }
        if matches!(storage_type, StorageType::Durable | StorageType::All) {
            tiers.push(&self.durable);
        }
        tiers
    }

    pub async fn count(&self, storage_type: StorageType) -> Vec<TierResult<usize>> {
        let handles = self
            .tiers(storage_type)
            .into_iter()
            .map(|tier| (tier.storage_type(), tier.count()))
            .collect();
        gather::<E, _>("count", handles).await
    }

    /// Reports per tier whether it holds no entities.
    pub async fn is_empty(&self, storage_type: StorageType) -> Vec<TierResult<bool>> {
        self.count(storage_type)
            .await
            .into_iter()
            .map(|r| TierResult {
                storage_type: r.storage_type,
                result: r.result.map(|count| count == 0),
            })
            .collect()
    }

    pub async fn create(&self, entity: E, storage_type: StorageType) -> Vec<TierResult<E>> {
        let handles = self
            .tiers(storage_type)
            .into_iter()
            .map(|tier| (tier.storage_type(), tier.create(entity.clone())))
            .collect();
        gather::<E, _>("create", handles).await
    }

    /// Creates every entity in every selected tier.
    ///
    /// Each tier receives the whole batch up front and applies it in the
    /// order given. Results are laid out entity-major: entity 0 in each
    /// tier, then entity 1, and so on.
    pub async fn create_many(
        &self,
        entities: Vec<E>,
        storage_type: StorageType,
    ) -> Vec<TierResult<E>> {
        let tiers = self.tiers(storage_type);
        let len = entities.len();
        let storage_types: Vec<StorageType> = tiers.iter().map(|t| t.storage_type()).collect();

        let batches: Vec<_> = tiers
            .iter()
            .map(|tier| tier.create_many(entities.clone()))
            .collect();
        let mut columns: Vec<_> = join_all(batches)
            .await
            .into_iter()
            .map(Vec::into_iter)
            .collect();

        let mut results = Vec::with_capacity(len * columns.len());
        for _ in 0..len {
            for (storage_type, column) in storage_types.iter().zip(columns.iter_mut()) {
                if let Some(result) = column.next() {
                    results.push(tier_result::<E, _>("create", *storage_type, result));
                }
            }
        }
        results
    }

    pub async fn read(&self, id: E::Id, storage_type: StorageType) -> Vec<TierResult<E>> {
        let handles = self
            .tiers(storage_type)
            .into_iter()
            .map(|tier| (tier.storage_type(), tier.read(id.clone())))
            .collect();
        gather::<E, _>("read", handles).await
    }

    pub async fn read_all(&self, storage_type: StorageType) -> Vec<TierResult<Vec<E>>> {
        let handles = self
            .tiers(storage_type)
            .into_iter()
            .map(|tier| (tier.storage_type(), tier.read_all()))
            .collect();
        gather::<E, _>("read_all", handles).await
    }

    pub async fn update(
        &self,
        id: E::Id,
        patch: E::Patch,
        storage_type: StorageType,
    ) -> Vec<TierResult<E>> {
        let handles = self
            .tiers(storage_type)
            .into_iter()
            .map(|tier| (tier.storage_type(), tier.update(id.clone(), patch.clone())))
            .collect();
        gather::<E, _>("update", handles).await
    }

    pub async fn delete(&self, id: E::Id, storage_type: StorageType) -> Vec<TierResult<()>> {
        let handles = self
            .tiers(storage_type)
            .into_iter()
            .map(|tier| (tier.storage_type(), tier.delete(id.clone())))
            .collect();
        gather::<E, _>("delete", handles).await
    }

    pub async fn delete_all(&self, storage_type: StorageType) -> Vec<TierResult<()>> {
        let handles = self
            .tiers(storage_type)
            .into_iter()
            .map(|tier| (tier.storage_type(), tier.delete_all()))
            .collect();
        gather::<E, _>("delete_all", handles).await
    }
}

impl<E: SqliteEntity> Storage<E> {
    /// Reloads the memory tier from the durable tier.
    ///
    /// The memory tier starts empty in every process; this brings it in line
    /// with the system of record and returns the number of entities loaded.
    pub async fn warm_memory(&self) -> StorageResult<usize> {
        let entities = self.durable.read_all().await?;
        self.memory.delete_all().await?;

        let loaded = entities.len();
        let created = self.create_many(entities, StorageType::Memory).await;
        collect_results(created)?;

        tracing::debug!(kind = E::KIND, loaded, "memory tier warmed");
        Ok(loaded)
    }
}

/// Waits for every handle and pairs each outcome with its tier, keeping the
/// order the handles were issued in.
async fn gather<E: SqliteEntity, T>(
    operation: &'static str,
    handles: Vec<(StorageType, OperationHandle<T, StorageError>)>,
) -> Vec<TierResult<T>> {
    let (storage_types, pending): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let outcomes = join_all(pending).await;

    storage_types
        .into_iter()
        .zip(outcomes)
        .map(|(storage_type, result)| tier_result::<E, _>(operation, storage_type, result))
        .collect()
}

fn tier_result<E: SqliteEntity, T>(
    operation: &'static str,
    storage_type: StorageType,
    result: StorageResult<T>,
) -> TierResult<T> {
    if let Err(e) = &result {
        tracing::warn!(
            kind = E::KIND,
            operation,
            tier = %storage_type,
            error = %e,
            "storage operation failed"
        );
    }
    TierResult {
        storage_type,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, LanguagePatch, Word};
    use crate::storage::init_db;
    use tempfile::TempDir;

    async fn setup<E: SqliteEntity>() -> (TempDir, Storage<E>) {
        let dir = TempDir::new().unwrap();
        let pool = init_db(&dir.path().join("test.db")).await.unwrap();
        (dir, Storage::new(pool))
    }

    async fn fail_language_inserts_named(storage: &Storage<Language>, name: &str) {
        let sql = format!(
            "CREATE TRIGGER fail_language_insert BEFORE INSERT ON languages \
             WHEN NEW.name = '{}' \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
            name
        );
        sqlx::query(&sql)
            .execute(storage.durable().pool())
            .await
            .unwrap();
    }

    fn tier_order<T>(results: &[TierResult<T>]) -> Vec<StorageType> {
        results.iter().map(|r| r.storage_type).collect()
    }

    fn counts(results: Vec<TierResult<usize>>) -> Vec<usize> {
        collect_results(results).unwrap()
    }

    #[tokio::test]
    async fn test_none_touches_nothing() {
        let (_dir, storage) = setup::<Language>().await;

        let results = storage.create(Language::new(1, "English"), StorageType::None).await;
        assert!(results.is_empty());
        assert!(storage.count(StorageType::None).await.is_empty());
        assert_eq!(counts(storage.count(StorageType::All).await), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_single_tier_returns_one_result() {
        let (_dir, storage) = setup::<Language>().await;

        let results = storage
            .create(Language::new(1, "English"), StorageType::Memory)
            .await;
        assert_eq!(tier_order(&results), vec![StorageType::Memory]);
        assert!(results[0].is_ok());

        assert_eq!(counts(storage.count(StorageType::All).await), vec![1, 0]);
    }

    #[tokio::test]
    async fn test_create_all_adds_one_to_each_tier() {
        let (_dir, storage) = setup::<Word>().await;
        let before = counts(storage.count(StorageType::All).await);

        let word = Word::new(1, 1, "Flank", "the side of something");
        let results = storage.create(word.clone(), StorageType::All).await;

        assert_eq!(
            tier_order(&results),
            vec![StorageType::Memory, StorageType::Durable]
        );
        assert!(results.iter().all(TierResult::is_ok));

        let after = counts(storage.count(StorageType::All).await);
        assert_eq!(after, vec![before[0] + 1, before[1] + 1]);

        for result in storage.read(1, StorageType::All).await {
            assert_eq!(result.result.unwrap(), word);
        }
    }

    #[tokio::test]
    async fn test_delete_all_empties_both_tiers() {
        let (_dir, storage) = setup::<Language>().await;
        for id in 1..=3 {
            storage
                .create(Language::new(id, "x"), StorageType::All)
                .await;
        }

        let deleted = storage.delete(2, StorageType::All).await;
        assert!(deleted.iter().all(TierResult::is_ok));

        let cleared = storage.delete_all(StorageType::All).await;
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(TierResult::is_ok));

        assert_eq!(counts(storage.count(StorageType::All).await), vec![0, 0]);
        let empty = collect_results(storage.is_empty(StorageType::All).await).unwrap();
        assert_eq!(empty, vec![true, true]);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_both_outcomes() {
        let (_dir, storage) = setup::<Language>().await;
        fail_language_inserts_named(&storage, "boom").await;

        let results = storage.create(Language::new(1, "boom"), StorageType::All).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].storage_type, StorageType::Memory);
        assert!(results[0].is_ok());
        assert_eq!(results[1].storage_type, StorageType::Durable);
        assert!(matches!(results[1].result, Err(StorageError::Store(_))));

        assert_eq!(counts(storage.count(StorageType::All).await), vec![1, 0]);
    }

    #[tokio::test]
    async fn test_update_missing_only_affects_target_tier() {
        let (_dir, storage) = setup::<Language>().await;
        storage
            .create(Language::new(1, "English"), StorageType::Durable)
            .await;

        let results = storage
            .update(
                1,
                LanguagePatch {
                    name: "Spanish".to_string(),
                },
                StorageType::Memory,
            )
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].result, Err(StorageError::NotFound { .. })));

        let durable = storage.read(1, StorageType::Durable).await;
        assert_eq!(durable[0].result.as_ref().unwrap().name, "English");
    }

    #[tokio::test]
    async fn test_create_many_is_entity_major() {
        let (_dir, storage) = setup::<Language>().await;
        fail_language_inserts_named(&storage, "boom").await;

        let languages = vec![
            Language::new(1, "English"),
            Language::new(2, "boom"),
            Language::new(3, "German"),
        ];
        let results = storage.create_many(languages, StorageType::All).await;

        assert_eq!(results.len(), 6);
        let outcome: Vec<(StorageType, bool)> = results
            .iter()
            .map(|r| (r.storage_type, r.is_ok()))
            .collect();
        assert_eq!(
            outcome,
            vec![
                (StorageType::Memory, true),
                (StorageType::Durable, true),
                (StorageType::Memory, true),
                (StorageType::Durable, false),
                (StorageType::Memory, true),
                (StorageType::Durable, true),
            ]
        );
        assert_eq!(results[5].result.as_ref().unwrap().name, "German");
    }

    #[tokio::test]
    async fn test_read_all_per_tier() {
        let (_dir, storage) = setup::<Language>().await;
        storage
            .create_many(
                vec![Language::new(2, "French"), Language::new(1, "English")],
                StorageType::All,
            )
            .await;

        let results = storage.read_all(StorageType::All).await;
        let ids = |r: &TierResult<Vec<Language>>| -> Vec<i64> {
            r.result.as_ref().unwrap().iter().map(|l| l.id).collect()
        };

        assert_eq!(ids(&results[0]), vec![2, 1]);
        assert_eq!(ids(&results[1]), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_warm_memory_mirrors_durable() {
        let (_dir, storage) = setup::<Language>().await;
        storage
            .create_many(
                vec![Language::new(1, "English"), Language::new(2, "French")],
                StorageType::Durable,
            )
            .await;
        storage
            .create(Language::new(9, "stale"), StorageType::Memory)
            .await;

        assert_eq!(storage.warm_memory().await.unwrap(), 2);
        assert_eq!(counts(storage.count(StorageType::All).await), vec![2, 2]);

        let memory = storage.read(9, StorageType::Memory).await;
        assert!(matches!(memory[0].result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_memory_keeps_batch_order_on_worker_threads() {
        let (_dir, storage) = setup::<Language>().await;
        let languages: Vec<Language> = (1..=200)
            .map(|id| Language::new(id, format!("language {}", id)))
            .collect();

        let created = storage.create_many(languages, StorageType::All).await;
        assert_eq!(created.len(), 400);
        assert!(created.iter().all(TierResult::is_ok));

        let ids = |results: &[TierResult<Vec<Language>>], at: usize| -> Vec<i64> {
            results[at].result.as_ref().unwrap().iter().map(|l| l.id).collect()
        };
        let expected: Vec<i64> = (1..=200).collect();

        let results = storage.read_all(StorageType::All).await;
        assert_eq!(ids(&results, 0), expected);
        assert_eq!(ids(&results, 1), expected);

        for _ in 0..5 {
            assert_eq!(storage.warm_memory().await.unwrap(), 200);
            let memory = storage.read_all(StorageType::Memory).await;
            assert_eq!(ids(&memory, 0), expected);
        }
    }
}
