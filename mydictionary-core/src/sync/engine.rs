use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};

use super::{SyncError, SyncFamily, SyncItem, SyncResult, SyncState};
use crate::api::{CourseApi, LanguageApi, WordApi};
use crate::models::{Course, Language, Word};
use crate::queue::JoinGroup;
use crate::storage::{collect_results, SqliteEntity, Storage, StorageType};

/// Runs sync passes against the remote API.
///
/// Only one run may be in flight at a time; the current [`SyncState`] can be
/// observed through [`SyncEngine::subscribe`].
pub struct SyncEngine<L, C, W> {
    languages: Arc<L>,
    courses: Arc<C>,
    words: Arc<W>,
    language_storage: Storage<Language>,
    course_storage: Storage<Course>,
    word_storage: Storage<Word>,
    state: Arc<watch::Sender<SyncState>>,
}

impl<L, C, W> Clone for SyncEngine<L, C, W> {
    fn clone(&self) -> Self {
        Self {
            languages: self.languages.clone(),
            courses: self.courses.clone(),
            words: self.words.clone(),
            language_storage: self.language_storage.clone(),
            course_storage: self.course_storage.clone(),
            word_storage: self.word_storage.clone(),
            state: self.state.clone(),
        }
    }
}

impl<L, C, W> SyncEngine<L, C, W>
where
    L: LanguageApi + 'static,
    C: CourseApi + 'static,
    W: WordApi + 'static,
{
    pub fn new(
        languages: Arc<L>,
        courses: Arc<C>,
        words: Arc<W>,
        language_storage: Storage<Language>,
        course_storage: Storage<Course>,
        word_storage: Storage<Word>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            languages,
            courses,
            words,
            language_storage,
            course_storage,
            word_storage,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Runs every family in dependency order and returns one result per
    /// family, in that order.
    ///
    /// Each family runs on its own task and leaves its slot in the join
    /// barrier from there; a family starts only once the one before it has
    /// finished. A failed family does not stop later families from being
    /// attempted. Fails with [`SyncError::AlreadyRunning`] if another run is
    /// active, and with [`SyncError::Abandoned`] if a family task dies
    /// without reporting.
    pub async fn start(&self, item: SyncItem) -> Result<Vec<SyncResult>, SyncError> {
        let run = RunGuard::begin(&self.state)?;
        tracing::info!(user_id = item.user_id, "sync started");

        let mut group = JoinGroup::with_capacity(SyncFamily::ALL.len());
        // Dropping the set aborts families still in flight.
        let mut tasks = JoinSet::new();
        let mut previous: Option<oneshot::Receiver<()>> = None;

        for family in SyncFamily::ALL {
            let slot = group.enter();
            let (done_tx, done_rx) = oneshot::channel();
            let after = previous.replace(done_rx);
            let engine = self.clone();
            let item = item.clone();

            tasks.spawn(async move {
                if let Some(after) = after {
                    // A predecessor that died still counts as finished.
                    let _ = after.await;
                }

                let result = engine.sync_family(family, &item).await;
                match &result {
                    Ok(count) => tracing::info!(%family, count, "family synced"),
                    Err(e) => tracing::warn!(%family, error = %e, "family sync failed"),
                }

                mark_finished(&engine.state, family);
                slot.leave(SyncResult { family, result });
                let _ = done_tx.send(());
            });
        }

        let results = group.wait().await.map_err(|e| {
            tracing::error!(error = %e, "sync family did not report");
            SyncError::Abandoned
        })?;
        run.complete();

        tracing::info!(
            failed = results.iter().filter(|r| !r.is_ok()).count(),
            "sync finished"
        );
        Ok(results)
    }

    /// Runs [`start`](Self::start) on a background task.
    pub fn spawn(&self, item: SyncItem) -> JoinHandle<Result<Vec<SyncResult>, SyncError>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.start(item).await })
    }

    async fn sync_family(&self, family: SyncFamily, item: &SyncItem) -> Result<usize, SyncError> {
        match family {
            SyncFamily::Language => {
                let records = self.languages.get_languages(&item.access_token).await?;
                persist(&self.language_storage, records).await
            }
            SyncFamily::Course => {
                let records = self
                    .courses
                    .get_courses(&item.access_token, item.user_id)
                    .await?;
                persist(&self.course_storage, records).await
            }
            SyncFamily::Word => {
                let records = self
                    .words
                    .get_words(&item.access_token, item.user_id)
                    .await?;
                persist(&self.word_storage, records).await
            }
        }
    }
}

/// Replaces a family's local copy with `records` in both tiers.
///
/// Succeeds only if the clear and every (record, tier) create succeeded;
/// otherwise reports the first failure in result order.
async fn persist<E: SqliteEntity>(
    storage: &Storage<E>,
    records: Vec<E>,
) -> Result<usize, SyncError> {
    collect_results(storage.delete_all(StorageType::All).await)?;

    let count = records.len();
    collect_results(storage.create_many(records, StorageType::All).await)?;

    tracing::debug!(kind = E::KIND, count, "persisted fetched records");
    Ok(count)
}

fn mark_finished(state: &watch::Sender<SyncState>, family: SyncFamily) {
    state.send_modify(|current| {
        if let SyncState::Running { pending } = current {
            pending.retain(|f| *f != family);
        }
    });
}

/// Marks a run active for its lifetime. A run dropped before completing
/// puts the engine back to idle.
struct RunGuard<'a> {
    state: &'a watch::Sender<SyncState>,
}

impl<'a> RunGuard<'a> {
    fn begin(state: &'a watch::Sender<SyncState>) -> Result<Self, SyncError> {
        let mut started = false;
        state.send_if_modified(|current| {
            if current.is_running() {
                return false;
            }
            *current = SyncState::Running {
                pending: SyncFamily::ALL.to_vec(),
            };
            started = true;
            true
        });

        if started {
            Ok(Self { state })
        } else {
            Err(SyncError::AlreadyRunning)
        }
    }

    fn complete(self) {
        self.state.send_replace(SyncState::Completed);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|current| {
            if current.is_running() {
                *current = SyncState::Idle;
                true
            } else {
                false
            }
        });
    }
}
