//! Learner progress: section completion flags, quiz results, and bookmarks.
//!
//! [`ProgressState`] is a plain reducer over three flat mappings. Every change
//! goes through [`ProgressState::apply`] with a [`ProgressAction`].
//! [`ProgressStore`] owns a state, persists the mapping an action touched, and
//! notifies subscribed [`ProgressListener`]s.
//!
//! Persisted progress is a best-effort cache. Unreadable records load as
//! empty, and failed writes are logged without failing the operation.

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use purelearn_shared::{
    Bookmarks, PurelearnError, QuizProgress, QuizRecord, Result, SectionId, SectionProgress,
    key_belongs_to_course,
};
use purelearn_storage::KeyValueStore;

/// Storage key of the section completion mapping.
pub const SECTION_PROGRESS_KEY: &str = "courseSectionProgress";

/// Storage key of the quiz result mapping.
pub const QUIZ_PROGRESS_KEY: &str = "courseQuizProgress";

/// Storage key of the bookmark mapping.
pub const BOOKMARKS_KEY: &str = "mdx-bookmarks";

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

/// A named mutation of progress state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressAction {
    /// Flag a section as completed.
    MarkSectionCompleted(SectionId),
    /// Store the latest result of a quiz, replacing any earlier one.
    RecordQuiz { section: SectionId, record: QuizRecord },
    /// Forget the result of one quiz.
    ResetQuiz(SectionId),
    /// Forget every quiz result.
    ResetAllQuizzes,
    /// Clear the completion flags of one course.
    ResetCourseSections { course_slug: String },
    /// Clear every completion flag.
    ResetAllSections,
    /// Flip the bookmark stored under a key.
    ToggleBookmark(String),
}

/// Which persisted mapping an action touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMapping {
    Sections,
    Quizzes,
    Bookmarks,
}

impl ProgressMapping {
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Sections => SECTION_PROGRESS_KEY,
            Self::Quizzes => QUIZ_PROGRESS_KEY,
            Self::Bookmarks => BOOKMARKS_KEY,
        }
    }
}

impl ProgressAction {
    pub fn mapping(&self) -> ProgressMapping {
        match self {
            Self::MarkSectionCompleted(_)
            | Self::ResetCourseSections { .. }
            | Self::ResetAllSections => ProgressMapping::Sections,
            Self::RecordQuiz { .. } | Self::ResetQuiz(_) | Self::ResetAllQuizzes => {
                ProgressMapping::Quizzes
            }
            Self::ToggleBookmark(_) => ProgressMapping::Bookmarks,
        }
    }
}

/// Section completion flags, quiz results, and bookmarks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    sections: SectionProgress,
    quizzes: QuizProgress,
    bookmarks: Bookmarks,
}

impl ProgressState {
    pub fn new(sections: SectionProgress, quizzes: QuizProgress, bookmarks: Bookmarks) -> Self {
        let mut state = Self {
            sections,
            quizzes,
            bookmarks,
        };
        state.sections.retain(|_, done| *done);
        state.bookmarks.retain(|_, on| *on);
        state
    }

    pub fn sections(&self) -> &SectionProgress {
        &self.sections
    }

    pub fn quizzes(&self) -> &QuizProgress {
        &self.quizzes
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, key: &str) -> bool {
        self.bookmarks.get(key).copied().unwrap_or(false)
    }

    /// Whether `id` was explicitly marked completed.
    pub fn is_section_marked(&self, id: &SectionId) -> bool {
        self.sections.get(id.as_str()).copied().unwrap_or(false)
    }

    /// Latest quiz result for `id`.
    pub fn quiz(&self, id: &SectionId) -> Option<&QuizRecord> {
        self.quizzes.get(id.as_str())
    }

    /// True iff `subtopic_slugs` is non-empty and every
    /// `course/topic/subtopic` key is marked completed.
    pub fn check_topic_completion<S: AsRef<str>>(
        &self,
        course_slug: &str,
        topic_slug: &str,
        subtopic_slugs: &[S],
    ) -> bool {
        !subtopic_slugs.is_empty()
            && subtopic_slugs.iter().all(|slug| {
                self.is_section_marked(&SectionId::subtopic(
                    course_slug,
                    topic_slug,
                    slug.as_ref(),
                ))
            })
    }

    /// Apply `action`. Returns `true` if the state changed.
    pub fn apply(&mut self, action: &ProgressAction) -> bool {
        match action {
            ProgressAction::MarkSectionCompleted(id) => {
                self.sections.insert(id.to_string(), true) != Some(true)
            }
            ProgressAction::RecordQuiz { section, record } => {
                self.quizzes.insert(section.to_string(), *record) != Some(*record)
            }
            ProgressAction::ResetQuiz(id) => self.quizzes.remove(id.as_str()).is_some(),
            ProgressAction::ResetAllQuizzes => {
                let changed = !self.quizzes.is_empty();
                self.quizzes.clear();
                changed
            }
            ProgressAction::ResetCourseSections { course_slug } => {
                let before = self.sections.len();
                self.sections
                    .retain(|key, _| !key_belongs_to_course(key, course_slug));
                self.sections.len() != before
            }
            ProgressAction::ResetAllSections => {
                let changed = !self.sections.is_empty();
                self.sections.clear();
                changed
            }
            ProgressAction::ToggleBookmark(key) => {
                if self.bookmarks.remove(key).is_none() {
                    self.bookmarks.insert(key.clone(), true);
                }
                true
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding persisted records
// ---------------------------------------------------------------------------

/// Decode a persisted section mapping. Anything unreadable becomes empty.
pub fn decode_sections(raw: &str) -> SectionProgress {
    let mut sections: SectionProgress = decode_or_empty(SECTION_PROGRESS_KEY, raw);
    sections.retain(|_, done| *done);
    sections
}

/// Decode a persisted quiz mapping. A record with an impossible score
/// invalidates the whole mapping.
pub fn decode_quizzes(raw: &str) -> QuizProgress {
    let quizzes: QuizProgress = decode_or_empty(QUIZ_PROGRESS_KEY, raw);
    if let Some((key, err)) = quizzes
        .iter()
        .find_map(|(key, record)| record.check().err().map(|e| (key, e)))
    {
        warn!(key = QUIZ_PROGRESS_KEY, section = %key, error = %err, "discarding stored quiz progress");
        return QuizProgress::new();
    }
    quizzes
}

/// Decode a persisted bookmark mapping. Cleared bookmarks are dropped.
pub fn decode_bookmarks(raw: &str) -> Bookmarks {
    let mut bookmarks: Bookmarks = decode_or_empty(BOOKMARKS_KEY, raw);
    bookmarks.retain(|_, on| *on);
    bookmarks
}

fn decode_or_empty<T: DeserializeOwned + Default>(key: &str, raw: &str) -> T {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "failed to parse stored progress, starting empty");
            T::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// What a listener is told after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressChange {
    pub action: ProgressAction,
    pub mapping: ProgressMapping,
}

/// Observer notified after every action that changed progress.
pub trait ProgressListener: Send + Sync {
    fn on_change(&self, change: &ProgressChange, state: &ProgressState);
}

impl<F> ProgressListener for F
where
    F: Fn(&ProgressChange, &ProgressState) + Send + Sync,
{
    fn on_change(&self, change: &ProgressChange, state: &ProgressState) {
        self(change, state)
    }
}

/// Handle returned by [`ProgressStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Progress state bound to a storage backend and a set of listeners.
pub struct ProgressStore<S: KeyValueStore> {
    storage: S,
    state: ProgressState,
    listeners: Vec<(SubscriptionId, Box<dyn ProgressListener>)>,
    next_subscription: u64,
}

impl<S: KeyValueStore> ProgressStore<S> {
    /// Rehydrate progress from `storage`.
    ///
    /// Missing records start empty; so do unreadable ones, and so does a
    /// failing backend.
    #[instrument(skip_all)]
    pub async fn open(storage: S) -> Self {
        let sections = match load(&storage, SECTION_PROGRESS_KEY).await {
            Some(raw) => decode_sections(&raw),
            None => SectionProgress::new(),
        };
        let quizzes = match load(&storage, QUIZ_PROGRESS_KEY).await {
            Some(raw) => decode_quizzes(&raw),
            None => QuizProgress::new(),
        };
        let bookmarks = match load(&storage, BOOKMARKS_KEY).await {
            Some(raw) => decode_bookmarks(&raw),
            None => Bookmarks::new(),
        };

        debug!(
            sections = sections.len(),
            quizzes = quizzes.len(),
            bookmarks = bookmarks.len(),
            "progress rehydrated"
        );

        Self {
            storage,
            state: ProgressState::new(sections, quizzes, bookmarks),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Register a listener. It stays registered until unsubscribed.
    pub fn subscribe(&mut self, listener: impl ProgressListener + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Apply `action`, then notify listeners and persist if anything changed.
    /// Returns whether the state changed.
    #[instrument(skip(self))]
    pub async fn dispatch(&mut self, action: ProgressAction) -> bool {
        if !self.state.apply(&action) {
            debug!("no change");
            return false;
        }

        let change = ProgressChange {
            mapping: action.mapping(),
            action,
        };
        for (_, listener) in &self.listeners {
            listener.on_change(&change, &self.state);
        }

        self.persist(change.mapping).await;
        true
    }

    pub async fn mark_section_completed(&mut self, id: &SectionId) {
        self.dispatch(ProgressAction::MarkSectionCompleted(id.clone())).await;
    }

    /// Record a finished quiz. Fails only if `score`/`total` are impossible.
    pub async fn update_quiz_progress(
        &mut self,
        id: &SectionId,
        score: u32,
        total: u32,
    ) -> Result<()> {
        let record = QuizRecord::finished(score, total)?;
        self.dispatch(ProgressAction::RecordQuiz {
            section: id.clone(),
            record,
        })
        .await;
        Ok(())
    }

    pub async fn reset_quiz_progress(&mut self, id: &SectionId) {
        self.dispatch(ProgressAction::ResetQuiz(id.clone())).await;
    }

    pub async fn reset_all_quiz_progress(&mut self) {
        self.dispatch(ProgressAction::ResetAllQuizzes).await;
    }

    /// Clear completion flags of `course_slug` only.
    pub async fn reset_section_progress(&mut self, course_slug: &str) {
        self.dispatch(ProgressAction::ResetCourseSections {
            course_slug: course_slug.to_string(),
        })
        .await;
    }

    /// Clear completion flags of every course.
    pub async fn reset_all_section_progress(&mut self) {
        self.dispatch(ProgressAction::ResetAllSections).await;
    }

    /// Flip the bookmark under `key`. Returns whether it is now bookmarked.
    pub async fn toggle_bookmark(&mut self, key: &str) -> Result<bool> {
        let key = key.trim();
        if key.is_empty() {
            return Err(PurelearnError::validation("bookmark key must not be empty"));
        }
        self.dispatch(ProgressAction::ToggleBookmark(key.to_string())).await;
        Ok(self.state.is_bookmarked(key))
    }

    pub fn check_topic_completion<T: AsRef<str>>(
        &self,
        course_slug: &str,
        topic_slug: &str,
        subtopic_slugs: &[T],
    ) -> bool {
        self.state
            .check_topic_completion(course_slug, topic_slug, subtopic_slugs)
    }

    async fn persist(&self, mapping: ProgressMapping) {
        let key = mapping.storage_key();
        let encoded = match mapping {
            ProgressMapping::Sections => serde_json::to_string(&self.state.sections),
            ProgressMapping::Quizzes => serde_json::to_string(&self.state.quizzes),
            ProgressMapping::Bookmarks => serde_json::to_string(&self.state.bookmarks),
        };
        let json = match encoded {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize progress");
                return;
            }
        };
        if let Err(e) = self.storage.set(key, &json).await {
            warn!(key, error = %e, "failed to persist progress");
        }
    }
}

async fn load<S: KeyValueStore>(storage: &S, key: &str) -> Option<String> {
    match storage.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "failed to read stored progress, starting empty");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use purelearn_storage::{MemoryStore, Storage};
    use uuid::Uuid;

    fn id(raw: &str) -> SectionId {
        SectionId::from_path(raw)
    }

    async fn empty_store() -> ProgressStore<MemoryStore> {
        ProgressStore::open(MemoryStore::new()).await
    }

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("purelearn_progress_{}.db", Uuid::now_v7()))
    }

    /// Backend whose every call fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(PurelearnError::Storage("disk on fire".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(PurelearnError::Storage("disk on fire".into()))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(PurelearnError::Storage("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn mark_section_is_idempotent() {
        let mut store = empty_store().await;
        store.mark_section_completed(&id("c/t/s1")).await;
        let once = store.state().clone();
        store.mark_section_completed(&id("c/t/s1")).await;

        assert_eq!(store.state(), &once);
        assert!(store.state().is_section_marked(&id("c/t/s1")));
        assert!(!store.state().is_section_marked(&id("c/t/s2")));
    }

    #[tokio::test]
    async fn check_topic_completion_needs_every_subtopic() {
        let mut store = empty_store().await;
        store.mark_section_completed(&id("course/topic/s1")).await;
        assert!(!store.check_topic_completion("course", "topic", &["s1", "s2"]));

        store.mark_section_completed(&id("course/topic/s2")).await;
        assert!(store.check_topic_completion("course", "topic", &["s1", "s2"]));
        assert!(!store.check_topic_completion("course", "other", &["s1", "s2"]));
        assert!(!store.check_topic_completion::<&str>("course", "topic", &[]));
    }

    #[tokio::test]
    async fn quiz_retake_overwrites() {
        let mut store = empty_store().await;
        store.update_quiz_progress(&id("c/t1"), 3, 5).await.expect("record");
        store.update_quiz_progress(&id("c/t1"), 5, 5).await.expect("record");

        assert_eq!(store.state().quizzes().len(), 1);
        assert_eq!(
            store.state().quiz(&id("c/t1")),
            Some(&QuizRecord {
                completed: true,
                score: 5,
                total: 5
            })
        );
    }

    #[tokio::test]
    async fn impossible_quiz_scores_are_rejected() {
        let mut store = empty_store().await;
        assert!(store.update_quiz_progress(&id("c/t1"), 1, 0).await.is_err());
        assert!(store.update_quiz_progress(&id("c/t1"), 6, 5).await.is_err());
        assert!(store.state().quizzes().is_empty());
    }

    #[tokio::test]
    async fn quiz_resets() {
        let mut store = empty_store().await;
        store.update_quiz_progress(&id("c/a"), 1, 2).await.expect("record");
        store.update_quiz_progress(&id("c/b"), 2, 2).await.expect("record");

        store.reset_quiz_progress(&id("c/a")).await;
        assert!(store.state().quiz(&id("c/a")).is_none());
        assert!(store.state().quiz(&id("c/b")).is_some());

        store.reset_all_quiz_progress().await;
        assert!(store.state().quizzes().is_empty());
    }

    #[tokio::test]
    async fn course_reset_is_scoped_and_global_reset_is_not() {
        let mut store = empty_store().await;
        for key in ["rust/a/x", "rust/a", "rust-advanced/a/x", "go/b/y"] {
            store.mark_section_completed(&id(key)).await;
        }

        store.reset_section_progress("rust").await;
        let remaining: Vec<&String> = store.state().sections().keys().collect();
        assert_eq!(remaining, vec!["go/b/y", "rust-advanced/a/x"]);

        store.reset_all_section_progress().await;
        assert!(store.state().sections().is_empty());
    }

    #[tokio::test]
    async fn course_reset_persists_in_the_database() {
        let path = temp_db_path();
        {
            let storage = Storage::open(&path).await.expect("open db");
            let mut store = ProgressStore::open(storage).await;
            for key in ["rust/a/x", "rust/a", "rust-advanced/a/x", "go/b/y"] {
                store.mark_section_completed(&id(key)).await;
            }
            store.update_quiz_progress(&id("rust/a"), 2, 4).await.expect("record");
            store.reset_section_progress("rust").await;
        }

        let storage = Storage::open(&path).await.expect("reopen db");
        let reopened = ProgressStore::open(storage).await;
        let remaining: Vec<&String> = reopened.state().sections().keys().collect();
        assert_eq!(remaining, vec!["go/b/y", "rust-advanced/a/x"]);
        assert_eq!(
            reopened.state().quiz(&id("rust/a")),
            Some(&QuizRecord {
                completed: true,
                score: 2,
                total: 4
            })
        );
    }

    #[tokio::test]
    async fn bookmarks_toggle_and_persist() {
        let mut store = empty_store().await;
        assert!(store.toggle_bookmark("rust/basics/ownership#moves").await.expect("toggle"));
        assert!(store.toggle_bookmark("rust/basics/intro").await.expect("toggle"));
        assert!(!store.toggle_bookmark("rust/basics/intro").await.expect("toggle"));

        assert!(store.state().is_bookmarked("rust/basics/ownership#moves"));
        assert!(!store.state().is_bookmarked("rust/basics/intro"));
        let stored = store.storage().snapshot(BOOKMARKS_KEY).expect("persisted");
        assert_eq!(stored, r#"{"rust/basics/ownership#moves":true}"#);

        assert!(store.toggle_bookmark("   ").await.is_err());

        let reopened = ProgressStore::open(MemoryStore::with_entries([
            (BOOKMARKS_KEY, r#"{"a":true,"b":false}"#),
        ]))
        .await;
        let keys: Vec<&String> = reopened.state().bookmarks().keys().collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[tokio::test]
    async fn section_reset_leaves_quizzes() {
        let mut store = empty_store().await;
        store.mark_section_completed(&id("rust/a/x")).await;
        store.update_quiz_progress(&id("rust/a/x"), 1, 1).await.expect("record");

        store.reset_section_progress("rust").await;
        assert!(store.state().sections().is_empty());
        assert_eq!(store.state().quizzes().len(), 1);
    }

    #[tokio::test]
    async fn progress_survives_reopen() {
        let mut store = empty_store().await;
        store.mark_section_completed(&id("c/t/s")).await;
        store.update_quiz_progress(&id("c/t"), 2, 3).await.expect("record");

        let sections = store.storage().snapshot(SECTION_PROGRESS_KEY).expect("persisted");
        let quizzes = store.storage().snapshot(QUIZ_PROGRESS_KEY).expect("persisted");
        assert_eq!(sections, r#"{"c/t/s":true}"#);
        assert_eq!(quizzes, r#"{"c/t":{"completed":true,"score":2,"total":3}}"#);

        let reopened = ProgressStore::open(MemoryStore::with_entries([
            (SECTION_PROGRESS_KEY, sections),
            (QUIZ_PROGRESS_KEY, quizzes),
        ]))
        .await;
        assert_eq!(reopened.state(), store.state());
    }

    #[tokio::test]
    async fn corrupt_records_load_empty() {
        let store = ProgressStore::open(MemoryStore::with_entries([
            (SECTION_PROGRESS_KEY, "{not json"),
            (QUIZ_PROGRESS_KEY, r#"["wrong", "shape"]"#),
        ]))
        .await;
        assert_eq!(store.state(), &ProgressState::default());
    }

    #[tokio::test]
    async fn stored_false_flags_and_bad_scores_are_dropped() {
        let store = ProgressStore::open(MemoryStore::with_entries([
            (SECTION_PROGRESS_KEY, r#"{"c/a":true,"c/b":false}"#),
            (
                QUIZ_PROGRESS_KEY,
                r#"{"c/a":{"completed":true,"score":9,"total":3}}"#,
            ),
        ]))
        .await;
        let keys: Vec<&String> = store.state().sections().keys().collect();
        assert_eq!(keys, vec!["c/a"]);
        assert!(store.state().quizzes().is_empty());
    }

    #[tokio::test]
    async fn broken_backend_does_not_fail_operations() {
        let mut store = ProgressStore::open(BrokenStore).await;
        store.mark_section_completed(&id("c/t/s")).await;
        store.update_quiz_progress(&id("c/t"), 1, 1).await.expect("record");
        assert!(store.state().is_section_marked(&id("c/t/s")));
    }

    #[tokio::test]
    async fn listeners_fire_only_on_change() {
        let mut store = empty_store().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let sub = store.subscribe(move |change: &ProgressChange, state: &ProgressState| {
            assert_eq!(change.mapping, ProgressMapping::Sections);
            assert!(!state.sections().is_empty());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.mark_section_completed(&id("c/t/s")).await;
        store.mark_section_completed(&id("c/t/s")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.mark_section_completed(&id("c/t/other")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_op_resets_do_not_write() {
        let mut store = empty_store().await;
        assert!(!store.dispatch(ProgressAction::ResetAllQuizzes).await);
        assert!(!store.dispatch(ProgressAction::ResetQuiz(id("c/x"))).await);
        assert!(store.storage().snapshot(QUIZ_PROGRESS_KEY).is_none());
    }

    #[test]
    fn reducer_reports_changes() {
        let mut state = ProgressState::default();
        let mark = ProgressAction::MarkSectionCompleted(id("c/t"));
        assert!(state.apply(&mark));
        assert!(!state.apply(&mark));
        assert_eq!(mark.mapping(), ProgressMapping::Sections);

        let record = QuizRecord::finished(1, 2).expect("valid");
        let quiz = ProgressAction::RecordQuiz {
            section: id("c/t"),
            record,
        };
        assert!(state.apply(&quiz));
        assert!(!state.apply(&quiz));
        assert_eq!(quiz.mapping().storage_key(), QUIZ_PROGRESS_KEY);

        let bookmark = ProgressAction::ToggleBookmark("c/t#h".into());
        assert!(state.apply(&bookmark));
        assert!(state.apply(&bookmark));
        assert!(state.bookmarks().is_empty());
        assert_eq!(bookmark.mapping().storage_key(), BOOKMARKS_KEY);
    }
}
