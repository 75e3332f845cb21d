//! Offline book sync orchestrator.
//!
//! Mirrors a book's full content (chapter index plus every verse in the
//! requested languages) into the local store so it can be read without
//! network access. The only persistent write is a single two-collection
//! transaction at the end, so an interrupted save leaves no partial
//! state. Re-saving a book fully replaces its local content.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use library_client::api::{ChapterInfo, LibraryApi, ScriptureBook, ScriptureVerse};
use veda_db::Database;
use veda_db::books::SavedBookInfo;

/// Fixed per-verse size heuristic. The UI shows estimates; measuring the
/// serialized payload would cost a full JSON pass for no user benefit.
pub const BYTES_PER_VERSE: i64 = 1000;

/// Locally stored content blob for one book.
/// Chapter keys serialize as strings inside the verses map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineBookData {
    pub book: ScriptureBook,
    pub chapters: Vec<ChapterInfo>,
    pub verses: HashMap<String, BTreeMap<i64, Vec<ScriptureVerse>>>,
}

/// One progress update of a running save.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgress {
    pub code: String,
    pub pct: u8,
    pub status: String,
}

/// A catalog row: remote book list merged with local offline state.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub code: String,
    pub name_ru: String,
    pub name_en: String,
    pub description_ru: Option<String>,
    pub description_en: Option<String>,
    pub is_saved: bool,
    pub size_bytes: i64,
}

/// Drives offline downloads against an injected library API and store.
pub struct OfflineBookService<C> {
    api: C,
    db: Database,
    progress_tx: broadcast::Sender<SyncProgress>,
    save_locks: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C: LibraryApi> OfflineBookService<C> {
    pub fn new(api: C, db: Database) -> Self {
        let (progress_tx, _) = broadcast::channel(64);
        Self {
            api,
            db,
            progress_tx,
            save_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to progress updates. Dropping the receiver unsubscribes,
    /// so an abandoned save never reports to a dead listener.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<SyncProgress> {
        self.progress_tx.subscribe()
    }

    /// Download a book for offline reading.
    ///
    /// Languages are fetched sequentially in caller order; progress for
    /// the export phase is spread over 10-50%. Returns `false` on empty
    /// chapter index or any error, in which case nothing was written.
    /// Overlapping saves of the same code queue on a per-code lock, so
    /// the store only ever sees whole books.
    pub async fn save_book_offline(&self, book: &ScriptureBook, languages: &[&str]) -> bool {
        let lock = self.save_lock(&book.code);
        let _guard = lock.lock().await;

        match self.run_save(book, languages).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!("Failed to save book {} offline: {e}", book.code);
                self.report(&book.code, 0, "Save error");
                false
            }
        }
    }

    async fn run_save(
        &self,
        book: &ScriptureBook,
        languages: &[&str],
    ) -> Result<bool, anyhow::Error> {
        let code = book.code.as_str();

        self.report(code, 5, "Loading book structure…");
        let chapters = self.api.get_chapters(code).await?;
        if chapters.is_empty() {
            tracing::warn!("No chapters found for book {code}");
            self.report(code, 100, "Book has no chapters");
            return Ok(false);
        }

        let mut verses: HashMap<String, BTreeMap<i64, Vec<ScriptureVerse>>> = HashMap::new();
        let mut total_verses: i64 = 0;

        for (i, language) in languages.iter().enumerate() {
            let pct = 10 + (i * 40 / languages.len()) as u8;
            self.report(
                code,
                pct,
                &format!("Downloading {}…", language.to_uppercase()),
            );

            let exported = self.api.export_book(code, Some(*language)).await?;
            total_verses += exported.len() as i64;

            let by_chapter = verses.entry((*language).to_string()).or_default();
            for verse in exported {
                by_chapter.entry(verse.chapter).or_default().push(verse);
            }
        }

        self.report(code, 92, "Saving data…");

        let info = SavedBookInfo {
            code: book.code.clone(),
            name_ru: book.name_ru.clone(),
            name_en: book.name_en.clone(),
            description_ru: book.description_ru.clone(),
            description_en: book.description_en.clone(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            size_bytes: total_verses * BYTES_PER_VERSE,
            chapters_count: chapters.len() as i64,
            verses_count: total_verses,
        };
        let data = OfflineBookData {
            book: book.clone(),
            chapters,
            verses,
        };
        let data_json = serde_json::to_string(&data)?;
        self.db.save_book(&info, &data_json)?;

        self.report(code, 100, "Done");
        tracing::info!(
            "Saved book {code} offline: {} chapters, {} verses, {}",
            info.chapters_count,
            info.verses_count,
            format_bytes(info.size_bytes)
        );
        Ok(true)
    }

    /// Remove a book from offline storage. Idempotent.
    pub fn remove_book(&self, code: &str) -> bool {
        match self.db.remove_book(code) {
            Ok(()) => {
                tracing::info!("Removed offline book {code}");
                true
            }
            Err(e) => {
                tracing::error!("Failed to remove offline book {code}: {e}");
                false
            }
        }
    }

    pub fn get_saved_books(&self) -> Vec<SavedBookInfo> {
        match self.db.get_saved_books() {
            Ok(books) => books,
            Err(e) => {
                tracing::error!("Failed to list saved books: {e}");
                Vec::new()
            }
        }
    }

    pub fn is_book_saved(&self, code: &str) -> bool {
        self.db.is_book_saved(code).unwrap_or(false)
    }

    /// Estimated size of one saved book, 0 when not saved.
    pub fn saved_book_size(&self, code: &str) -> i64 {
        match self.db.get_saved_book(code) {
            Ok(Some(info)) => info.size_bytes,
            _ => 0,
        }
    }

    /// Estimated size of all saved books together.
    pub fn total_offline_size(&self) -> i64 {
        self.db.total_offline_size().unwrap_or(0)
    }

    /// Verses of one chapter in one language from offline storage.
    /// Absence at any level is a normal empty result, never an error.
    pub fn get_offline_verses(&self, code: &str, chapter: i64, language: &str) -> Vec<ScriptureVerse> {
        let Some(data) = self.book_data(code) else {
            return Vec::new();
        };
        data.verses
            .get(language)
            .and_then(|by_chapter| by_chapter.get(&chapter))
            .cloned()
            .unwrap_or_default()
    }

    /// Chapter index from offline storage, empty when not saved.
    pub fn get_offline_chapters(&self, code: &str) -> Vec<ChapterInfo> {
        match self.book_data(code) {
            Some(data) => data.chapters,
            None => Vec::new(),
        }
    }

    /// Drop every saved book.
    pub fn clear_all_offline_data(&self) -> bool {
        match self.db.clear_all_books() {
            Ok(()) => {
                tracing::info!("Cleared all offline books");
                true
            }
            Err(e) => {
                tracing::error!("Failed to clear offline books: {e}");
                false
            }
        }
    }

    /// Book catalog for the library screen: the remote list annotated
    /// with offline state. A failed catalog fetch degrades to the
    /// locally saved books instead of failing outright.
    pub async fn catalog(&self) -> Vec<CatalogEntry> {
        let saved = self.get_saved_books();
        let saved_by_code: HashMap<&str, &SavedBookInfo> =
            saved.iter().map(|b| (b.code.as_str(), b)).collect();

        let remote = match self.api.get_books().await {
            Ok(books) => books,
            Err(e) => {
                tracing::warn!("Library catalog fetch failed, showing offline books only: {e}");
                Vec::new()
            }
        };

        let mut entries: Vec<CatalogEntry> = remote
            .iter()
            .map(|book| {
                let local = saved_by_code.get(book.code.as_str());
                CatalogEntry {
                    code: book.code.clone(),
                    name_ru: book.name_ru.clone(),
                    name_en: book.name_en.clone(),
                    description_ru: book.description_ru.clone(),
                    description_en: book.description_en.clone(),
                    is_saved: local.is_some(),
                    size_bytes: local.map_or(0, |b| b.size_bytes),
                }
            })
            .collect();

        let listed: std::collections::HashSet<&str> =
            remote.iter().map(|b| b.code.as_str()).collect();
        for info in &saved {
            if !listed.contains(info.code.as_str()) {
                entries.push(CatalogEntry {
                    code: info.code.clone(),
                    name_ru: info.name_ru.clone(),
                    name_en: info.name_en.clone(),
                    description_ru: info.description_ru.clone(),
                    description_en: info.description_en.clone(),
                    is_saved: true,
                    size_bytes: info.size_bytes,
                });
            }
        }

        entries
    }

    fn book_data(&self, code: &str) -> Option<OfflineBookData> {
        let json = match self.db.get_book_data(code) {
            Ok(data) => data?,
            Err(e) => {
                tracing::error!("Failed to read offline data for {code}: {e}");
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::error!("Corrupt offline data for {code}: {e}");
                None
            }
        }
    }

    fn save_lock(&self, code: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .save_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(code.to_string()).or_default().clone()
    }

    fn report(&self, code: &str, pct: u8, status: &str) {
        let _ = self.progress_tx.send(SyncProgress {
            code: code.to_string(),
            pct,
            status: status.to_string(),
        });
    }
}

/// Format a byte count for the UI ("1.5 MB").
pub fn format_bytes(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".into();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        return format!("{bytes} B");
    }
    let rounded = format!("{value:.1}");
    let rounded = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{rounded} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_client::LibraryError;

    /// In-memory stand-in for the remote library.
    struct FakeLibrary {
        books: Vec<ScriptureBook>,
        chapters: Vec<ChapterInfo>,
        verses_by_language: HashMap<String, Vec<ScriptureVerse>>,
        fail_export: bool,
        fail_books: bool,
    }

    impl FakeLibrary {
        fn new(chapters: Vec<ChapterInfo>) -> Self {
            Self {
                books: Vec::new(),
                chapters,
                verses_by_language: HashMap::new(),
                fail_export: false,
                fail_books: false,
            }
        }

        fn with_verses(mut self, language: &str, verses: Vec<ScriptureVerse>) -> Self {
            self.verses_by_language.insert(language.to_string(), verses);
            self
        }
    }

    impl LibraryApi for FakeLibrary {
        async fn get_books(&self) -> Result<Vec<ScriptureBook>, LibraryError> {
            if self.fail_books {
                return Err(LibraryError::ApiError {
                    status: 503,
                    message: "catalog unavailable".into(),
                });
            }
            Ok(self.books.clone())
        }

        async fn get_book_details(&self, id_or_code: &str) -> Result<ScriptureBook, LibraryError> {
            self.books
                .iter()
                .find(|b| b.code == id_or_code)
                .cloned()
                .ok_or(LibraryError::ApiError {
                    status: 404,
                    message: "book not found".into(),
                })
        }

        async fn get_chapters(&self, _book_code: &str) -> Result<Vec<ChapterInfo>, LibraryError> {
            Ok(self.chapters.clone())
        }

        async fn export_book(
            &self,
            _book_code: &str,
            language: Option<&str>,
        ) -> Result<Vec<ScriptureVerse>, LibraryError> {
            if self.fail_export {
                return Err(LibraryError::ApiError {
                    status: 500,
                    message: "export failed".into(),
                });
            }
            let language = language.unwrap_or("ru");
            Ok(self
                .verses_by_language
                .get(language)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn book(code: &str) -> ScriptureBook {
        ScriptureBook {
            id: 1,
            code: code.into(),
            name_en: "Bhagavad-gita".into(),
            name_ru: "Бхагавад-гита".into(),
            description_en: None,
            description_ru: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn verse(id: i64, chapter: i64, label: &str, language: &str) -> ScriptureVerse {
        ScriptureVerse {
            id,
            book_code: "bg".into(),
            canto: 0,
            chapter,
            verse: label.into(),
            language: language.into(),
            devanagari: String::new(),
            transliteration: String::new(),
            synonyms: String::new(),
            translation: format!("translation {label}"),
            purport: String::new(),
            source_url: None,
            verse_reference: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn two_chapters() -> Vec<ChapterInfo> {
        vec![
            ChapterInfo { canto: 0, chapter: 1 },
            ChapterInfo { canto: 0, chapter: 2 },
        ]
    }

    fn ten_verses(language: &str) -> Vec<ScriptureVerse> {
        (0..10)
            .map(|i| {
                let chapter = if i < 4 { 1 } else { 2 };
                verse(i, chapter, &format!("{}", i + 1), language)
            })
            .collect()
    }

    fn service(fake: FakeLibrary) -> OfflineBookService<FakeLibrary> {
        OfflineBookService::new(fake, Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn save_two_languages_records_metadata_and_content() {
        let fake = FakeLibrary::new(two_chapters())
            .with_verses("ru", ten_verses("ru"))
            .with_verses("en", ten_verses("en"));
        let svc = service(fake);

        assert!(svc.save_book_offline(&book("bg"), &["ru", "en"]).await);

        let saved = svc.get_saved_books();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].code, "bg");
        assert_eq!(saved[0].chapters_count, 2);
        assert_eq!(saved[0].verses_count, 20);
        assert_eq!(saved[0].size_bytes, 20 * BYTES_PER_VERSE);

        assert!(svc.is_book_saved("bg"));
        assert_eq!(svc.saved_book_size("bg"), 20_000);
        assert_eq!(svc.total_offline_size(), 20_000);
        assert_eq!(svc.get_offline_chapters("bg"), two_chapters());

        let ru_ch1 = svc.get_offline_verses("bg", 1, "ru");
        assert_eq!(ru_ch1.len(), 4);
        assert!(ru_ch1.iter().all(|v| v.language == "ru" && v.chapter == 1));
        // Server return order is preserved, no client-side re-sort
        let labels: Vec<&str> = ru_ch1.iter().map(|v| v.verse.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3", "4"]);

        assert_eq!(svc.get_offline_verses("bg", 2, "en").len(), 6);
    }

    #[tokio::test]
    async fn save_reports_progress_checkpoints() {
        let fake = FakeLibrary::new(two_chapters())
            .with_verses("ru", ten_verses("ru"))
            .with_verses("en", ten_verses("en"));
        let svc = service(fake);
        let mut rx = svc.subscribe_progress();

        assert!(svc.save_book_offline(&book("bg"), &["ru", "en"]).await);

        let mut pcts = Vec::new();
        while let Ok(update) = rx.try_recv() {
            assert_eq!(update.code, "bg");
            pcts.push(update.pct);
        }
        assert_eq!(pcts, vec![5, 10, 30, 92, 100]);
    }

    #[tokio::test]
    async fn empty_chapter_index_fails_without_writing() {
        let fake = FakeLibrary::new(Vec::new());
        let svc = service(fake);
        let mut rx = svc.subscribe_progress();

        assert!(!svc.save_book_offline(&book("bg"), &["ru"]).await);

        assert!(svc.get_saved_books().is_empty());
        assert!(!svc.is_book_saved("bg"));
        assert!(svc.get_offline_chapters("bg").is_empty());

        let mut last = None;
        while let Ok(update) = rx.try_recv() {
            last = Some(update);
        }
        let last = last.unwrap();
        assert_eq!(last.pct, 100);
        assert_eq!(last.status, "Book has no chapters");
    }

    #[tokio::test]
    async fn export_failure_fails_without_partial_state() {
        let mut fake = FakeLibrary::new(two_chapters()).with_verses("ru", ten_verses("ru"));
        fake.fail_export = true;
        let svc = service(fake);
        let mut rx = svc.subscribe_progress();

        assert!(!svc.save_book_offline(&book("bg"), &["ru"]).await);

        assert!(svc.get_saved_books().is_empty());
        assert!(svc.get_offline_verses("bg", 1, "ru").is_empty());

        let mut last = None;
        while let Ok(update) = rx.try_recv() {
            last = Some(update);
        }
        let last = last.unwrap();
        assert_eq!(last.pct, 0);
        assert_eq!(last.status, "Save error");
    }

    #[tokio::test]
    async fn resave_fully_replaces_prior_content() {
        let fake = FakeLibrary::new(two_chapters())
            .with_verses("ru", ten_verses("ru"))
            .with_verses("en", ten_verses("en"));
        let svc = service(fake);

        assert!(svc.save_book_offline(&book("bg"), &["ru", "en"]).await);
        assert!(svc.save_book_offline(&book("bg"), &["ru"]).await);

        let saved = svc.get_saved_books();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].verses_count, 10, "second save wins wholesale");

        assert_eq!(svc.get_offline_verses("bg", 1, "ru").len(), 4);
        assert!(
            svc.get_offline_verses("bg", 1, "en").is_empty(),
            "English was not part of the second save"
        );
    }

    #[tokio::test]
    async fn remove_book_clears_all_reads() {
        let fake = FakeLibrary::new(two_chapters()).with_verses("ru", ten_verses("ru"));
        let svc = service(fake);

        assert!(svc.save_book_offline(&book("bg"), &["ru"]).await);
        assert!(svc.remove_book("bg"));

        assert!(svc.get_saved_books().is_empty());
        assert!(svc.get_offline_verses("bg", 1, "ru").is_empty());
        assert!(svc.get_offline_chapters("bg").is_empty());

        // Idempotent
        assert!(svc.remove_book("bg"));
    }

    #[tokio::test]
    async fn offline_reads_on_unsaved_book_are_empty() {
        let svc = service(FakeLibrary::new(Vec::new()));
        assert!(svc.get_offline_verses("never-saved", 1, "ru").is_empty());
        assert!(svc.get_offline_chapters("never-saved").is_empty());
        assert_eq!(svc.saved_book_size("never-saved"), 0);
    }

    #[tokio::test]
    async fn catalog_degrades_to_local_books_on_network_failure() {
        let mut fake = FakeLibrary::new(two_chapters()).with_verses("ru", ten_verses("ru"));
        fake.books = vec![book("bg")];
        let svc = service(fake);
        assert!(svc.save_book_offline(&book("bg"), &["ru"]).await);

        // Remote list available: annotated with offline state
        let entries = svc.catalog().await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_saved);
        assert_eq!(entries[0].size_bytes, 10_000);

        // Catalog endpoint failing: the saved book still shows up from
        // local metadata
        let mut failing = FakeLibrary::new(Vec::new());
        failing.fail_books = true;
        let offline_only = OfflineBookService {
            api: failing,
            db: svc.db.clone(),
            progress_tx: broadcast::channel(8).0,
            save_locks: std::sync::Mutex::new(HashMap::new()),
        };
        let entries = offline_only.catalog().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].code, "bg");
        assert!(entries[0].is_saved);
    }

    #[test]
    fn format_bytes_rounds_to_one_decimal() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(20_000), "19.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
    }
}
