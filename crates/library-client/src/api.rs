//! Library REST API client.
//!
//! Provides typed access to the scripture library endpoints with
//! Bearer token header injection when a token is configured. All calls
//! are read-only; errors propagate to the caller with no local retry.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::LibraryError;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A scripture volume from GET /library/books.
///
/// `code` is the stable natural key; `id` only appears in admin flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptureBook {
    pub id: i64,
    pub code: String,
    pub name_en: String,
    pub name_ru: String,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_ru: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A (canto, chapter) coordinate from GET /library/books/{code}/chapters.
/// Canto is 0 for books without cantos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    #[serde(default)]
    pub canto: i64,
    pub chapter: i64,
}

/// A single verse with original script, transliteration, translation
/// and commentary, scoped to one chapter and one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptureVerse {
    pub id: i64,
    pub book_code: String,
    #[serde(default)]
    pub canto: i64,
    pub chapter: i64,
    /// Verse label; not necessarily numeric ("16-17" ranges exist).
    pub verse: String,
    pub language: String,
    #[serde(default)]
    pub devanagari: String,
    #[serde(default)]
    pub transliteration: String,
    #[serde(default)]
    pub synonyms: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub purport: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub verse_reference: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// The subset of the library API the offline sync orchestrator consumes.
/// Implemented by [`LibraryClient`] and by test fakes.
#[allow(async_fn_in_trait)]
pub trait LibraryApi {
    async fn get_books(&self) -> Result<Vec<ScriptureBook>, LibraryError>;
    async fn get_book_details(&self, id_or_code: &str) -> Result<ScriptureBook, LibraryError>;
    async fn get_chapters(&self, book_code: &str) -> Result<Vec<ChapterInfo>, LibraryError>;
    async fn export_book(
        &self,
        book_code: &str,
        language: Option<&str>,
    ) -> Result<Vec<ScriptureVerse>, LibraryError>;
}

/// Library API client with optional Bearer token injection.
#[derive(Clone)]
pub struct LibraryClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl LibraryClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build request headers, attaching the Bearer token when present.
    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let bearer = format!("Bearer {token}");
            if let Ok(value) = HeaderValue::from_str(&bearer) {
                headers.insert(AUTHORIZATION, value);
            } else {
                tracing::warn!("Library API token contains invalid header characters, skipping");
            }
        }
        headers
    }

    /// Execute a GET request. Non-2xx responses become `ApiError` with
    /// the raw body as message.
    async fn get_text(&self, url: &str) -> Result<String, LibraryError> {
        let resp = self
            .http
            .get(url)
            .headers(self.request_headers())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(LibraryError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    // -----------------------------------------------------------------------
    // Endpoints
    // -----------------------------------------------------------------------

    /// Full book catalog. The API exposes no pagination here.
    pub async fn get_books(&self) -> Result<Vec<ScriptureBook>, LibraryError> {
        let url = format!("{}/library/books", self.base_url);
        let body = self.get_text(&url).await?;
        let books: Vec<ScriptureBook> = serde_json::from_str(&body)?;
        Ok(books)
    }

    /// Single-book lookup accepting either the numeric id or the code.
    pub async fn get_book_details(&self, id_or_code: &str) -> Result<ScriptureBook, LibraryError> {
        let url = format!("{}/library/books/{id_or_code}", self.base_url);
        let body = self.get_text(&url).await?;
        let book: ScriptureBook = serde_json::from_str(&body)?;
        Ok(book)
    }

    /// Ordered list of (canto, chapter) pairs available for a book.
    pub async fn get_chapters(&self, book_code: &str) -> Result<Vec<ChapterInfo>, LibraryError> {
        let url = format!("{}/library/books/{book_code}/chapters", self.base_url);
        let body = self.get_text(&url).await?;
        let chapters: Vec<ChapterInfo> = serde_json::from_str(&body)?;
        Ok(chapters)
    }

    /// Verses for one chapter. `canto` and `language` are omitted from
    /// the query string when absent.
    pub async fn get_verses(
        &self,
        book_code: &str,
        chapter: i64,
        canto: Option<i64>,
        language: Option<&str>,
    ) -> Result<Vec<ScriptureVerse>, LibraryError> {
        let query = build_verses_query(book_code, chapter, canto, language);
        let url = format!("{}/library/verses?{query}", self.base_url);
        let body = self.get_text(&url).await?;
        let verses: Vec<ScriptureVerse> = serde_json::from_str(&body)?;
        Ok(verses)
    }

    /// Free-text search across verse content, server-side.
    pub async fn search(&self, query: &str) -> Result<Vec<ScriptureVerse>, LibraryError> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let url = format!("{}/library/search?q={encoded}", self.base_url);
        let body = self.get_text(&url).await?;
        let verses: Vec<ScriptureVerse> = serde_json::from_str(&body)?;
        Ok(verses)
    }

    /// Bulk export of all verses of a book (all chapters and cantos) in
    /// one call, optionally filtered to one language.
    pub async fn export_book(
        &self,
        book_code: &str,
        language: Option<&str>,
    ) -> Result<Vec<ScriptureVerse>, LibraryError> {
        let mut url = format!("{}/library/books/{book_code}/export", self.base_url);
        if let Some(language) = language {
            url.push_str("?language=");
            url.push_str(language);
        }
        let body = self.get_text(&url).await?;
        let verses: Vec<ScriptureVerse> = serde_json::from_str(&body)?;
        Ok(verses)
    }
}

impl LibraryApi for LibraryClient {
    async fn get_books(&self) -> Result<Vec<ScriptureBook>, LibraryError> {
        LibraryClient::get_books(self).await
    }

    async fn get_book_details(&self, id_or_code: &str) -> Result<ScriptureBook, LibraryError> {
        LibraryClient::get_book_details(self, id_or_code).await
    }

    async fn get_chapters(&self, book_code: &str) -> Result<Vec<ChapterInfo>, LibraryError> {
        LibraryClient::get_chapters(self, book_code).await
    }

    async fn export_book(
        &self,
        book_code: &str,
        language: Option<&str>,
    ) -> Result<Vec<ScriptureVerse>, LibraryError> {
        LibraryClient::export_book(self, book_code, language).await
    }
}

fn build_verses_query(
    book_code: &str,
    chapter: i64,
    canto: Option<i64>,
    language: Option<&str>,
) -> String {
    let mut query = format!("book_code={book_code}&chapter={chapter}");
    if let Some(canto) = canto {
        query.push_str(&format!("&canto={canto}"));
    }
    if let Some(language) = language {
        query.push_str("&language=");
        query.push_str(language);
    }
    query
}
