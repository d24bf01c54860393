//! Query execution for the library views.
//!
//! [`LibraryQueryService`] compiles a [`FilterSpec`] with the
//! [`compiler`](crate::compiler) and runs it through a [`DatabaseAdapter`].
//! Paged calls wrap the compiled query twice: once in
//! `SELECT COUNT(*) FROM (...)` for the total and once with
//! `LIMIT ? OFFSET ?` for the rows.

use crate::compiler::{self, CompiledQuery};
use crate::error::{LibraryError, Result};
use crate::filter::FilterSpec;
use crate::models::{
    get_i64, get_string, row_to_album, row_to_album_header, row_to_tag_with_count,
    row_to_track_row, Album, AlbumId, LibraryAlbumHeaderRow, LibraryTrackRow, TagWithCount,
};
use crate::normalize::{normalize_token, split_display_tokens};
use crate::pagination::{Page, PageRequest};
use bridge_traits::database::{DatabaseAdapter, QueryRow, QueryValue};
use futures::stream::{self, BoxStream};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Rows per page when no page size is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Runs compiled library queries against a database adapter.
#[derive(Clone)]
pub struct LibraryQueryService {
    adapter: Arc<dyn DatabaseAdapter>,
    page_size: u32,
}

impl LibraryQueryService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self {
            adapter,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size used by [`stream_tracks`](Self::stream_tracks) and
    /// [`first_page`](Self::first_page).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// First page at the configured page size.
    pub fn first_page(&self) -> PageRequest {
        PageRequest::first(self.page_size)
    }

    /// Albums matching `spec`, one page at a time.
    #[instrument(skip(self, spec), fields(page = request.page, page_size = request.page_size))]
    pub async fn query_albums(
        &self,
        spec: &FilterSpec,
        request: PageRequest,
    ) -> Result<Page<Album>> {
        let query = compiler::compile_albums(spec);
        self.fetch_page(&query, request, row_to_album).await
    }

    /// Tracks across the library, each joined to its album.
    #[instrument(skip(self, spec), fields(page = request.page, page_size = request.page_size))]
    pub async fn query_tracks(
        &self,
        spec: &FilterSpec,
        request: PageRequest,
    ) -> Result<Page<LibraryTrackRow>> {
        let query = compiler::compile_tracks(spec);
        self.fetch_page(&query, request, row_to_track_row).await
    }

    /// One header per album that owns at least one matching track.
    #[instrument(skip(self, spec), fields(page = request.page, page_size = request.page_size))]
    pub async fn query_track_album_headers(
        &self,
        spec: &FilterSpec,
        request: PageRequest,
    ) -> Result<Page<LibraryAlbumHeaderRow>> {
        let query = compiler::compile_track_album_headers(spec);
        self.fetch_page(&query, request, row_to_album_header).await
    }

    /// Stream every matching track without holding the whole result set.
    ///
    /// Pages are fetched lazily at the configured page size.
    pub fn stream_tracks(
        &self,
        spec: FilterSpec,
    ) -> Result<BoxStream<'static, Result<LibraryTrackRow>>> {
        validate_page_size(self.page_size)?;

        let initial_state = TrackStreamState {
            service: self.clone(),
            spec,
            next_request: Some(self.first_page()),
            buffer: VecDeque::new(),
        };

        let stream = stream::try_unfold(initial_state, |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Ok(Some((item, state)));
                }

                let Some(request) = state.next_request.take() else {
                    return Ok(None);
                };

                let page = state.service.query_tracks(&state.spec, request).await?;
                state.next_request = page.next_request();
                state.buffer = VecDeque::from(page.items);
            }
        });

        Ok(Box::pin(stream))
    }

    /// All tracks of one album that match `spec`.
    ///
    /// Fails with `NotFound` when the album does not exist; an existing
    /// album with no matching track gives an empty list.
    #[instrument(skip(self, spec), fields(album_id = %album_id))]
    pub async fn album_tracks(
        &self,
        spec: &FilterSpec,
        album_id: AlbumId,
    ) -> Result<Vec<LibraryTrackRow>> {
        let exists = self
            .adapter
            .query_one_optional(
                "SELECT id FROM albums WHERE id = ?",
                &[QueryValue::from(album_id)],
            )
            .await?;
        if exists.is_none() {
            return Err(LibraryError::NotFound {
                entity_type: "Album".to_string(),
                id: album_id.to_string(),
            });
        }

        let query = compiler::compile_album_tracks(spec, album_id);
        self.fetch_all(&query, row_to_track_row).await
    }

    /// Played albums, most recent first.
    pub async fn recently_played_albums(&self, limit: u32) -> Result<Vec<Album>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .adapter
            .query(
                "SELECT a.* FROM albums a \
                 JOIN album_play_stats ps ON ps.album_id = a.id \
                 ORDER BY ps.last_played_at DESC, a.id DESC LIMIT ?",
                &[QueryValue::Integer(i64::from(limit))],
            )
            .await?;
        rows.iter().map(row_to_album).collect()
    }

    /// Non-empty circle names, case-insensitively sorted.
    pub async fn distinct_circles(&self) -> Result<Vec<String>> {
        let rows = self
            .adapter
            .query(
                "SELECT DISTINCT circle FROM albums WHERE circle != '' \
                 ORDER BY circle COLLATE NOCASE",
                &[],
            )
            .await?;
        rows.iter().map(|row| get_string(row, "circle")).collect()
    }

    /// Individual voice actors named across all albums.
    ///
    /// Credit fields are split into names and names that normalize to the
    /// same key are listed once, under the first spelling seen.
    pub async fn distinct_voice_actors(&self) -> Result<Vec<String>> {
        let rows = self
            .adapter
            .query(
                "SELECT DISTINCT cv FROM albums WHERE cv != '' ORDER BY cv COLLATE NOCASE",
                &[],
            )
            .await?;

        let mut seen = BTreeSet::new();
        let mut actors = Vec::new();
        for row in &rows {
            for name in split_display_tokens(&get_string(row, "cv")?) {
                let key = normalize_token(&name);
                if !key.is_empty() && seen.insert(key) {
                    actors.push(name);
                }
            }
        }
        actors.sort_by_key(|name| name.to_lowercase());

        debug!(fields = rows.len(), actors = actors.len(), "Listed voice actors");
        Ok(actors)
    }

    /// Every tag with the number of distinct albums carrying it.
    pub async fn tags_with_counts(&self) -> Result<Vec<TagWithCount>> {
        let rows = self
            .adapter
            .query(
                "SELECT t.id AS id, t.name AS name, t.name_normalized AS name_normalized, \
                 (SELECT COUNT(DISTINCT at.album_id) FROM album_tag at WHERE at.tag_id = t.id) \
                 AS album_count \
                 FROM tags t ORDER BY album_count DESC, t.name_normalized ASC",
                &[],
            )
            .await?;
        rows.iter().map(row_to_tag_with_count).collect()
    }

    /// Number of rows `query` returns.
    pub async fn count(&self, query: &CompiledQuery) -> Result<u64> {
        let count_query = query.count_query();
        let row = self
            .adapter
            .query_one(count_query.sql(), &count_query.to_query_values())
            .await?;
        Ok(get_i64(&row, "count")?.max(0) as u64)
    }

    async fn fetch_page<T>(
        &self,
        query: &CompiledQuery,
        request: PageRequest,
        map: fn(&QueryRow) -> Result<T>,
    ) -> Result<Page<T>> {
        validate_page_size(request.page_size)?;

        let total = self.count(query).await?;
        let paged = query.paginated(request.limit(), request.offset());
        let items = self.fetch_all(&paged, map).await?;

        debug!(
            shape = ?query.shape(),
            total,
            returned = items.len(),
            "Fetched library page"
        );
        Ok(Page::new(items, total, request))
    }

    async fn fetch_all<T>(
        &self,
        query: &CompiledQuery,
        map: fn(&QueryRow) -> Result<T>,
    ) -> Result<Vec<T>> {
        let rows = self
            .adapter
            .query(query.sql(), &query.to_query_values())
            .await?;
        rows.iter().map(map).collect()
    }
}

struct TrackStreamState {
    service: LibraryQueryService,
    spec: FilterSpec,
    next_request: Option<PageRequest>,
    buffer: VecDeque<LibraryTrackRow>,
}

fn validate_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 {
        return Err(LibraryError::InvalidInput {
            field: "page_size".to_string(),
            message: "page size must be at least 1".to_string(),
        });
    }
    Ok(())
}
