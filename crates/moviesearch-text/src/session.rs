//! Writer/reader session over one index location.
//!
//! The session starts without a writer. The first mutating call opens a
//! shared writer that later updates, deletes and clears reuse; each of them
//! commits before returning. A full rebuild closes the shared writer and runs
//! through a writer of its own that is committed and closed before `build`
//! returns. A failed mutating call drops its writer, which discards
//! uncommitted operations and releases the directory lock.
//!
//! The lock on `.tantivy-writer.lock` is an OS file lock, released when the
//! holding process exits, so a file left behind by a crash never blocks a
//! new writer. Only a live holder makes it busy; see
//! `IndexSettings::force_unlock` for what happens then.
//!
//! Searches never touch the writer: they reload the reader to the latest
//! commit, take a searcher snapshot and let it go when done.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::error::LockError;
use tantivy::directory::MmapDirectory;
use tantivy::query::Query;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError};
use tracing::{debug, info, instrument, warn};

use moviesearch_core::config::IndexSettings;
use moviesearch_core::types::{Movie, MovieId, SearchResults};

use crate::document::MovieFields;
use crate::error::{IndexError, IndexResult};
use crate::tantivy_utils::{build_schema, register_tokenizer};

/// File tantivy locks while an `IndexWriter` is alive.
pub const WRITER_LOCK_FILE: &str = ".tantivy-writer.lock";

pub struct IndexSession {
    index: Index,
    reader: IndexReader,
    writer: Mutex<Option<IndexWriter>>,
    fields: MovieFields,
    settings: IndexSettings,
    dir: Option<PathBuf>,
}

impl IndexSession {
    /// Opens (or creates) the index stored in `dir`. No writer is opened yet.
    #[instrument(skip(settings))]
    pub fn open(dir: &Path, settings: IndexSettings) -> IndexResult<Self> {
        fs::create_dir_all(dir)?;
        let directory = MmapDirectory::open(dir)?;
        let index = Index::open_or_create(directory, build_schema())?;
        Self::from_index(index, settings, Some(dir.to_path_buf()))
    }

    pub fn in_memory(settings: IndexSettings) -> IndexResult<Self> {
        Self::from_index(Index::create_in_ram(build_schema()), settings, None)
    }

    fn from_index(index: Index, settings: IndexSettings, dir: Option<PathBuf>) -> IndexResult<Self> {
        register_tokenizer(&index);
        let fields = MovieFields::from_schema(&index.schema())?;
        let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        Ok(Self { index, reader, writer: Mutex::new(None), fields, settings, dir })
    }

    pub fn index(&self) -> &Index { &self.index }

    pub fn fields(&self) -> &MovieFields { &self.fields }

    pub fn settings(&self) -> &IndexSettings { &self.settings }

    pub fn dir(&self) -> Option<&Path> { self.dir.as_deref() }

    /// Whether the shared writer is currently held.
    pub fn is_open(&self) -> bool { self.writer.lock().is_some() }

    /// Indexes every movie with delete-then-insert on its id and commits once.
    ///
    /// `None` is rejected; an empty slice is a valid (empty) rebuild.
    #[instrument(skip_all)]
    pub fn build(&self, movies: Option<&[Movie]>) -> IndexResult<usize> {
        let movies = movies.ok_or_else(|| IndexError::InvalidArgument("build requires a movie collection".into()))?;
        let mut shared = self.writer.lock();
        if let Some(writer) = shared.take() {
            debug!("closing shared writer before rebuild");
            drop(writer);
        }
        let mut writer = self.new_writer()?;
        for movie in movies {
            writer.delete_term(self.fields.id_term(movie.id));
            writer.add_document(self.fields.to_document(movie, self.settings.snippet_length))?;
        }
        writer.commit()?;
        writer.wait_merging_threads()?;
        info!(count = movies.len(), "rebuilt movie index");
        Ok(movies.len())
    }

    /// Replaces the document for `movie.id`; `None` is a no-op.
    #[instrument(skip_all)]
    pub fn update_one(&self, movie: Option<&Movie>) -> IndexResult<()> {
        let Some(movie) = movie else {
            debug!("no movie given, nothing to update");
            return Ok(());
        };
        let snippet_length = self.settings.snippet_length;
        self.with_writer(|writer, fields| {
            writer.delete_term(fields.id_term(movie.id));
            writer.add_document(fields.to_document(movie, snippet_length))?;
            writer.commit()?;
            Ok(())
        })?;
        debug!(id = movie.id, "updated movie");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_one(&self, id: MovieId) -> IndexResult<()> {
        self.with_writer(|writer, fields| {
            writer.delete_term(fields.id_term(id));
            writer.commit()?;
            Ok(())
        })
    }

    /// Deletes every document. Failures, including a writer that cannot be
    /// obtained, come back as `false` with nothing changed.
    #[instrument(skip(self))]
    pub fn clear_all(&self) -> bool {
        let result = self.with_writer(|writer, _| {
            writer.delete_all_documents()?;
            writer.commit()?;
            Ok(())
        });
        match result {
            Ok(()) => {
                info!("cleared movie index");
                true
            }
            Err(err) => {
                warn!(error = %err, "could not clear movie index");
                false
            }
        }
    }

    /// Runs `query` against the latest commit and returns up to `page_size`
    /// hits. Blocks while the reader reloads.
    pub fn search(&self, query: &dyn Query, page_size: usize) -> IndexResult<SearchResults> {
        self.reader.reload()?;
        let searcher = self.reader.searcher();
        let (top_docs, total_hits) = searcher.search(query, &(TopDocs::with_limit(page_size.max(1)), Count))?;
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            hits.push(self.fields.to_hit(&doc, score));
        }
        debug!(total_hits, returned = hits.len(), "search finished");
        Ok(SearchResults { total_hits, hits })
    }

    pub fn doc_count(&self) -> IndexResult<u64> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs())
    }

    /// Closes the shared writer, releasing the directory lock whatever state
    /// earlier calls left it in.
    pub fn dispose(&self) {
        if let Some(writer) = self.writer.lock().take() {
            if let Err(err) = writer.wait_merging_threads() {
                warn!(error = %err, "index writer closed with pending merge failure");
            }
            debug!("released index writer");
        }
    }

    fn with_writer<T>(&self, op: impl FnOnce(&mut IndexWriter, &MovieFields) -> IndexResult<T>) -> IndexResult<T> {
        let mut shared = self.writer.lock();
        let mut writer = match shared.take() {
            Some(writer) => writer,
            None => {
                debug!("opening shared index writer");
                self.new_writer()?
            }
        };
        match op(&mut writer, &self.fields) {
            Ok(value) => {
                *shared = Some(writer);
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "index write failed, discarding writer");
                drop(writer);
                Err(err)
            }
        }
    }

    /// Opens a writer. A busy lock is reported as `LockHeld`, unless
    /// `force_unlock` is set; then the lock file is unlinked and the open
    /// retried once.
    fn new_writer(&self) -> IndexResult<IndexWriter> {
        match self.try_writer() {
            Err(err) if is_lock_busy(&err) => {
                if !self.settings.force_unlock {
                    return Err(IndexError::LockHeld(err.to_string()));
                }
                if let Some(dir) = &self.dir {
                    warn!(dir = %dir.display(), "writer lock busy, forcing unlock");
                    clear_stale_lock(dir)?;
                }
                self.try_writer().map_err(|err| {
                    if is_lock_busy(&err) { IndexError::LockHeld(err.to_string()) } else { IndexError::Engine(err) }
                })
            }
            other => Ok(other?),
        }
    }

    fn try_writer(&self) -> Result<IndexWriter, TantivyError> {
        self.index.writer_with_num_threads(self.settings.writer_threads, self.settings.writer_heap_bytes)
    }
}

impl Drop for IndexSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn is_lock_busy(err: &TantivyError) -> bool {
    matches!(err, TantivyError::LockFailure(LockError::LockBusy, _))
}

/// Unlinks the writer lock file in `dir`, returning whether one was there.
/// A writer still holding the old file keeps its OS lock on it, so the next
/// writer opened on `dir` no longer sees the lock busy.
pub fn clear_stale_lock(dir: &Path) -> IndexResult<bool> {
    if !dir.join(WRITER_LOCK_FILE).exists() {
        return Ok(false);
    }
    debug!(dir = %dir.display(), "removing leftover index writer lock");
    remove_lock_file(dir)?;
    Ok(true)
}

fn remove_lock_file(dir: &Path) -> IndexResult<()> {
    match fs::remove_file(dir.join(WRITER_LOCK_FILE)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
