// Collection import: a strictly sequenced workflow that pulls a user's
// custom fields, folders and folder items from Discogs and reconciles them
// into the local store by remote identifier.

pub mod pipeline;

use crate::discogs::DiscogsError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    /// No folder with ID `0` was retrieved. Every user's collection has a
    /// `0` folder, so this usually means the folder fetch itself was bad.
    #[error("no 'all items' folder (ID 0) was found in the user's collection")]
    NoAllFolderWasFound,
    /// An import for this username is already in flight.
    #[error("an import is already running for user {0}")]
    ImportAlreadyRunning(String),
    #[error("import was cancelled")]
    Cancelled,
    #[error("Discogs call failed: {0}")]
    Discogs(#[from] DiscogsError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Cooperative cancellation flag, checked at every pipeline stage boundary
/// and before each page fetch is issued. Cancelling never rolls back pages
/// that already resolved; it prevents the run from reaching the commit.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Observer notified at run start and immediately before the final commit.
/// These are the only externally observable progress signals.
pub trait ImportObserver: Send + Sync {
    fn will_begin_importing(&self) {}
    fn will_finish_importing(&self) {}
}

/// Observer that ignores every notification.
pub struct QuietObserver;

impl ImportObserver for QuietObserver {}

/// What a completed run touched. `dropped_pages` counts item pages that
/// failed and were tolerated; anything in it means the local data is
/// under-counted, not wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub custom_fields: usize,
    pub folders: usize,
    pub items: usize,
    pub folder_memberships: usize,
    pub dropped_pages: usize,
}

pub use pipeline::{CollectionImporter, DEFAULT_PAGE_SIZE};
