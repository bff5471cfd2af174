// Discogs API client and collection importer.
//
// `discogs` holds the client contract plus the HTTP and mock
// implementations; `import` reconciles a user's remote collection into the
// `db` store, fanning out over pages with `pagination`.

pub mod config;
pub mod db;
pub mod discogs;
pub mod import;
pub mod pagination;

pub use config::Config;
pub use db::Database;
pub use discogs::{Discogs, DiscogsError, DiscogsHttpClient, HttpClientConfig, MockDiscogs, PageParams};
pub use import::{
    CancellationToken, CollectionImporter, ImportError, ImportObserver, ImportSummary,
    QuietObserver,
};
