pub mod client;
pub mod http;
pub mod mock;
pub mod models;

pub use client::{Discogs, DiscogsError, PageParams};
pub use http::{DiscogsHttpClient, HttpClientConfig, DISCOGS_API_BASE_URL};
pub use mock::MockDiscogs;
pub use models::*;
