pub mod feed;
pub mod ingest;
pub mod readings;
