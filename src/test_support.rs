//! Shared fixtures for unit tests.

use crate::db;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    io::{Cursor, Write},
    str::FromStr,
};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Single-connection in-memory database with the schema applied.
///
/// The one connection is never recycled, so the database lives as long as the pool.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory sqlite should open");
    db::run_migrations(&pool)
        .await
        .expect("migrations should apply");
    pool
}

fn write_zip<D: AsRef<[u8]>>(entries: &[(&str, D)], method: CompressionMethod) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        let options = SimpleFileOptions::default().compression_method(method);
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("add directory");
        } else {
            writer.start_file(*name, options).expect("start file");
            writer.write_all(data.as_ref()).expect("write entry");
        }
    }
    writer.finish().expect("finish archive").into_inner()
}

/// Deflate-compressed archive; names ending in `/` become directory entries.
pub fn build_zip<D: AsRef<[u8]>>(entries: &[(&str, D)]) -> Vec<u8> {
    write_zip(entries, CompressionMethod::Deflated)
}

/// Archive with uncompressed entries, so payloads can be located and damaged.
pub fn build_stored_zip<D: AsRef<[u8]>>(entries: &[(&str, D)]) -> Vec<u8> {
    write_zip(entries, CompressionMethod::Stored)
}

pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
