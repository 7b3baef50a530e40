//! Domain services: on-disk layout, content-addressed storage, archive
//! extraction, persistence, ingestion, and authentication.

pub mod archive;
pub mod auth;
pub mod collection_repository;
pub mod collection_service;
pub mod content_store;
pub mod ingest_service;
pub mod layout;
