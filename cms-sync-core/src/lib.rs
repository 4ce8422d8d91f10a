#![doc = "cms-sync-core: core logic library for cms-sync."]

//! This crate contains the content ingestion pipeline: Drive documents become blog
//! posts, Photos albums become cosplay albums, and both collections are written to a
//! key-value store.
//!
//! # Usage
//! Outer adapters call [`synchronise::sync_content`] (or [`synchronise::run_sync`] for
//! full control) and render the stored collections through [`store`].

pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod preprocess;
pub mod store;
pub mod synchronise;
