//! Video library for a social-networking platform.
//!
//! Persists, queries and deletes video records stored in the shared media table,
//! with scope-based filtering, offset pagination, generation-invalidated caching
//! and cascading deletes across attachments and activity entries.

pub mod activities;
pub mod app_config;
pub mod attachment;
pub mod cache;
pub mod constants;
pub mod db;
pub mod orm;
pub mod permission;
pub mod storage;
pub mod user;
pub mod video;

pub use permission::Caller;
pub use video::{VideoDraft, VideoError, VideoQueryArgs, VideoRepository};
