// ABOUTME: Public library API for markdown ↔ Notion sync
// ABOUTME: Re-exports core modules for external use

pub mod api;
pub mod block;
pub mod cli;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod link;
pub mod model;
pub mod pull;
pub mod render;
pub mod schema;
pub mod storage;
pub mod sync;
pub mod throttle;
pub mod util;

pub use error::{Error, Result};
pub use model::{Page, RemoteBlock};
