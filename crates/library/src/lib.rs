//! Directory ingestion and concurrent upload orchestration.
//!
//! A [`Session`] walks through the whole lifecycle: a folder is
//! [collected](collect) into a [`Batch`], checked against the size
//! [limit](guard), its images are [recompressed](optimize), and finally
//! every file is [uploaded](upload) at once while a single overall
//! percentage is published.

pub mod collect;
pub mod error;
pub mod guard;
pub mod optimize;
pub mod session;
pub mod upload;

pub use crate::collect::{Batch, Entry, SelectedFile};
pub use crate::session::{Phase, Session, Settings};
