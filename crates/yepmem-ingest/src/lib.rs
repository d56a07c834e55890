//! yepmem-ingest - Checkpoint ingestion, repository sync, and the ingest
//! pipeline
//!
//! The write path of the knowledge base:
//! - git subprocess client (tree listing, blob reads, history window)
//! - checkpoint session ingestion from the well-known branch and local
//!   session directories, with offset-based resume
//! - the cross-process sync lock
//! - the staged ingest pipeline with progress events and cooperative
//!   cancellation

pub mod checkpoints;
mod error;
pub mod events;
pub mod git;
pub mod lock;
pub mod pipeline;

pub use checkpoints::{
    local_checkpoints, parse_transcript, to_transcript_chunks, CheckpointIngester, ContentPart,
    EntryContent, ParsedCheckpoint, ParsedSession, TranscriptEntry, CHECKPOINT_BRANCH,
    LOCAL_METADATA_DIR,
};
pub use error::{IngestError, Result};
pub use events::{EventKind, PipelineStep, ProgressEvent};
pub use git::GitClient;
pub use lock::SyncLock;
pub use pipeline::{IngestOutcome, IngestPipeline};
