//! Roundup: recording lifecycle aggregation for Barnraiser.
//!
//! Folds a flat, possibly malformed stream of recording lifecycle events
//! into a tree of Application -> Channel -> Client -> Connection ->
//! Recording, and seals an immutable [`Session`] each time a channel
//! transitions to fully idle.
//!
//! The event source is a crash-prone writer: unroutable events and protocol
//! violations are logged and swallowed, never fatal. Identity is
//! content-addressed ([`ContentId`]) from track start timestamps and
//! connection ids, so reprocessing the same log is idempotent.
//!
//! # Preconditions
//!
//! Events must be fed in non-decreasing timestamp order. Everything here is
//! single-threaded and purely sequential; sealed sessions are immutable and
//! may be handed to downstream stages without synchronization.

pub mod event;
pub mod id;
pub mod recording;
pub mod session;
pub mod tree;

pub use event::{Event, EventData, EventKind};
pub use id::{ContentId, IdError};
pub use recording::{ContentKind, Recording, RecordingUpdate, Size, VideoSegment};
pub use session::{Session, SessionClient, SessionConnection};
pub use tree::{Aggregator, Application, Channel, Client, Connection};
