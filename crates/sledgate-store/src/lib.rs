//! Ordered object store for the sledgate gateway.
//!
//! Buckets and objects live in a single flat sled keyspace. NUL (`0x00`) is
//! the separator byte and is therefore forbidden in bucket and object names:
//!
//! ```text
//! B\0<bucket>            bucket existence marker (empty value)
//! M\0<bucket>\0<key>     encoded ObjectMeta
//! D\0<bucket>\0<key>     raw object bytes
//! ```
//!
//! Because sled iterates in byte order, a forward scan from `B\0` yields
//! buckets lexicographically, and a scan from `M\0<bucket>\0<prefix>` yields
//! that bucket's keys lexicographically - which is exactly the order
//! `ListObjectsV2` must emit and what lets the scan stop at the first
//! non-matching key.
//!
//! A PUT writes metadata and data in one atomic batch; readers see both or
//! neither.

mod error;
mod keyspace;
mod meta;
mod observe;
mod store;

pub use error::StoreError;
pub use meta::ObjectMeta;
pub use observe::{KvObserver, KvOp};
pub use store::{ListResult, ListedObject, ObjectStore, MAX_LIST_KEYS};
