//! Record store: the durable, single-collection user store.
//!
//! The store owns every record. Callers get clones, never references,
//! and all mutating access is serialized behind one lock spanning the
//! uniqueness check, the mutation and the write to disk.

mod record;
mod user_store;

pub use record::{NewUser, PublicUser, UserPatch, UserRecord};
pub use user_store::UserStore;
