//! The identity contract shared by every cached record.

use core::fmt;
use core::hash::Hash;

/// A server-owned record that a resource store can cache.
///
/// The identifier is assigned by the server, is stable for the life of the
/// record, and is unique within its resource family. Stores use it to
/// reconcile cached entries with server-confirmed updates and deletions.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Identifier type for this resource family.
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Returns the record's identifier.
    fn id(&self) -> Self::Id;
}
