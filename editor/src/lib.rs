//! The transactional editing engine of Celwork.
//!
//! Every change to a [Sprite](celwork_document::Sprite) is a [Command] executed inside a [Transaction] opened on a
//! [Document]. A transaction either commits into the document's [UndoHistory] as a single undoable step or is rolled
//! back, leaving the sprite exactly as it found it.

pub mod command;
pub mod commands;
pub mod consts;
pub mod document;
pub mod error;
pub mod history;
pub mod observer;
pub mod preferences;
pub mod recovery;
pub mod transaction;

#[cfg(test)]
mod test_utils;

#[doc(inline)]
pub use command::Command;
#[doc(inline)]
pub use document::{Document, DocumentId, DocumentInfo, Site};
#[doc(inline)]
pub use error::EditorError;
#[doc(inline)]
pub use history::{HistoryEntry, UndoHistory};
#[doc(inline)]
pub use observer::{DocumentChange, DocumentObserver};
#[doc(inline)]
pub use preferences::Preferences;
#[doc(inline)]
pub use recovery::{Backup, RecoverySession};
#[doc(inline)]
pub use transaction::{Modification, Transaction};
