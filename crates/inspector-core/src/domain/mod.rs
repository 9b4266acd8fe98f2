//! Domain layer: the derived-state models maintained by the observers.
//!
//! Everything here is pure: parsing, classification, bounded storage, and the
//! UI coordinate fixup.  The observers in `inspector-client` own instances of
//! these types and feed them from dispatcher events.

pub mod catalog;
pub mod log_entry;
pub mod network;
pub mod ring;
pub mod ui_tree;
