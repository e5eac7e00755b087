//! Image references, the image list and the transfer executor

pub mod executor;
pub mod list;
pub mod reference;

pub use executor::{Executor, MirrorReport};
pub use list::{ImageList, ListOrigin, TransferEntry};
pub use reference::Reference;
