//! File lifecycle: upload, tracking, owner association, reconciliation and deletion.

pub mod association;
pub mod deletion;
pub mod images;
pub mod reconciler;
pub mod records;
pub mod upload;
