//! Operation & Note Model
//!
//! Value objects for captured operations and notes, and the operation history
//! that owns them.

pub mod operation;
pub mod note;
pub mod test_step;
pub mod history;
pub mod test_result;

pub use history::OperationHistory;
pub use note::{Note, NoteAddress, NoteDraft, NoteEdit, NoteId, NoteKind};
pub use operation::{CapturedOperation, ElementInfo, ElementKey, KeywordSet, Operation, OperationType};
pub use test_result::{TestResultExport, TestResultMetadata};
pub use test_step::{NoteLinkage, TestStep};
