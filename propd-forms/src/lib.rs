//! propd-forms - AcroForm lease filler
//!
//! Fills named fields of an existing fillable PDF template and returns
//! the filled document. The template's object tree is preserved; only
//! field values change, and cached appearances are invalidated so any
//! conforming reader regenerates the displayed text.

pub mod error;
pub mod filler;
pub mod store;

pub use error::{FormError, FormResult};
pub use filler::{fill, FieldValues};
pub use store::{fill_template, DirTemplateStore, FillNotifier, FillOutcome, FillRequest,
                TemplateStore, TracingNotifier};
