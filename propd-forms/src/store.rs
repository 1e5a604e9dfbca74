//! Template resolution and fill notification seams
//!
//! The request surface hands over a template id, a value mapping, and an
//! output id; the store resolves the id to bytes, and the notifier is
//! told how the fill ended. Both are traits so the web layer can plug in
//! its own storage and messaging.

use crate::error::{FormError, FormResult};
use crate::filler::{fill, FieldValues};
use std::path::PathBuf;
use tracing::{error, info};

/// Resolves a template id to the template document bytes
pub trait TemplateStore {
    fn resolve(&self, template_id: &str) -> FormResult<Vec<u8>>;
}

/// Filesystem-backed template store: `<root>/<template_id>.pdf`
pub struct DirTemplateStore {
    root: PathBuf,
}

impl DirTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateStore for DirTemplateStore {
    fn resolve(&self, template_id: &str) -> FormResult<Vec<u8>> {
        // Ids are plain names, never paths
        if template_id.is_empty()
            || template_id.contains(['/', '\\'])
            || template_id.contains("..")
        {
            return Err(FormError::TemplateNotFound(template_id.to_string()));
        }

        let path = self.root.join(format!("{template_id}.pdf"));
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FormError::TemplateNotFound(template_id.to_string()))
            }
            Err(e) => Err(FormError::Io(e)),
        }
    }
}

/// One fill invocation
#[derive(Debug, Clone)]
pub struct FillRequest {
    pub template_id: String,
    pub values: FieldValues,
    /// Artifact id under which the caller will store the output
    pub output_id: String,
    /// Recipient reference passed through to the notifier
    pub recipient: Option<String>,
}

/// What the notifier is told after a fill
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub artifact_id: String,
    pub recipient: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

/// Told about every finished fill, success or failure
pub trait FillNotifier {
    fn notify(&self, outcome: &FillOutcome);
}

/// Notifier that logs outcomes through `tracing`
pub struct TracingNotifier;

impl FillNotifier for TracingNotifier {
    fn notify(&self, outcome: &FillOutcome) {
        if outcome.success {
            info!(
                artifact = %outcome.artifact_id,
                recipient = outcome.recipient.as_deref().unwrap_or("-"),
                "lease document filled"
            );
        } else {
            error!(
                artifact = %outcome.artifact_id,
                recipient = outcome.recipient.as_deref().unwrap_or("-"),
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "lease document fill failed"
            );
        }
    }
}

/// Resolve, fill, and notify in one call
pub fn fill_template(
    store: &dyn TemplateStore,
    notifier: &dyn FillNotifier,
    request: &FillRequest,
    strict: bool,
) -> FormResult<Vec<u8>> {
    let result = store
        .resolve(&request.template_id)
        .and_then(|template| fill(&template, &request.values, strict));

    notifier.notify(&FillOutcome {
        artifact_id: request.output_id.clone(),
        recipient: request.recipient.clone(),
        success: result.is_ok(),
        error: result.as_ref().err().map(|e| e.to_string()),
    });

    result
}
