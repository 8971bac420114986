//! Sources of template text, keyed by template id.
//!
//! The substitution engine in [`crate::template`] never reads templates
//! itself; channels fetch text from a store and hand it to the engine.

use crate::error::SendError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// The two variants a template can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateFormat {
    Html,
    Text,
}

impl TemplateFormat {
    fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Html => "html",
            TemplateFormat::Text => "txt",
        }
    }
}

/// Provides raw template text.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetches a template.
    ///
    /// # Returns
    /// * `Ok(Some(text))` if the template exists
    /// * `Ok(None)` if no template with that id and format exists
    /// * `Err(SendError::Template)` if the store itself failed
    async fn fetch(
        &self,
        template_id: &str,
        format: TemplateFormat,
    ) -> Result<Option<String>, SendError>;
}

/// Reads `<directory>/<id>.html` and `<directory>/<id>.txt`.
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    directory: PathBuf,
}

impl FileTemplateStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn fetch(
        &self,
        template_id: &str,
        format: TemplateFormat,
    ) -> Result<Option<String>, SendError> {
        if template_id.is_empty()
            || template_id.contains(['/', '\\'])
            || template_id.starts_with('.')
        {
            return Err(SendError::Template(format!(
                "invalid template id '{}'",
                template_id
            )));
        }

        let path = self
            .directory
            .join(format!("{}.{}", template_id, format.extension()));
        debug!(path = %path.display(), "Loading template");
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SendError::Template(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Keeps templates in memory; useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: HashMap<(String, TemplateFormat), String>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(
        mut self,
        template_id: impl Into<String>,
        format: TemplateFormat,
        text: impl Into<String>,
    ) -> Self {
        self.templates
            .insert((template_id.into(), format), text.into());
        self
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn fetch(
        &self,
        template_id: &str,
        format: TemplateFormat,
    ) -> Result<Option<String>, SendError> {
        Ok(self
            .templates
            .get(&(template_id.to_string(), format))
            .cloned())
    }
}
