#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Uploaded files grouped by form field, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct IncomingFiles {
    fields: Vec<(String, Vec<IncomingFile>)>,
}

impl IncomingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, file: IncomingFile) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, files)) => files.push(file),
            None => self.fields.push((field.to_string(), vec![file])),
        }
    }

    pub fn with(mut self, field: &str, file: IncomingFile) -> Self {
        self.push(field, file);
        self
    }

    /// Fields carrying at least one file.
    pub fn file_fields(&self) -> impl Iterator<Item = (&str, &[IncomingFile])> {
        self.fields
            .iter()
            .filter(|(_, files)| !files.is_empty())
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    pub fn has_files(&self) -> bool {
        self.file_fields().next().is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub max_bytes: Option<usize>,
    /// Lowercase extensions without the dot. `None` accepts anything.
    pub allowed_extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub use_default: bool,
    /// Default-asset category; the owner's type when unset.
    pub asset_type: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            use_default: true,
            asset_type: None,
        }
    }
}
