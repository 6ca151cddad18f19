//! Source create/edit form.
//!
//! Holds the raw text of each field while the user types and turns it into
//! a [`SourceSubmission`] on save.  Validation happens here, before any
//! request exists.

use thiserror::Error;

use crate::api::{Source, SourceDraft, SourcePatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Name is required")]
    NameRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Kind,
    Url,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Name, FormField::Kind, FormField::Url];

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Kind => "Kind (manual/rss/api)",
            Self::Url => "URL or config",
        }
    }
}

/// What saving the form should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSubmission {
    Create(SourceDraft),
    Update { id: i64, patch: SourcePatch },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceForm {
    /// The source being edited; `None` when creating.
    original: Option<Source>,
    pub name: String,
    pub kind: String,
    pub url_or_config: String,
    pub focus: FormField,
    /// Inline error shown under the fields.
    pub error: Option<String>,
    /// A save request is in flight.
    pub submitting: bool,
}

impl SourceForm {
    pub fn create() -> Self {
        Self {
            original: None,
            name: String::new(),
            kind: String::new(),
            url_or_config: String::new(),
            focus: FormField::Name,
            error: None,
            submitting: false,
        }
    }

    pub fn edit(source: &Source) -> Self {
        Self {
            name: source.name.clone(),
            kind: source.kind.clone().unwrap_or_default(),
            url_or_config: source.url_or_config.clone().unwrap_or_default(),
            original: Some(source.clone()),
            ..Self::create()
        }
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.original.as_ref().map(|s| s.id)
    }

    pub fn title(&self) -> String {
        match &self.original {
            Some(source) => format!(" Edit source #{} ", source.id),
            None => " New source ".to_string(),
        }
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Kind => &self.kind,
            FormField::Url => &self.url_or_config,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Name => &mut self.name,
            FormField::Kind => &mut self.kind,
            FormField::Url => &mut self.url_or_config,
        }
    }

    // -- editing -------------------------------------------------------------

    pub fn push_char(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            FormField::Name => FormField::Kind,
            FormField::Kind => FormField::Url,
            FormField::Url => FormField::Name,
        };
    }

    pub fn focus_previous(&mut self) {
        self.focus = match self.focus {
            FormField::Name => FormField::Url,
            FormField::Kind => FormField::Name,
            FormField::Url => FormField::Kind,
        };
    }

    // -- submission ----------------------------------------------------------

    /// Validate and build the request body.
    ///
    /// Creates send every field (blank optional fields as `null`); updates
    /// send only what changed against the source being edited.
    pub fn submission(&self) -> Result<SourceSubmission, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::NameRequired);
        }
        let kind = non_blank(&self.kind);
        let url_or_config = non_blank(&self.url_or_config);

        let Some(original) = &self.original else {
            return Ok(SourceSubmission::Create(SourceDraft {
                name: name.to_string(),
                type_or_kind: kind,
                url_or_config,
            }));
        };

        let mut patch = SourcePatch::default();
        if name != original.name {
            patch.name = Some(name.to_string());
        }
        if kind != original.kind {
            patch.type_or_kind = Some(kind);
        }
        if url_or_config != original.url_or_config {
            patch.url_or_config = Some(url_or_config);
        }
        Ok(SourceSubmission::Update {
            id: original.id,
            patch,
        })
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
