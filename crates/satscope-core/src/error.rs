use snafu::prelude::*;

/// Root path used when a failure concerns the body as a whole.
pub const ROOT_PATH: &str = "$";

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
#[snafu(visibility(pub))]
pub enum DecodeError {
    #[snafu(display("Missing required field `{path}`"))]
    MissingField {
        path: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Field `{path}` has the wrong type: expected {expected}, found {found}"))]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Field `{path}` is out of range: {reason}"))]
    OutOfRange {
        path: String,
        reason: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Malformed JSON body: {source}"))]
    MalformedJson {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Malformed text body {body:?}: {reason}"))]
    MalformedText {
        body: String,
        reason: String,
        #[snafu(implicit)]
        loc: snafu::Location,
    },
}

impl DecodeError {
    /// JSON path of the offending field, `$` for whole-body failures.
    pub fn field_path(&self) -> &str {
        match self {
            DecodeError::MissingField { path, .. }
            | DecodeError::TypeMismatch { path, .. }
            | DecodeError::OutOfRange { path, .. } => path,
            DecodeError::MalformedJson { .. } | DecodeError::MalformedText { .. } => ROOT_PATH,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            DecodeError::MissingField { .. } => "required field is absent".to_string(),
            DecodeError::TypeMismatch {
                expected, found, ..
            } => format!("expected {expected}, found {found}"),
            DecodeError::OutOfRange { reason, .. } | DecodeError::MalformedText { reason, .. } => {
                reason.clone()
            }
            DecodeError::MalformedJson { source, .. } => source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
