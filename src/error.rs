use logos::Span;
use miette::Diagnostic;
use thiserror::Error;

/// An error raised while interpreting an option.
///
/// Every variant carries the span of the offending AST node and a
/// preformatted message. The variant distinguishes how the option
/// failed: the name did not resolve, the name resolved but the usage is
/// disallowed, the value has the wrong shape, or the value has the right
/// shape but is invalid.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum OptionError {
    #[error("{message}")]
    NotFound {
        message: String,
        #[label("used here")]
        span: Span,
    },
    #[error("{message}")]
    Forbidden {
        message: String,
        #[label("used here")]
        span: Span,
    },
    #[error("{message}")]
    TypeMismatch {
        message: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("{message}")]
    Value {
        message: String,
        #[label("defined here")]
        span: Span,
    },
}

impl OptionError {
    pub(crate) fn not_found(span: Span, message: impl Into<String>) -> Self {
        OptionError::NotFound {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn forbidden(span: Span, message: impl Into<String>) -> Self {
        OptionError::Forbidden {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn type_mismatch(span: Span, message: impl Into<String>) -> Self {
        OptionError::TypeMismatch {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn value(span: Span, message: impl Into<String>) -> Self {
        OptionError::Value {
            message: message.into(),
            span,
        }
    }

    /// The span of the AST node the error refers to.
    pub fn span(&self) -> Span {
        match self {
            OptionError::NotFound { span, .. }
            | OptionError::Forbidden { span, .. }
            | OptionError::TypeMismatch { span, .. }
            | OptionError::Value { span, .. } => span.clone(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            OptionError::NotFound { message, .. }
            | OptionError::Forbidden { message, .. }
            | OptionError::TypeMismatch { message, .. }
            | OptionError::Value { message, .. } => message,
        }
    }
}

/// A non-fatal diagnostic, currently only raised for uses of options
/// deprecated in the file's edition.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("{message}")]
pub struct OptionWarning {
    pub message: String,
    #[label("used here")]
    pub span: Span,
}

/// Receives interpretation diagnostics and decides whether to continue.
///
/// Returning `Ok(())` from [`error`](DiagnosticHandler::error) means
/// "recorded, keep going"; returning `Err` aborts the walk immediately
/// with that error. Warnings never abort.
pub trait DiagnosticHandler {
    fn error(&mut self, error: OptionError) -> Result<(), OptionError>;

    fn warning(&mut self, _warning: OptionWarning) {}
}

/// Aborts interpretation on the first error.
#[derive(Debug, Default)]
pub struct FailFast;

impl DiagnosticHandler for FailFast {
    fn error(&mut self, error: OptionError) -> Result<(), OptionError> {
        Err(error)
    }
}

/// Records every diagnostic and always continues.
#[derive(Debug, Default)]
pub struct CollectDiagnostics {
    pub errors: Vec<OptionError>,
    pub warnings: Vec<OptionWarning>,
}

impl DiagnosticHandler for CollectDiagnostics {
    fn error(&mut self, error: OptionError) -> Result<(), OptionError> {
        self.errors.push(error);
        Ok(())
    }

    fn warning(&mut self, warning: OptionWarning) {
        self.warnings.push(warning);
    }
}
