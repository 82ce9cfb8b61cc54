//! Error adapter for converting TachieError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error type
//! and miette's report formatting used in the CLI.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use tachie::TachieError;

/// Adapter rendering a [`TachieError`] through miette.
pub struct ErrorAdapter<'a>(pub &'a TachieError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TachieError::Io(_) => "tachie::io",
            TachieError::Catalog(_) => "tachie::catalog",
            TachieError::Model(_) => "tachie::model",
            TachieError::Persistence { .. } => "tachie::persistence",
            TachieError::Decode(_) => "tachie::decode",
            TachieError::Export(_) => "tachie::export",
            TachieError::Config(_) => "tachie::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            TachieError::Catalog(_) => "pass the layer catalog with --catalog",
            TachieError::Export(_) => "use a .png, .jpg, .jpeg or .svg output path",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}
