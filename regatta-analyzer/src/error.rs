use miette::Diagnostic;
use regatta_core::{CourseError, InferenceError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum AnalyzerError {
    #[error("Cannot read {}", path.display())]
    #[diagnostic(code(regatta::read), help("check that the file exists and is readable"))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed JSON in {}", path.display())]
    #[diagnostic(code(regatta::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot write {}", path.display())]
    #[diagnostic(code(regatta::write))]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot serialize report")]
    #[diagnostic(code(regatta::serialize))]
    Serialize(#[from] serde_json::Error),

    #[error("Race description is inconsistent")]
    #[diagnostic(code(regatta::course))]
    Course(#[from] CourseError),

    #[error("Wind inference failed")]
    #[diagnostic(code(regatta::inference))]
    Inference(#[from] InferenceError),
}
