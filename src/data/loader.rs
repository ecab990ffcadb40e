use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{Question, QuestionBank};

/// Error raised while loading a question table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} must contain at least one question", path.display())]
    Empty { path: PathBuf },
}

/// Load a question table from a JSON array of `{ "text", "answer" }` objects.
pub fn load_questions_from_json<P: AsRef<Path>>(path: P) -> Result<QuestionBank, LoadError> {
    let path = path.as_ref();

    let json_content = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_questions(&json_content).map_err(|err| match err {
        ParseFailure::Json(source) => LoadError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::Empty => LoadError::Empty {
            path: path.to_path_buf(),
        },
    })
}

enum ParseFailure {
    Json(serde_json::Error),
    Empty,
}

fn parse_questions(json: &str) -> Result<QuestionBank, ParseFailure> {
    let questions: Vec<Question> = serde_json::from_str(json).map_err(ParseFailure::Json)?;
    QuestionBank::new(questions).ok_or(ParseFailure::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions() {
        let json = r#"[
            {"text": "2 + 2?", "answer": "4"},
            {"text": "Capital of France?", "answer": "Paris"}
        ]"#;
        let Ok(bank) = parse_questions(json) else {
            panic!("valid table rejected");
        };
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.pick(2).answer, "Paris");
    }

    #[test]
    fn test_parse_rejects_empty_table() {
        assert!(matches!(parse_questions("[]"), Err(ParseFailure::Empty)));
        assert!(matches!(parse_questions("{"), Err(ParseFailure::Json(_))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_questions_from_json("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
