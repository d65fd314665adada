//! Name validation shared by list and task write paths.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which entity a rejected name belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedEntity {
    TaskList,
    Task,
}

impl Display for NamedEntity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskList => write!(f, "task list"),
            Self::Task => write!(f, "task"),
        }
    }
}

/// Validation failure for user-supplied entity names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    /// Name is empty or whitespace only.
    Blank(NamedEntity),
}

impl Display for NameValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(entity) => write!(f, "{entity} name must not be blank"),
        }
    }
}

impl Error for NameValidationError {}

/// Normalizes a user-supplied name for storage.
///
/// Surrounding whitespace is trimmed; the result is rejected when empty.
pub fn normalize_name(entity: NamedEntity, raw: &str) -> Result<String, NameValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NameValidationError::Blank(entity));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, NameValidationError, NamedEntity};

    #[test]
    fn blank_names_are_rejected() {
        for raw in ["", "   ", "\t\n"] {
            assert_eq!(
                normalize_name(NamedEntity::Task, raw),
                Err(NameValidationError::Blank(NamedEntity::Task))
            );
        }
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            normalize_name(NamedEntity::TaskList, "  Groceries ").unwrap(),
            "Groceries"
        );
    }

    #[test]
    fn error_message_names_the_entity() {
        let err = normalize_name(NamedEntity::TaskList, " ").unwrap_err();
        assert_eq!(err.to_string(), "task list name must not be blank");
    }
}
