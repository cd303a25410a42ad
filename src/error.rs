use diesel::result::Error as DieselError;
use failure::Fail;

use crate::user::Permission;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by the content and social graph operations
#[derive(Debug, Fail)]
pub enum Error {
    /// The referenced user, post, question or comment doesn't exist
    #[fail(display = "No such {}", _0)]
    NotFound(&'static str),
    /// The acting user lacks the required permission
    #[fail(display = "Permission denied")]
    PermissionDenied(Permission),
    /// The request can never succeed, e.g. following yourself
    #[fail(display = "{}", _0)]
    InvalidOperation(&'static str),
    #[fail(display = "Database error: {}", _0)]
    Database(#[cause] DieselError),
}

impl From<DieselError> for Error {
    fn from(e: DieselError) -> Self {
        Error::Database(e)
    }
}

/// Result of an idempotent relationship change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    /// A row was created or removed
    Changed,
    /// The relationship was already in the requested state
    Unchanged,
}

impl Toggle {
    /// Interprets the number of rows touched by an insert or delete of a single edge.
    pub fn from_affected(rows: usize) -> Self {
        if rows == 0 {
            Toggle::Unchanged
        } else {
            Toggle::Changed
        }
    }

    pub fn changed(self) -> bool {
        self == Toggle::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Toggle};
    use crate::user::Permission;

    #[test]
    fn affected_rows() {
        assert_eq!(Toggle::from_affected(0), Toggle::Unchanged);
        assert_eq!(Toggle::from_affected(1), Toggle::Changed);
        assert!(!Toggle::Unchanged.changed());
    }

    #[test]
    fn messages() {
        assert_eq!(Error::NotFound("post").to_string(), "No such post");
        assert_eq!(
            Error::PermissionDenied(Permission::Follow).to_string(),
            "Permission denied"
        );
        assert_eq!(
            serde_json::to_string(&Toggle::Unchanged).unwrap(),
            "\"unchanged\""
        );
    }
}
