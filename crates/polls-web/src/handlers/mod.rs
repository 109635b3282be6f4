pub mod accounts;
pub mod polls;

use polls_core::question::QuestionId;

use crate::error::Error;

/// Parse the `{id}` path segment. Anything that is not an integer is a
/// missing page, not a bad request.
pub(super) fn question_id(raw: &str) -> Result<QuestionId, Error> {
  raw.parse::<i64>().map(QuestionId).map_err(|_| Error::NotFound)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_integer_ids_only() {
    assert_eq!(question_id("12").unwrap(), QuestionId(12));
    assert!(matches!(question_id("abc"), Err(Error::NotFound)));
    assert!(matches!(question_id(""), Err(Error::NotFound)));
  }
}
