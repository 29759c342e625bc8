pub mod enrollments;
pub mod progress;

use course_core::model::ParseIdError;

use crate::error::ApiError;

/// Parses a path segment into a typed id, rejecting blank values.
///
/// `field` is the wire name reported back in the validation message.
pub(crate) fn parse_id<T>(raw: String, field: &str) -> Result<T, ApiError>
where
    T: TryFrom<String, Error = ParseIdError>,
{
    T::try_from(raw).map_err(|e| ApiError::Validation(format!("{field}: {e}")))
}
