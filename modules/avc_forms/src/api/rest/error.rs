use axum::http::StatusCode;

use crate::api::rest::problem::{Problem, ProblemResponse, ValidationError};
use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.avc-forms.dev/{}", code))
        .with_code(code)
        .with_instance(instance);

    // Attach the id of the current tracing span if there is one
    let problem = if let Some(id) = tracing::Span::current().id() {
        problem.with_trace_id(id.into_u64().to_string())
    } else {
        problem
    };

    ProblemResponse(problem)
}

/// 400 for a field-level failure, with a JSON pointer to the field.
pub fn validation_problem(field: &str, message: &str, instance: &str) -> ProblemResponse {
    let mut resp = from_parts(
        StatusCode::BAD_REQUEST,
        "AVC_VALIDATION",
        "Validation error",
        format!("{field}: {message}"),
        instance,
    );
    resp.0 = resp.0.with_errors(vec![ValidationError {
        detail: message.to_string(),
        pointer: format!("/{field}"),
    }]);
    resp
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::PatientNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "AVC_PATIENT_NOT_FOUND",
            "Patient not found",
            format!("Patient with id {} was not found", id),
            instance,
        ),
        DomainError::UserNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "AVC_USER_NOT_FOUND",
            "User not found",
            format!("User with id {} was not found", id),
            instance,
        ),
        DomainError::UsernameAlreadyExists { username } => from_parts(
            StatusCode::CONFLICT,
            "AVC_USERNAME_CONFLICT",
            "Username already exists",
            format!("A user with username '{}' already exists", username),
            instance,
        ),
        DomainError::UserInUse { id } => from_parts(
            StatusCode::CONFLICT,
            "AVC_USER_IN_USE",
            "User in use",
            format!(
                "User {} is recorded as creator or last updater of patients and cannot be deleted",
                id
            ),
            instance,
        ),
        DomainError::Validation { field, message } => validation_problem(field, message, instance),
        DomainError::Unauthenticated { reason } => from_parts(
            StatusCode::UNAUTHORIZED,
            "AVC_UNAUTHENTICATED",
            "Authentication required",
            reason.clone(),
            instance,
        ),
        DomainError::PermissionDenied { permission } => from_parts(
            StatusCode::FORBIDDEN,
            "AVC_PERMISSION_DENIED",
            "Permission denied",
            format!("You do not have the '{}' permission", permission),
            instance,
        ),
        DomainError::Database { .. } | DomainError::Credentials { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Internal error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "AVC_INTERNAL",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn statuses_and_codes() {
        let cases = [
            (DomainError::patient_not_found(Uuid::nil()), 404, "AVC_PATIENT_NOT_FOUND"),
            (DomainError::user_not_found(Uuid::nil()), 404, "AVC_USER_NOT_FOUND"),
            (DomainError::username_already_exists("a"), 409, "AVC_USERNAME_CONFLICT"),
            (DomainError::user_in_use(Uuid::nil()), 409, "AVC_USER_IN_USE"),
            (DomainError::validation("code", "blank"), 400, "AVC_VALIDATION"),
            (DomainError::unauthenticated("no"), 401, "AVC_UNAUTHENTICATED"),
            (DomainError::permission_denied("add_patient"), 403, "AVC_PERMISSION_DENIED"),
            (DomainError::database("boom"), 500, "AVC_INTERNAL"),
        ];
        for (err, status, code) in cases {
            let p = map_domain_error(&err, "/x").0;
            assert_eq!(p.status, status, "{code}");
            assert_eq!(p.code, code);
            assert_eq!(p.instance, "/x");
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let p = map_domain_error(&DomainError::database("secret dsn"), "/x").0;
        assert!(!p.detail.contains("secret"));
    }

    #[test]
    fn validation_points_at_field() {
        let p = map_domain_error(&DomainError::validation("owner", "missing"), "/x").0;
        let errors = p.errors.unwrap();
        assert_eq!(errors[0].pointer, "/owner");
        assert_eq!(errors[0].detail, "missing");
    }
}
