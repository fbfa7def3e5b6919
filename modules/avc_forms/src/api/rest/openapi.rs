use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};

use crate::api::rest::{dto, handlers, problem};

#[derive(OpenApi)]
#[openapi(
    info(title = "AVC Forms API", description = "Patients and users of the AVC forms backend"),
    paths(
        handlers::list_users,
        handlers::get_user,
        handlers::create_user,
        handlers::replace_user,
        handlers::update_user,
        handlers::delete_user,
        handlers::list_patients,
        handlers::get_patient,
        handlers::create_patient,
        handlers::replace_patient,
        handlers::update_patient,
        handlers::delete_patient,
    ),
    components(schemas(
        dto::UserDto,
        dto::CreateUserReq,
        dto::ReplaceUserReq,
        dto::UpdateUserReq,
        dto::UserListDto,
        dto::PatientDto,
        dto::CreatePatientReq,
        dto::ReplacePatientReq,
        dto::UpdatePatientReq,
        dto::PatientListDto,
        problem::Problem,
        problem::ValidationError,
    )),
    modifiers(&BasicAuthAddon),
    tags(
        (name = "users", description = "Identity accounts"),
        (name = "patients", description = "Patient form records"),
    )
)]
pub struct ApiDoc;

struct BasicAuthAddon;

impl Modify for BasicAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "basic_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
        );
    }
}

/// OpenAPI document with resource paths served under `prefix`.
pub fn openapi(prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if !prefix.is_empty() {
        doc.servers = Some(vec![Server::new(prefix)]);
    }
    doc
}
