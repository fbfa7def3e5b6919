use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Router};

use crate::api::rest::{auth, handlers};
use crate::domain::service::{PatientsService, UsersService};

/// Attach the `/users` and `/patients` resources to `router`. Every route
/// added here requires HTTP Basic credentials.
pub fn register_routes(
    router: Router,
    users: Arc<UsersService>,
    patients: Arc<PatientsService>,
) -> Router {
    let resources = Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::replace_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/patients/{id}",
            get(handlers::get_patient)
                .put(handlers::replace_patient)
                .patch(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .route_layer(middleware::from_fn_with_state(
            users.clone(),
            auth::basic_auth,
        ))
        .layer(Extension(users))
        .layer(Extension(patients));

    router.merge(resources)
}
