//! MindCare REST API.
//!
//! An axum router over [`CoreServices`]. Every route except `/health` and `/auth/register`
//! requires a bearer token; the [`extract::require_auth`] layer turns it into an
//! [`Identity`](mindcare_core::Identity) that handlers read from the request extensions. Status
//! codes come from [`error::ApiError`]. OpenAPI docs are served at `/swagger-ui`.

pub mod config;
pub mod error;
pub mod extract;
mod routes;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};

use api_shared::{HealthService, TokenVerifier};
use axum::routing::{delete, get, post, put};
use axum::Router;
use mindcare_core::CoreServices;
use routes::{
    appointments, assignments, chat, companion, content, health, moods, notifications,
    prescriptions, users,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<CoreServices>,
    pub verifier: Arc<TokenVerifier>,
    health: HealthService,
}

impl AppState {
    pub fn new(core: CoreServices, verifier: TokenVerifier) -> Self {
        Self {
            core: Arc::new(core),
            verifier: Arc::new(verifier),
            health: HealthService::new(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::register,
        users::list_users,
        users::therapist_directory,
        users::me,
        users::update_me,
        users::get_user,
        users::update_user,
        users::delete_user,
        assignments::list_assignments,
        assignments::my_roster,
        assignments::get_roster,
        assignments::assign,
        assignments::unassign,
        appointments::create_appointment,
        appointments::list_appointments,
        appointments::get_appointment,
        appointments::update_appointment,
        appointments::cancel_appointment,
        moods::create_mood,
        moods::list_own_moods,
        moods::list_patient_moods,
        moods::delete_mood,
        prescriptions::create_prescription,
        prescriptions::update_prescription,
        prescriptions::list_own_prescriptions,
        prescriptions::list_patient_prescriptions,
        chat::send_message,
        chat::list_threads,
        chat::thread_messages,
        companion::companion,
        content::list_content,
        content::create_content,
        content::get_content,
        content::update_content,
        content::delete_content,
        notifications::list_notifications,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_all,
    ),
    components(schemas(
        api_shared::dto::HealthRes,
        api_shared::dto::ErrorRes,
        api_shared::dto::CountRes,
        api_shared::dto::RegisterReq,
        api_shared::dto::UserRes,
        api_shared::dto::UpdateUserReq,
        api_shared::dto::UpdateProfileReq,
        api_shared::dto::TherapistRes,
        api_shared::dto::AssignReq,
        api_shared::dto::AssignmentRes,
        api_shared::dto::NewAppointmentReq,
        api_shared::dto::UpdateAppointmentReq,
        api_shared::dto::RescheduleRes,
        api_shared::dto::AppointmentRes,
        api_shared::dto::NewMoodReq,
        api_shared::dto::MoodLogRes,
        api_shared::dto::NewPrescriptionReq,
        api_shared::dto::UpdatePrescriptionReq,
        api_shared::dto::PrescriptionRes,
        api_shared::dto::SendMessageReq,
        api_shared::dto::ChatMessageRes,
        api_shared::dto::ChatThreadRes,
        api_shared::dto::CompanionReq,
        api_shared::dto::CompanionRes,
        api_shared::dto::NewContentReq,
        api_shared::dto::UpdateContentReq,
        api_shared::dto::ContentRes,
        api_shared::dto::NotificationRes,
    )),
    modifiers(&BearerAuth)
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/therapists", get(users::therapist_directory))
        .route("/users/me", get(users::me).put(users::update_me))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/assignments", get(assignments::list_assignments))
        .route("/assignments/mine", get(assignments::my_roster))
        .route(
            "/assignments/:therapist_id",
            get(assignments::get_roster).put(assignments::assign),
        )
        .route(
            "/assignments/:therapist_id/patients/:patient_id",
            delete(assignments::unassign),
        )
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/appointments/:id",
            get(appointments::get_appointment).put(appointments::update_appointment),
        )
        .route(
            "/appointments/:id/cancel",
            post(appointments::cancel_appointment),
        )
        .route("/moods", get(moods::list_own_moods).post(moods::create_mood))
        .route("/moods/patients/:patient_id", get(moods::list_patient_moods))
        .route("/moods/:id", delete(moods::delete_mood))
        .route(
            "/prescriptions",
            get(prescriptions::list_own_prescriptions).post(prescriptions::create_prescription),
        )
        .route("/prescriptions/:id", put(prescriptions::update_prescription))
        .route(
            "/prescriptions/patients/:patient_id",
            get(prescriptions::list_patient_prescriptions),
        )
        .route("/chat/messages", post(chat::send_message))
        .route("/chat/threads", get(chat::list_threads))
        .route("/chat/threads/:id/messages", get(chat::thread_messages))
        .route("/companion", post(companion::companion))
        .route(
            "/content",
            get(content::list_content).post(content::create_content),
        )
        .route(
            "/content/:id",
            get(content::get_content)
                .put(content::update_content)
                .delete(content::delete_content),
        )
        .route(
            "/notifications",
            get(notifications::list_notifications).delete(notifications::delete_all),
        )
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/:id/read", put(notifications::mark_read))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            extract::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(users::register))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the configured store and serve the API until the listener fails.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the address cannot be bound, or the server
/// fails while running.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let core = CoreServices::from_config(&config.core)?;
    if !core.companion.is_configured() {
        tracing::warn!("No companion model configured; companion replies use the fallback");
    }
    let state = AppState::new(core, config.verifier);

    tracing::info!("-- Starting MindCare REST API on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use mindcare_core::models::NewUser;
    use mindcare_core::store::MemoryStore;
    use mindcare_core::{EmailAddress, Identity, NonEmptyText, Role};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    struct TestApp {
        app: Router,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let core = CoreServices::new(Arc::new(MemoryStore::new()), None);
            let state = AppState::new(core, TokenVerifier::new(SECRET).unwrap());
            Self {
                app: router(state.clone()),
                state,
            }
        }

        fn user(&self, role: Role, email: &str) -> (Identity, String) {
            let user = self
                .state
                .core
                .users
                .create_user(NewUser {
                    role,
                    display_name: NonEmptyText::new(email.split('@').next().unwrap()).unwrap(),
                    email: EmailAddress::parse(email).unwrap(),
                })
                .unwrap();
            let identity = user.identity();
            (identity, self.token(&identity))
        }

        fn token(&self, identity: &Identity) -> String {
            self.state
                .verifier
                .issue(identity, chrono::Duration::hours(1))
                .unwrap()
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(t) = token {
                builder = builder.header("Authorization", format!("Bearer {t}"));
            }
            let request = match body {
                Some(body) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_and_bad_tokens() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "authentication required" }));

        let (status, _) = app
            .call("GET", "/users/me", Some("not.a-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tokens_for_deleted_users_stop_working() {
        let app = TestApp::new();
        let (_, admin) = app.user(Role::Admin, "admin@example.com");
        let (patient, token) = app.user(Role::Patient, "p@example.com");

        let (status, _) = app.call("GET", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .call("DELETE", &format!("/users/{}", patient.id), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.call("GET", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_notifies_admins() {
        let app = TestApp::new();
        let (_, admin) = app.user(Role::Admin, "admin@example.com");

        let (status, body) = app
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "role": "patient", "display_name": "Sam", "email": "sam@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], "patient");

        let (status, _) = app
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "role": "patient", "display_name": "Sam", "email": "sam@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "role": "admin", "display_name": "Eve", "email": "eve@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, notifications) = app.call("GET", "/notifications", Some(&admin), None).await;
        assert_eq!(notifications.as_array().unwrap().len(), 1);
        assert_eq!(notifications[0]["kind"], "user_registered");
    }

    #[tokio::test]
    async fn patients_cannot_use_admin_routes() {
        let app = TestApp::new();
        let (_, patient) = app.user(Role::Patient, "p@example.com");

        let (status, body) = app.call("GET", "/users", Some(&patient), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "error": "forbidden" }));
    }

    #[tokio::test]
    async fn therapist_sees_moods_only_once_assigned() {
        let app = TestApp::new();
        let (_, admin) = app.user(Role::Admin, "admin@example.com");
        let (therapist, therapist_token) = app.user(Role::Therapist, "t@example.com");
        let (patient, patient_token) = app.user(Role::Patient, "p@example.com");

        let (status, _) = app
            .call(
                "POST",
                "/moods",
                Some(&patient_token),
                Some(json!({ "mood": "calm", "sleep_hours": 7.5, "energy_level": 6 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/moods/patients/{}", patient.id);
        let (status, body) = app.call("GET", &uri, Some(&therapist_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "not found" }));

        let (status, roster) = app
            .call(
                "PUT",
                &format!("/assignments/{}", therapist.id),
                Some(&admin),
                Some(json!({ "patient_ids": [patient.id.to_string()] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(roster["patient_ids"], json!([patient.id.to_string()]));

        let (status, logs) = app.call("GET", &uri, Some(&therapist_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(logs.as_array().unwrap().len(), 1);

        let (_, mine) = app
            .call("GET", "/assignments/mine", Some(&therapist_token), None)
            .await;
        assert_eq!(mine["therapist_id"], therapist.id.to_string());
    }

    #[tokio::test]
    async fn assigning_a_held_patient_conflicts() {
        let app = TestApp::new();
        let (_, admin) = app.user(Role::Admin, "admin@example.com");
        let (first, _) = app.user(Role::Therapist, "t1@example.com");
        let (second, _) = app.user(Role::Therapist, "t2@example.com");
        let (patient, _) = app.user(Role::Patient, "p@example.com");
        let body = json!({ "patient_ids": [patient.id.to_string()] });

        let (status, _) = app
            .call(
                "PUT",
                &format!("/assignments/{}", first.id),
                Some(&admin),
                Some(body.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .call(
                "PUT",
                &format!("/assignments/{}", second.id),
                Some(&admin),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn malformed_input_is_a_bad_request() {
        let app = TestApp::new();
        let (_, admin) = app.user(Role::Admin, "admin@example.com");

        let (status, body) = app
            .call("GET", "/users/not-an-id", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = app
            .call(
                "POST",
                "/content",
                Some(&admin),
                Some(json!({ "title": "Breathing" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "invalid request body" }));
    }

    #[tokio::test]
    async fn chat_messages_notify_the_other_participant() {
        let app = TestApp::new();
        let (therapist, therapist_token) = app.user(Role::Therapist, "t@example.com");
        let (_, patient_token) = app.user(Role::Patient, "p@example.com");

        let (status, message) = app
            .call(
                "POST",
                "/chat/messages",
                Some(&patient_token),
                Some(json!({ "recipient_id": therapist.id.to_string(), "text": "Hello" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let thread_id = message["thread_id"].as_str().unwrap().to_string();
        let (status, messages) = app
            .call(
                "GET",
                &format!("/chat/threads/{thread_id}/messages"),
                Some(&therapist_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(messages[0]["text"], "Hello");

        let (_, notifications) = app
            .call("GET", "/notifications", Some(&therapist_token), None)
            .await;
        assert_eq!(notifications[0]["kind"], "new_message");

        let (_, count) = app
            .call("PUT", "/notifications/read-all", Some(&therapist_token), None)
            .await;
        assert_eq!(count["count"], 1);
    }

    #[tokio::test]
    async fn companion_falls_back_without_a_model() {
        let app = TestApp::new();
        let (_, patient) = app.user(Role::Patient, "p@example.com");

        let (status, body) = app
            .call(
                "POST",
                "/companion",
                Some(&patient),
                Some(json!({ "message": "I have been thinking about self-harm" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "fallback");
        assert_eq!(body["crisis"], true);
    }

    #[test]
    fn openapi_documents_every_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/assignments/{therapist_id}"));
        assert!(doc.paths.paths.contains_key("/notifications/read-all"));
        assert_eq!(doc.paths.paths.len(), 28);
    }
}
