use axum::{
    extract::{FromRequest, FromRequestParts},
    middleware, Router,
};
use crate::{
    errors::AppError,
    middleware::auth_guard::require_auth,
    state::AppState,
};

mod admin;
mod department;
mod patient;
mod system;

/// JSON body extractor whose rejections surface as `AppError::BadRequest`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor whose rejections surface as `AppError::BadRequest`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Build the full router.
///
/// Health and bootstrap are public. Department provisioning is public unless
/// `require_provisioning_auth` is set. Every other route is wrapped in the
/// header-based [`require_auth`] middleware.
pub fn all_routes(state: AppState) -> Router<AppState> {
    let auth_mw = middleware::from_fn_with_state(state.clone(), require_auth);

    let provisioning = if state.config.require_provisioning_auth {
        admin::provisioning_router(true).route_layer(auth_mw.clone())
    } else {
        tracing::warn!("Department provisioning routes are open (REQUIRE_PROVISIONING_AUTH is off)");
        admin::provisioning_router(false)
    };

    Router::new()
        .merge(system::router())    // public — no auth required
        .merge(provisioning)
        .merge(
            Router::new()
                .merge(admin::router())
                .merge(department::router())
                .merge(patient::router())
                .route_layer(auth_mw),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{config::Config, db::test_pool};

    async fn app_with(config: Config) -> Router {
        let state = AppState { pool: test_pool().await, config };
        all_routes(state.clone()).with_state(state)
    }

    async fn app() -> Router {
        app_with(Config::for_tests()).await
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        identity: Option<(i64, &str)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = identity {
            req = req.header("X-User-Id", id.to_string()).header("X-User-Role", role);
        }
        let req = match body {
            Some(v) => req
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&v).unwrap()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    fn id_of(v: &Value) -> i64 {
        v["id"].as_i64().expect("id in response")
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn assessment_flow_end_to_end() {
        let app = app().await;

        let (status, root) = send(&app, Method::POST, "/bootstrap/super-admin", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let root = (id_of(&root), "super_admin");

        let (status, dept) = send(&app, Method::POST, "/admin/departments", None, Some(json!({ "name": "Cardiology" }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, admin) = send(
            &app,
            Method::POST,
            &format!("/admin/departments/{}/admins", id_of(&dept)),
            None,
            Some(json!({ "username": "cardio", "display_name": "Cardio Admin", "role": "department_admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(admin["department_id"], dept["id"]);
        let admin = (id_of(&admin), "department_admin");

        let (status, scale) = send(
            &app,
            Method::POST,
            "/admin/scales",
            Some(root),
            Some(json!({
                "name": "PHQ-9",
                "items": [
                    { "prompt": "Little interest or pleasure in doing things", "options": "0,1,2,3" },
                    { "prompt": "Feeling down, depressed, or hopeless", "options": "0,1,2,3" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(scale["items"].as_array().unwrap().len(), 2);
        assert_eq!(scale["items"][0]["field_type"], "single_choice");

        let (status, alice) = send(&app, Method::POST, "/department/patients", Some(admin), Some(json!({ "name": "Alice" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let patient = (alice["user_id"].as_i64().unwrap(), "patient");

        let (status, assignment) = send(
            &app,
            Method::POST,
            "/department/assignments",
            Some(admin),
            Some(json!({ "patient_id": id_of(&alice), "scale_id": id_of(&scale), "allow_patient_view": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(assignment["completed_at"], Value::Null);
        assert!(assignment["evaluation_date"].as_str().unwrap().ends_with('Z'));

        let (status, listed) = send(&app, Method::GET, "/patient/assignments", Some(patient), None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["scale"]["name"], "PHQ-9");
        assert_eq!(listed[0]["scale"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(listed[0]["responses"], json!([]));

        let item1 = scale["items"][0]["id"].as_i64().unwrap();
        let (status, done) = send(
            &app,
            Method::POST,
            &format!("/patient/assignments/{}/responses", id_of(&assignment)),
            Some(patient),
            Some(json!({ "responses": [{ "item_id": item1, "answer_text": "2" }], "duration_seconds": 45 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["duration_seconds"], 45);
        assert!(done["completed_at"].is_string());

        let (_, listed) = send(&app, Method::GET, "/patient/assignments", Some(patient), None).await;
        assert_eq!(listed[0]["responses"], json!([{ "item_id": item1, "answer_text": "2" }]));
    }

    #[tokio::test]
    async fn missing_or_mismatched_identity_is_unauthenticated() {
        let app = app().await;
        let (_, root) = send(&app, Method::POST, "/bootstrap/super-admin", None, None).await;

        let (status, body) = send(&app, Method::GET, "/patient/assignments", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthenticated");

        let (status, _) = send(&app, Method::GET, "/patient/assignments", Some((id_of(&root), "patient")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, Method::GET, "/patient/assignments", Some((id_of(&root), "super_admin")), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn wrong_role_literals_are_bad_requests() {
        let app = app().await;
        let (_, dept) = send(&app, Method::POST, "/admin/departments", None, Some(json!({ "name": "Cardiology" }))).await;
        let uri = format!("/admin/departments/{}/admins", id_of(&dept));

        for role in ["patient", "super_admin", "admin"] {
            let (status, body) = send(
                &app,
                Method::POST,
                &uri,
                None,
                Some(json!({ "username": "x", "display_name": "X", "role": role })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{role}");
            assert_eq!(body["error"], "bad_request");
        }

        let (status, _) = send(
            &app,
            Method::POST,
            "/admin/departments/999/admins",
            None,
            Some(json!({ "username": "x", "display_name": "X", "role": "department_admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_department_is_conflict() {
        let app = app().await;
        let body = json!({ "name": "Cardiology" });
        let (first, _) = send(&app, Method::POST, "/admin/departments", None, Some(body.clone())).await;
        let (second, err) = send(&app, Method::POST, "/admin/departments", None, Some(body)).await;
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(err["error"], "conflict");
    }

    #[tokio::test]
    async fn report_settings_accept_explicit_null() {
        let app = app().await;
        let (_, root) = send(&app, Method::POST, "/bootstrap/super-admin", None, None).await;
        let root = (id_of(&root), "super_admin");
        let (_, dept) = send(&app, Method::POST, "/admin/departments", None, Some(json!({ "name": "Cardiology" }))).await;
        let (_, admin) = send(
            &app,
            Method::POST,
            &format!("/admin/departments/{}/admins", id_of(&dept)),
            None,
            Some(json!({ "username": "cardio", "display_name": "Cardio", "role": "department_admin" })),
        )
        .await;
        let admin = (id_of(&admin), "department_admin");
        let (_, scale) = send(&app, Method::POST, "/admin/scales", Some(root), Some(json!({ "name": "GAD-7", "items": [] }))).await;
        let (_, alice) = send(&app, Method::POST, "/department/patients", Some(admin), Some(json!({ "name": "Alice" }))).await;
        let (_, assignment) = send(
            &app,
            Method::POST,
            "/department/assignments",
            Some(admin),
            Some(json!({
                "patient_id": id_of(&alice),
                "scale_id": id_of(&scale),
                "report_header": "Initial",
                "evaluation_date": "2026-02-01T08:30:00Z"
            })),
        )
        .await;
        assert_eq!(assignment["allow_patient_view"], false);
        assert_eq!(assignment["evaluation_date"], "2026-02-01T08:30:00Z");

        let uri = format!("/department/assignments/{}/report-settings", id_of(&assignment));
        let (status, updated) = send(&app, Method::PATCH, &uri, Some(admin), Some(json!({ "allow_patient_view": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["allow_patient_view"], true);
        assert_eq!(updated["report_header"], "Initial");

        let (_, updated) = send(&app, Method::PATCH, &uri, Some(admin), Some(json!({ "report_header": null }))).await;
        assert_eq!(updated["report_header"], Value::Null);
        assert_eq!(updated["allow_patient_view"], true);
    }

    #[tokio::test]
    async fn provisioning_can_require_super_admin() {
        let mut config = Config::for_tests();
        config.require_provisioning_auth = true;
        let app = app_with(config).await;
        let body = json!({ "name": "Cardiology" });

        let (status, _) = send(&app, Method::POST, "/admin/departments", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, root) = send(&app, Method::POST, "/bootstrap/super-admin", None, None).await;
        let (status, dept) = send(&app, Method::POST, "/admin/departments", Some((id_of(&root), "super_admin")), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, admin) = send(
            &app,
            Method::POST,
            &format!("/admin/departments/{}/admins", id_of(&dept)),
            Some((id_of(&root), "super_admin")),
            Some(json!({ "username": "cardio", "display_name": "Cardio", "role": "department_admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/departments",
            Some((id_of(&admin), "department_admin")),
            Some(json!({ "name": "Oncology" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/admin/departments/{}/admins", id_of(&dept)),
            Some((id_of(&admin), "department_admin")),
            Some(json!({ "username": "other", "display_name": "Other", "role": "department_admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Only a super admin can create department admins");
    }

    #[tokio::test]
    async fn non_numeric_path_id_is_bad_request() {
        let app = app().await;
        let (_, root) = send(&app, Method::POST, "/bootstrap/super-admin", None, None).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/departments/abc/admins",
            None,
            Some(json!({ "username": "x", "display_name": "X", "role": "department_admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");

        let (status, body) = send(
            &app,
            Method::POST,
            "/patient/assignments/first/responses",
            Some((id_of(&root), "super_admin")),
            Some(json!({ "responses": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = app().await;
        let req = Request::builder()
            .method(Method::POST)
            .uri("/admin/departments")
            .header("content-type", "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
