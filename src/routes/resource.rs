/**
 * Resource Routes
 * list / get / create / update / delete for any stored entity
 */
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::Resource;
use crate::error::{ApiError, Result};
use crate::policy::guard;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Malformed ids cannot match anything, so they read as not found.
pub fn parse_id<R: Resource>(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(R::NAME))
}

pub fn router<R: Resource>(state: &AppState) -> Router<AppState> {
    let policy = R::POLICY;
    Router::new()
        .route(
            "/",
            guard(policy.list, state, get(list::<R>))
                .merge(guard(policy.create, state, post(create::<R>))),
        )
        .route(
            "/{id}",
            guard(policy.get, state, get(fetch::<R>))
                .merge(guard(policy.update, state, put(update::<R>)))
                .merge(guard(policy.delete, state, delete(remove::<R>))),
        )
}

pub async fn list<R: Resource>(State(state): State<AppState>) -> Result<Json<Vec<Value>>> {
    let repo = state.repo::<R>();
    let docs = repo.list().await?;
    Ok(Json(repo.present_all(docs).await?))
}

pub async fn fetch<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let repo = state.repo::<R>();
    let doc = repo.get(parse_id::<R>(&id)?).await?;
    Ok(Json(repo.present(doc).await?))
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(payload) = body?;
    let repo = state.repo::<R>();
    let doc = repo.create(payload).await?;
    tracing::info!(collection = R::COLLECTION, id = %doc.id, "document created");
    Ok((StatusCode::CREATED, Json(repo.present(doc).await?)))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let id = parse_id::<R>(&id)?;
    let Json(patch) = body?;
    let repo = state.repo::<R>();
    let doc = repo.update(id, patch).await?;
    tracing::info!(collection = R::COLLECTION, %id, "document updated");
    Ok(Json(repo.present(doc).await?))
}

pub async fn remove<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = parse_id::<R>(&id)?;
    state.repo::<R>().delete(id).await?;
    tracing::info!(collection = R::COLLECTION, %id, "document deleted");
    Ok(Json(MessageResponse {
        message: format!("{} removed", R::NAME),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_app;
    use crate::db::models::Role;
    use crate::test_support::{
        admin_token, create_user, empty_request, employee_token, json_request, send, test_state,
        token_for,
    };
    use serde_json::json;

    fn service() -> Value {
        json!({
            "title": "Graphic Design",
            "description": "Posters and social media creatives",
            "price": 100.0,
            "features": ["Posters", "Flyers"],
            "icon": "ux"
        })
    }

    #[tokio::test]
    async fn test_service_scenario() {
        let (state, _dir, _mailer) = test_state();
        let token = admin_token(&state).await;
        let app = create_app(state);

        let (status, created) = send(
            app.clone(),
            json_request("POST", "/api/services", Some(&token), service()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["_id"].as_str().unwrap().to_string();
        for (key, value) in service().as_object().unwrap() {
            assert_eq!(&created[key], value, "field {key}");
        }
        assert!(created["createdAt"].is_string());
        assert!(created["updatedAt"].is_string());

        let (status, listed) = send(app.clone(), empty_request("GET", "/api/services", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["_id"], id.as_str());

        let (status, updated) = send(
            app.clone(),
            json_request(
                "PUT",
                &format!("/api/services/{id}"),
                Some(&token),
                json!({"price": 150.0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["price"], 150.0);
        assert_eq!(updated["title"], "Graphic Design");
        assert_eq!(updated["features"], json!(["Posters", "Flyers"]));
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let (status, body) = send(
            app.clone(),
            empty_request("DELETE", &format!("/api/services/{id}"), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Service removed");

        let (status, body) = send(
            app.clone(),
            empty_request("GET", &format!("/api/services/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Service not found");

        let (status, _) = send(
            app,
            empty_request("DELETE", &format!("/api/services/{id}"), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_then_get_returns_input_for_each_resource() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        let cases = [
            ("services", service()),
            (
                "categories",
                json!({"name": "Web Design", "color": "#3b82f6", "description": "Sites"}),
            ),
            (
                "testimonials",
                json!({"name": "John Doe", "position": "CMO", "company": "Acme",
                       "message": "Great work", "image": "/uploads/a.png", "rating": 5}),
            ),
            (
                "resume",
                json!({"title": "Designer", "organization": "Studio", "duration": "2020",
                       "description": "Work", "type": "experience", "order": 2}),
            ),
            (
                "projects",
                json!({"title": "Brand", "description": "Motion", "image": "/uploads/b.png",
                       "link": "https://example.com", "category": null, "likes": 3,
                       "technologies": ["AE"], "gallery": [], "projectType": "video"}),
            ),
        ];

        for (collection, input) in cases {
            let (status, created) = send(
                app.clone(),
                json_request("POST", &format!("/api/{collection}"), Some(&token), input.clone()),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED, "{collection}: {created}");
            let id = created["_id"].as_str().unwrap();

            let (status, fetched) = send(
                app.clone(),
                empty_request("GET", &format!("/api/{collection}/{id}"), None),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            for (key, value) in input.as_object().unwrap() {
                assert_eq!(&fetched[key], value, "{collection}.{key}");
            }
            assert_eq!(fetched["_id"], id);
            assert!(fetched["createdAt"].is_string());
            assert!(fetched["updatedAt"].is_string());
        }
    }

    #[tokio::test]
    async fn test_defaults_are_applied_on_create() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        let (_, category) = send(
            app.clone(),
            json_request("POST", "/api/categories", Some(&token), json!({"name": "Web"})),
        )
        .await;
        assert_eq!(category["color"], "#ff014f");

        let (_, project) = send(
            app,
            json_request(
                "POST",
                "/api/projects",
                Some(&token),
                json!({"title": "t", "description": "d", "unknown": "dropped"}),
            ),
        )
        .await;
        assert_eq!(project["likes"], 0);
        assert_eq!(project["projectType"], "image");
        assert!(project.get("unknown").is_none());
    }

    #[tokio::test]
    async fn test_validation_errors_list_fields() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        let (status, body) = send(
            app.clone(),
            json_request(
                "POST",
                "/api/services",
                Some(&token),
                json!({"title": "", "description": "d", "price": -5}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["price", "title"]);

        let (status, _) = send(
            app.clone(),
            json_request("POST", "/api/services", Some(&token), json!({"title": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app,
            json_request("POST", "/api/services", Some(&token), json!(["not", "an", "object"])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_cannot_overwrite_identity_or_timestamps() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        let (_, created) = send(
            app.clone(),
            json_request("POST", "/api/services", Some(&token), service()),
        )
        .await;
        let id = created["_id"].as_str().unwrap();

        let (status, updated) = send(
            app,
            json_request(
                "PUT",
                &format!("/api/services/{id}"),
                Some(&token),
                json!({"_id": Uuid::new_v4(), "createdAt": "2000-01-01T00:00:00Z", "icon": "web"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["_id"], id);
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_eq!(updated["icon"], "web");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        let (status, _) = send(
            app.clone(),
            empty_request("GET", &format!("/api/projects/{}", Uuid::new_v4()), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            app.clone(),
            empty_request("GET", "/api/projects/not-an-id", None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Project not found");

        let (status, _) = send(
            app,
            json_request(
                "PUT",
                &format!("/api/projects/{}", Uuid::new_v4()),
                Some(&token),
                json!({"title": "x"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mutations_require_a_valid_token() {
        let (state, _dir, _mailer) = test_state();
        let app = create_app(state);

        let (status, body) = send(
            app.clone(),
            json_request("POST", "/api/services", None, service()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authorized, no token");

        let (status, _) = send(
            app.clone(),
            json_request("POST", "/api/services", Some("garbage"), service()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let id = Uuid::new_v4();
        let (status, _) = send(
            app.clone(),
            json_request("PUT", &format!("/api/testimonials/{id}"), None, json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app,
            empty_request("DELETE", &format!("/api/resume/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_of_deleted_or_disabled_user_is_rejected() {
        let (state, _dir, _mailer) = test_state();
        let user = create_user(&state, "gone@example.com", Role::Employee).await;
        let token = token_for(&state, &user);
        let app = create_app(state.clone());

        let (status, _) = send(
            app.clone(),
            json_request("POST", "/api/services", Some(&token), service()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        state
            .repo::<crate::db::models::User>()
            .update(user.id, json!({"isActive": false}))
            .await
            .unwrap();
        let (status, body) = send(
            app.clone(),
            json_request("POST", "/api/services", Some(&token), service()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Account is disabled");

        state
            .repo::<crate::db::models::User>()
            .delete(user.id)
            .await
            .unwrap();
        let (status, _) = send(
            app,
            json_request("POST", "/api/services", Some(&token), service()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_routes_are_admin_only() {
        let (state, _dir, _mailer) = test_state();
        let staff = employee_token(&state).await;
        let admin = admin_token(&state).await;
        let app = create_app(state);

        let (status, body) = send(app.clone(), empty_request("GET", "/api/users", Some(&staff))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not authorized as an admin");

        let (status, _) = send(app.clone(), empty_request("GET", "/api/users", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, users) = send(app, empty_request("GET", "/api/users", Some(&admin))).await;
        assert_eq!(status, StatusCode::OK);
        let users = users.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("password").is_none()));
    }

    #[tokio::test]
    async fn test_user_create_hashes_and_enforces_unique_email() {
        let (state, _dir, _mailer) = test_state();
        let admin = admin_token(&state).await;
        let app = create_app(state.clone());

        let (status, created) = send(
            app.clone(),
            json_request(
                "POST",
                "/api/users",
                Some(&admin),
                json!({"name": "Staff", "email": "Staff@Example.com", "password": "secret1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["email"], "staff@example.com");
        assert_eq!(created["role"], "employee");
        assert_eq!(created["isActive"], true);
        assert!(created.get("password").is_none());

        let id = Uuid::parse_str(created["_id"].as_str().unwrap()).unwrap();
        let stored = state.repo::<crate::db::models::User>().get(id).await.unwrap();
        assert_ne!(stored.data.password, "secret1");
        assert!(stored.data.password.starts_with("$2"));

        let (status, body) = send(
            app.clone(),
            json_request(
                "POST",
                "/api/users",
                Some(&admin),
                json!({"name": "Dup", "email": "staff@example.com", "password": "secret1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists");

        let (status, _) = send(
            app.clone(),
            json_request(
                "POST",
                "/api/users",
                Some(&admin),
                json!({"name": "Short", "email": "short@example.com", "password": "123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = send(
            app.clone(),
            json_request(
                "PUT",
                &format!("/api/users/{id}"),
                Some(&admin),
                json!({"email": "staff@example.com", "password": "", "name": "Renamed"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Renamed");
        let after = state.repo::<crate::db::models::User>().get(id).await.unwrap();
        assert_eq!(after.data.password, stored.data.password);

        let (status, body) = send(
            app,
            json_request(
                "PUT",
                &format!("/api/users/{id}"),
                Some(&admin),
                json!({"email": "admin@example.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists");
    }

    #[tokio::test]
    async fn test_resume_is_listed_by_order() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        for order in [3, 1, 2] {
            let (status, _) = send(
                app.clone(),
                json_request(
                    "POST",
                    "/api/resume",
                    Some(&token),
                    json!({"title": format!("t{order}"), "organization": "o",
                           "duration": "d", "type": "education", "order": order}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, listed) = send(app, empty_request("GET", "/api/resume", None)).await;
        let orders: Vec<i64> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["order"].as_i64().unwrap())
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_project_category_is_populated_and_loose() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        let (_, category) = send(
            app.clone(),
            json_request(
                "POST",
                "/api/categories",
                Some(&token),
                json!({"name": "Web Design"}),
            ),
        )
        .await;
        let category_id = category["_id"].as_str().unwrap().to_string();

        let (_, project) = send(
            app.clone(),
            json_request(
                "POST",
                "/api/projects",
                Some(&token),
                json!({"title": "t", "description": "d", "category": category_id}),
            ),
        )
        .await;
        assert_eq!(project["category"]["name"], "Web Design");
        assert_eq!(project["category"]["_id"], category_id.as_str());

        let (status, _) = send(
            app.clone(),
            empty_request("DELETE", &format!("/api/categories/{category_id}"), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, listed) = send(app, empty_request("GET", "/api/projects", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert!(listed[0]["category"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_error() {
        let (state, _dir, _mailer) = test_state();
        let token = employee_token(&state).await;
        let app = create_app(state);

        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/api/categories")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }
}
