/**
 * Routes Module
 * API route handlers
 */
pub mod auth;
pub mod health;
pub mod messages;
pub mod resource;
pub mod settings;
pub mod upload;

use axum::Router;

use crate::db::models::{Category, Project, ResumeItem, Service, Testimonial, User};
use crate::AppState;

/// Everything mounted under `/api`.
pub fn api_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(state))
        .nest("/services", resource::router::<Service>(state))
        .nest("/projects", resource::router::<Project>(state))
        .nest("/categories", resource::router::<Category>(state))
        .nest("/testimonials", resource::router::<Testimonial>(state))
        .nest("/resume", resource::router::<ResumeItem>(state))
        .nest("/users", resource::router::<User>(state))
        .nest("/messages", messages::router(state))
        .nest("/settings", settings::router(state))
        .nest("/upload", upload::router(state))
}
