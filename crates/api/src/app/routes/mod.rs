use axum::Router;

pub mod auth;
pub mod books;
pub mod orders;
pub mod system;
pub mod users;

/// Router for every resource endpoint (`/health` is mounted separately).
pub fn router() -> Router {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/books", books::router())
        .nest("/users", users::router())
        .nest("/login", auth::router())
}
