// ============================
// doge-lib/src/handlers/views.rs
// ============================
//! Static view routes.
use axum::response::Html;

/// `GET /client` — the upload client page
pub async fn client() -> Html<&'static str> {
    Html(include_str!("../../assets/client.html"))
}

/// `GET /monitor` — the live alert monitor page
pub async fn monitor() -> Html<&'static str> {
    Html(include_str!("../../assets/monitor.html"))
}
