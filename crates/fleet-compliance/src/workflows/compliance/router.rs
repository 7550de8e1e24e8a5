use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Router,
};
use serde_json::json;
use tracing::error;

use super::clock::Clock;
use super::dashboard::DashboardAggregator;
use super::domain::{NotificationId, UserId};
use super::repository::{
    AuthError, Authenticator, NotificationStore, RepositoryError, VehicleStore,
};
use super::windows::ExpiryWindows;

/// Inbox listings are capped to the most recent records.
pub const NOTIFICATION_PAGE_LIMIT: usize = 100;

/// Read-side handles behind the compliance HTTP endpoints.
pub struct ComplianceApi<V, N, A> {
    dashboard: DashboardAggregator<V>,
    notifications: Arc<N>,
    auth: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<V, N, A> ComplianceApi<V, N, A>
where
    V: VehicleStore + 'static,
    N: NotificationStore + 'static,
    A: Authenticator + 'static,
{
    pub fn new(
        vehicles: Arc<V>,
        notifications: Arc<N>,
        auth: Arc<A>,
        clock: Arc<dyn Clock>,
        windows: ExpiryWindows,
    ) -> Self {
        Self {
            dashboard: DashboardAggregator::new(vehicles, windows),
            notifications,
            auth,
            clock,
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<UserId, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthError::MissingCredentials)?;
        self.auth.authenticate(token)
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Router builder exposing the dashboard and notification inbox.
pub fn compliance_router<V, N, A>(api: Arc<ComplianceApi<V, N, A>>) -> Router
where
    V: VehicleStore + 'static,
    N: NotificationStore + 'static,
    A: Authenticator + 'static,
{
    Router::new()
        .route("/api/v1/dashboard/stats", get(dashboard_handler::<V, N, A>))
        .route("/api/v1/notifications", get(notifications_handler::<V, N, A>))
        .route(
            "/api/v1/notifications/:notification_id/read",
            patch(mark_read_handler::<V, N, A>),
        )
        .with_state(api)
}

pub(crate) async fn dashboard_handler<V, N, A>(
    State(api): State<Arc<ComplianceApi<V, N, A>>>,
    headers: HeaderMap,
) -> Response
where
    V: VehicleStore + 'static,
    N: NotificationStore + 'static,
    A: Authenticator + 'static,
{
    let user_id = match api.authorize(&headers) {
        Ok(user_id) => user_id,
        Err(err) => return unauthorized(err),
    };

    match api.dashboard.stats(&user_id, api.clock.now()) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => internal_error(&user_id, err),
    }
}

pub(crate) async fn notifications_handler<V, N, A>(
    State(api): State<Arc<ComplianceApi<V, N, A>>>,
    headers: HeaderMap,
) -> Response
where
    V: VehicleStore + 'static,
    N: NotificationStore + 'static,
    A: Authenticator + 'static,
{
    let user_id = match api.authorize(&headers) {
        Ok(user_id) => user_id,
        Err(err) => return unauthorized(err),
    };

    match api
        .notifications
        .list_for_user(&user_id, NOTIFICATION_PAGE_LIMIT)
    {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => internal_error(&user_id, err),
    }
}

pub(crate) async fn mark_read_handler<V, N, A>(
    State(api): State<Arc<ComplianceApi<V, N, A>>>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> Response
where
    V: VehicleStore + 'static,
    N: NotificationStore + 'static,
    A: Authenticator + 'static,
{
    let user_id = match api.authorize(&headers) {
        Ok(user_id) => user_id,
        Err(err) => return unauthorized(err),
    };

    let id = NotificationId(notification_id);
    match api.notifications.mark_read(&user_id, &id) {
        Ok(()) => {
            let payload = json!({ "message": "Notification marked as read" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(RepositoryError::NotFound) => {
            let payload = json!({ "error": "Notification not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => internal_error(&user_id, err),
    }
}

fn unauthorized(err: AuthError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        axum::Json(payload),
    )
        .into_response()
}

fn internal_error(user_id: &UserId, err: RepositoryError) -> Response {
    error!(%user_id, error = %err, "compliance request failed");
    let payload = json!({ "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
