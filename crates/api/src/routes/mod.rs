//! API routes

pub mod health;
pub mod payments;
pub mod usage;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{auth::require_auth, state::AppState};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let jwt_manager = state.jwt_manager.clone();

    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness));

    // Gateway webhook (public, uses signature verification). POST only;
    // any other method gets 405 from the router.
    let public_api_routes = Router::new().route("/payments/webhook", post(payments::webhook));

    // Protected API routes (auth required)
    let protected_api_routes = Router::new()
        .route("/payments/initiate", post(payments::initiate_payment))
        .route("/payments/verify", get(payments::verify_payment))
        .route("/payments", get(payments::list_payments))
        .route("/questions/generate", get(usage::generate_question))
        .route("/audio/generate", get(usage::generate_audio))
        .route("/usage", get(usage::get_usage))
        .route_layer(middleware::from_fn_with_state(jwt_manager, require_auth));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", public_api_routes.merge(protected_api_routes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sqlx::PgPool;
    use tower::ServiceExt;

    use studyhall_billing::{PaystackClient, PaystackConfig};

    use crate::config::Config;

    fn test_state() -> AppState {
        // connect_lazy never touches the network; these tests only hit
        // paths that are rejected before any query runs
        let pool = PgPool::connect_lazy("postgres://localhost/unused").expect("lazy pool");

        let config = Config {
            bind_address: "127.0.0.1:0".to_string(),
            public_url: "http://localhost:3000".to_string(),
            database_url: "postgres://localhost/unused".to_string(),
            database_max_connections: 1,
            jwt_secret: "test-jwt-secret-at-least-32-chars!!".to_string(),
            jwt_expiry_hours: 24,
        };

        let paystack = PaystackClient::new(PaystackConfig {
            secret_key: "sk_test_secret".to_string(),
            base_url: "http://localhost:9".to_string(),
            callback_url: "http://localhost:3000/payment/verify".to_string(),
            premium_price_minor: 1000,
            currency: "GHS".to_string(),
            timeout: std::time::Duration::from_secs(1),
        })
        .expect("client");

        AppState::new(pool, config, paystack)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/usage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_rejects_get() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/payments/webhook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_webhook_without_signature_is_forbidden() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/payments/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"event":"charge.success","data":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
