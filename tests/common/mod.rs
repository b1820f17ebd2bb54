#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use thrive::config::{BookingConfig, CorsConfig, JwtConfig, StripeConfig};
use thrive::modules::payments::provider::{
    CreateIntentRequest, PaymentProvider, PaymentProviderError, ProviderIntent,
};
use thrive::router::init_router;
use thrive::state::AppState;
use thrive_auth::{Role, create_access_token};

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";

/// In-memory stand-in for Stripe. Records every request and can be told to
/// fail.
#[derive(Default)]
pub struct FakePaymentProvider {
    pub requests: Mutex<Vec<CreateIntentRequest>>,
    pub fail: bool,
}

impl FakePaymentProvider {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn last_request(&self) -> Option<CreateIntentRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        if self.fail {
            return Err(PaymentProviderError::Api {
                status: 500,
                message: "stripe is down".to_string(),
            });
        }
        let id = format!("pi_test_{}", requests.len());
        Ok(ProviderIntent {
            client_secret: Some(format!("{id}_secret")),
            id,
            status: "requires_payment_method".to_string(),
        })
    }
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry: 3600,
    }
}

pub fn stripe_config() -> StripeConfig {
    StripeConfig {
        secret_key: "sk_test_unused".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        api_base: "http://127.0.0.1:9".to_string(),
        webhook_tolerance_secs: 300,
    }
}

pub fn setup_test_app(pool: PgPool, provider: Arc<FakePaymentProvider>) -> axum::Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        jwt_config: jwt_config(),
        cors_config: CorsConfig::from_env(),
        stripe_config: stripe_config(),
        booking_config: BookingConfig::default(),
        payments: provider,
    };
    init_router(state)
}

pub fn token(subject: Uuid, role: Role) -> String {
    create_access_token(subject, "someone@example.com", role, &jwt_config()).unwrap()
}

pub async fn send(app: axum::Router, request: Request<Body>) -> (Response<Body>, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (Response::from_parts(parts, Body::empty()), json)
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub async fn create_test_student(pool: &PgPool) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO students (email, first_name, last_name, stripe_customer_id)
           VALUES ($1, 'Lea', 'Schmidt', 'cus_test')
           RETURNING id"#,
    )
    .bind(generate_unique_email())
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_test_teacher(pool: &PgPool, timezone: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO teachers (display_name, email, timezone) VALUES ('Ana', $1, $2) RETURNING id",
    )
    .bind(generate_unique_email())
    .bind(timezone)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_test_product(
    pool: &PgPool,
    service_key: &str,
    service_type: &str,
    credits: i32,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO stripe_product_map
               (service_key, service_type, stripe_product_id, stripe_price_id,
                unit_amount_cents, currency, credits, session_minutes, validity_days)
           VALUES ($1, $2::service_type, 'prod_test', 'price_test', 2500, 'eur', $3, 60, 90)
           RETURNING id"#,
    )
    .bind(service_key)
    .bind(service_type)
    .bind(credits)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_test_session(
    pool: &PgPool,
    teacher_id: Uuid,
    session_type: &str,
    start_at: DateTime<Utc>,
    capacity: i32,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO sessions (teacher_id, session_type, status, start_at, end_at, capacity)
           VALUES ($1, $2::session_type, 'SCHEDULED', $3, $4, $5)
           RETURNING id"#,
    )
    .bind(teacher_id)
    .bind(session_type)
    .bind(start_at)
    .bind(start_at + Duration::hours(1))
    .bind(capacity)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_test_package(pool: &PgPool, student_id: Uuid, credits: i32) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO student_packages (student_id, label, total_credits, remaining_credits)
           VALUES ($1, 'pack', $2, $2)
           RETURNING id"#,
    )
    .bind(student_id)
    .bind(credits)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn remaining_credits(pool: &PgPool, package_id: Uuid) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT remaining_credits FROM student_packages WHERE id = $1")
        .bind(package_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
