use super::*;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use shared::{
    domain::{Amount, EmployeeStatus, MobileOperator, Role, TransactionStatus, UserId},
    error::ErrorCode,
    protocol::{ClientContact, UserProfile},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct MockState {
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
    reservation_bodies: Arc<Mutex<Vec<Value>>>,
    processed_payments: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn mock_login(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
    if body["password"] != "secret" {
        return (
            AxumStatus::UNAUTHORIZED,
            Json(json!({"success": false, "message": "Identifiants invalides"})),
        );
    }
    (
        AxumStatus::OK,
        Json(json!({
            "success": true,
            "data": {
                "token": "jwt-token",
                "user": {
                    "_id": "u-9",
                    "email": body["email"],
                    "role": "admin",
                    "firstName": "Fatou"
                }
            }
        })),
    )
}

async fn mock_employees(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    if let Some(value) = headers.get("authorization") {
        state
            .seen_auth_headers
            .lock()
            .await
            .push(value.to_str().unwrap_or_default().to_string());
    }
    Json(json!({
        "success": true,
        "data": [{
            "_id": "e-1",
            "firstName": "Awa",
            "lastName": "Diop",
            "service": "housekeeper",
            "location": "Dakar",
            "hourlyRate": 2000,
            "status": "available"
        }]
    }))
}

async fn mock_rejected_services() -> Json<Value> {
    Json(json!({"success": false, "message": "Catalogue indisponible"}))
}

async fn mock_expired_reviews() -> (AxumStatus, Json<Value>) {
    (
        AxumStatus::UNAUTHORIZED,
        Json(json!({"success": false, "message": "Token expiré"})),
    )
}

async fn mock_broken_transactions() -> (AxumStatus, String) {
    (AxumStatus::INTERNAL_SERVER_ERROR, "upstream exploded".to_string())
}

async fn mock_slow_tickets() -> Json<Value> {
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    Json(json!({"success": true, "data": []}))
}

async fn mock_create_reservation(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.reservation_bodies.lock().await.push(body.clone());
    Json(json!({
        "success": true,
        "data": {
            "_id": "r-77",
            "employerId": body["employerId"],
            "startDate": body["startDate"],
            "address": body["address"],
            "client": body["client"],
            "status": "pending",
            "amount": body["amount"]
        }
    }))
}

async fn mock_create_payment(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "_id": "p-5",
            "reservationId": body["reservationId"],
            "amount": body["amount"],
            "method": body["method"],
            "status": "pending"
        }
    }))
}

async fn mock_process_payment(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.processed_payments.lock().await.push((id.clone(), body));
    Json(json!({"success": true, "data": {"paymentId": id, "status": "success"}}))
}

async fn spawn_mock_api() -> (String, MockState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = MockState::default();
    let app = Router::new()
        .route("/api/v1/auth/login", post(mock_login))
        .route("/api/v1/employers", get(mock_employees))
        .route("/api/v1/services", get(mock_rejected_services))
        .route("/api/v1/reviews", get(mock_expired_reviews))
        .route("/api/v1/transactions", get(mock_broken_transactions))
        .route("/api/v1/support/tickets", get(mock_slow_tickets))
        .route("/api/v1/reservations", post(mock_create_reservation))
        .route("/api/v1/payments", post(mock_create_payment))
        .route("/api/v1/payments/:id/process", post(mock_process_payment))
        .route("/api/v1/reviews/:id/archive", patch(mock_expired_reviews))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api/v1"), state)
}

fn client_for(base_url: &str) -> MarketplaceClient {
    MarketplaceClient::new(
        ClientConfig::new(base_url).expect("config"),
        Arc::new(SessionManager::in_memory()),
    )
    .expect("client")
}

async fn signed_in_client(base_url: &str) -> MarketplaceClient {
    let client = client_for(base_url);
    client
        .session()
        .establish(Session::new(
            UserProfile {
                id: UserId::new("u-1"),
                email: "admin@nataal.shop".to_string(),
                role: Role::Admin,
                first_name: None,
                last_name: None,
                phone: None,
            },
            "preset-token",
        ))
        .await
        .expect("establish");
    client
}

#[test]
fn base_url_gets_trailing_slash() {
    let config = ClientConfig::new("https://mp-api.nataal.shop/api/v1").expect("config");
    assert_eq!(config.base_url.as_str(), "https://mp-api.nataal.shop/api/v1/");
    assert_eq!(
        config.base_url.join("employers").expect("join").as_str(),
        "https://mp-api.nataal.shop/api/v1/employers"
    );
}

#[tokio::test]
async fn login_stores_session_and_authorizes_later_calls() {
    let (base_url, state) = spawn_mock_api().await;
    let client = client_for(&base_url);

    let session = client
        .login(" fatou@nataal.shop ", "secret")
        .await
        .expect("login");
    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.user.email, "fatou@nataal.shop");
    assert_eq!(client.session().token().await.as_deref(), Some("jwt-token"));

    let employees = client.list_employees().await.expect("employees");
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].status, EmployeeStatus::Available);

    let headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(headers, vec!["Bearer jwt-token".to_string()]);
}

#[tokio::test]
async fn bad_credentials_surface_server_message_without_session() {
    let (base_url, _state) = spawn_mock_api().await;
    let client = client_for(&base_url);

    let err = client
        .login("fatou@nataal.shop", "wrong")
        .await
        .expect_err("login must fail");
    assert_eq!(err.code(), Some(ErrorCode::Unauthorized));
    assert_eq!(err.server_message(), Some("Identifiants invalides"));
    assert!(!client.session().is_authenticated().await);
}

#[tokio::test]
async fn authenticated_call_without_session_is_rejected_locally() {
    let (base_url, state) = spawn_mock_api().await;
    let client = client_for(&base_url);

    let err = client.list_employees().await.expect_err("no session");
    assert!(matches!(err, ClientError::NotLoggedIn));
    assert!(state.seen_auth_headers.lock().await.is_empty());
}

#[tokio::test]
async fn success_false_with_200_is_an_application_error() {
    let (base_url, _state) = spawn_mock_api().await;
    let client = signed_in_client(&base_url).await;

    let err = client.list_services().await.expect_err("rejected");
    assert_eq!(err.code(), Some(ErrorCode::Rejected));
    assert_eq!(err.server_message(), Some("Catalogue indisponible"));
    assert!(!err.is_network());
    assert!(client.session().is_authenticated().await);
}

#[tokio::test]
async fn unauthorized_response_clears_session_and_notifies() {
    let (base_url, _state) = spawn_mock_api().await;
    let client = signed_in_client(&base_url).await;
    let mut events = client.session().subscribe();

    let err = client.list_reviews().await.expect_err("expired");
    assert!(err.requires_reauth());
    assert_eq!(err.server_message(), Some("Token expiré"));
    assert!(!client.session().is_authenticated().await);
    assert_eq!(
        events.recv().await.expect("event"),
        SessionEvent::Invalidated {
            reason: InvalidationReason::Rejected { status: 401 }
        }
    );
}

#[tokio::test]
async fn server_error_without_envelope_has_no_message() {
    let (base_url, _state) = spawn_mock_api().await;
    let client = signed_in_client(&base_url).await;

    let err = client.list_transactions().await.expect_err("500");
    assert_eq!(err.code(), Some(ErrorCode::Internal));
    assert_eq!(err.server_message(), None);
}

#[tokio::test]
async fn slow_server_times_out() {
    let (base_url, _state) = spawn_mock_api().await;
    let config = ClientConfig::new(&base_url).expect("config").with_timeouts(
        std::time::Duration::from_millis(300),
        std::time::Duration::from_millis(300),
    );
    let client =
        MarketplaceClient::new(config, Arc::new(SessionManager::in_memory())).expect("client");
    client
        .session()
        .establish(Session::new(
            UserProfile {
                id: UserId::new("u-1"),
                email: "admin@nataal.shop".to_string(),
                role: Role::Admin,
                first_name: None,
                last_name: None,
                phone: None,
            },
            "preset-token",
        ))
        .await
        .expect("establish");

    let err = client.list_tickets().await.expect_err("timeout");
    assert!(matches!(err, ClientError::Timeout { .. }), "got {err:?}");
    assert!(err.is_network());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = client_for(&format!("http://{addr}/api/v1"));
    let err = client
        .login("fatou@nataal.shop", "secret")
        .await
        .expect_err("unreachable");
    assert!(err.is_network(), "got {err:?}");
}

#[tokio::test]
async fn create_reservation_posts_api_field_names() {
    let (base_url, state) = spawn_mock_api().await;
    let client = signed_in_client(&base_url).await;

    let reservation = client
        .create_reservation(&ReservationRequest {
            employee: Some(EmployeeId::new("e-1")),
            service: None,
            start_date: Utc
                .with_ymd_and_hms(2026, 11, 2, 9, 0, 0)
                .single()
                .expect("date"),
            duration_hours: 4,
            address: "Mermoz, Dakar".to_string(),
            client: ClientContact {
                name: "Awa Diop".to_string(),
                phone: "771234567".to_string(),
                email: "a@x.com".to_string(),
            },
            notes: Some("Code portail 1234".to_string()),
            amount: Amount(8000),
        })
        .await
        .expect("reservation");

    assert_eq!(reservation.id, ReservationId::new("r-77"));
    assert_eq!(reservation.status, ReservationStatus::Pending);
    let bodies = state.reservation_bodies.lock().await.clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["employerId"], "e-1");
    assert_eq!(bodies[0]["amount"], 8000);
    assert_eq!(bodies[0]["client"]["phone"], "771234567");
}

#[tokio::test]
async fn payment_is_created_then_processed_with_details() {
    let (base_url, state) = spawn_mock_api().await;
    let client = signed_in_client(&base_url).await;

    let payment = client
        .create_payment(&CreatePaymentRequest {
            reservation_id: ReservationId::new("r-77"),
            amount: Amount(8000),
            method: shared::domain::PaymentMethod::MobileMoney,
        })
        .await
        .expect("payment");
    let ack = client
        .process_payment(
            &payment.id,
            &PaymentDetails::MobileMoney {
                phone: "771234567".to_string(),
                operator: MobileOperator::Wave,
            },
        )
        .await
        .expect("ack");

    assert_eq!(ack.status, TransactionStatus::Success);
    assert_eq!(ack.redirect_url, None);
    let processed = state.processed_payments.lock().await.clone();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].0, "p-5");
    assert_eq!(processed[0].1["details"]["type"], "mobile_money");
    assert_eq!(processed[0].1["details"]["operator"], "wave");
}
