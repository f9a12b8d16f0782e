//! Typed client for the marketplace REST API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        EmployeeId, PaymentId, ReservationId, ReservationStatus, ReviewId, ServiceId, TicketId,
        TicketStatus,
    },
    error::ApiError,
    protocol::{
        ApiEnvelope, ClientRegistrationRequest, CreatePaymentRequest, Employee,
        HousekeeperRegistrationRequest, LoginRequest, LoginResponse, Payment, PaymentAck,
        PaymentDetails, PaymentLink, PaymentLinkRequest, ProcessPaymentRequest,
        RegistrationReceipt, Reservation, ReservationRequest, Review, ReviewInput, Service,
        ServiceInput, StatusUpdate, SupportTicket, Transaction,
    },
};
use tracing::{debug, warn};
use url::Url;

pub mod error;
pub mod session;

pub use error::{ClientError, SessionError};
pub use session::{
    FileSessionStore, InvalidationReason, MemorySessionStore, Session, SessionEvent,
    SessionManager, SessionStore,
};

pub const DEFAULT_API_URL: &str = "https://mp-api.nataal.shop/api/v1/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    pub auth_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
        })
    }

    pub fn with_timeouts(mut self, request_timeout: Duration, auth_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.auth_timeout = auth_timeout;
        self
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Operations the UI flows need from the remote API.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Session>;
    async fn logout(&self);

    async fn list_employees(&self) -> Result<Vec<Employee>>;
    async fn get_employee(&self, id: &EmployeeId) -> Result<Employee>;
    async fn register_housekeeper(&self, request: &HousekeeperRegistrationRequest)
        -> Result<Employee>;
    async fn update_employee(&self, employee: &Employee) -> Result<Employee>;
    async fn delete_employee(&self, id: &EmployeeId) -> Result<()>;

    async fn register_client(&self, request: &ClientRegistrationRequest)
        -> Result<RegistrationReceipt>;

    async fn list_reservations(&self) -> Result<Vec<Reservation>>;
    async fn get_reservation(&self, id: &ReservationId) -> Result<Reservation>;
    async fn create_reservation(&self, request: &ReservationRequest) -> Result<Reservation>;
    async fn update_reservation_status(
        &self,
        id: &ReservationId,
        status: ReservationStatus,
    ) -> Result<Reservation>;
    async fn delete_reservation(&self, id: &ReservationId) -> Result<()>;

    async fn list_services(&self) -> Result<Vec<Service>>;
    async fn create_service(&self, input: &ServiceInput) -> Result<Service>;
    async fn update_service(&self, id: &ServiceId, input: &ServiceInput) -> Result<Service>;
    async fn delete_service(&self, id: &ServiceId) -> Result<()>;

    async fn list_reviews(&self) -> Result<Vec<Review>>;
    async fn create_review(&self, input: &ReviewInput) -> Result<Review>;
    async fn archive_review(&self, id: &ReviewId) -> Result<Review>;
    async fn delete_review(&self, id: &ReviewId) -> Result<()>;

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment>;
    async fn process_payment(&self, id: &PaymentId, details: &PaymentDetails)
        -> Result<PaymentAck>;
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink>;

    async fn list_transactions(&self) -> Result<Vec<Transaction>>;
    async fn list_tickets(&self) -> Result<Vec<SupportTicket>>;
    async fn update_ticket_status(&self, id: &TicketId, status: TicketStatus)
        -> Result<SupportTicket>;
}

pub struct MarketplaceClient {
    http: Client,
    config: ClientConfig,
    session: Arc<SessionManager>,
}

impl MarketplaceClient {
    pub fn new(config: ClientConfig, session: Arc<SessionManager>) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.config.base_url.join(path)?)
    }

    async fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        let token = self.session.token().await.ok_or(ClientError::NotLoggedIn)?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authed(Method::GET, path).await?;
        self.fetch(path, request).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.authed(method, path).await?.json(body);
        self.fetch(path, request).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let request = self.authed(Method::DELETE, path).await?;
        self.execute::<serde_json::Value>(path, request, true)
            .await
            .map(|_| ())
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        self.execute(path, request, true)
            .await?
            .ok_or_else(|| ClientError::MissingData {
                endpoint: path.to_string(),
            })
    }

    /// Sends the request and unwraps the `{success, data, message}` envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
        authenticated: bool,
    ) -> Result<Option<T>> {
        let response = request
            .send()
            .await
            .map_err(|err| classify_send_error(path, err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| classify_send_error(path, err))?;

        if authenticated && (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
        {
            warn!(endpoint = path, status = status.as_u16(), "api rejected session");
            self.session
                .invalidate(InvalidationReason::Rejected {
                    status: status.as_u16(),
                })
                .await;
            return Err(ClientError::Unauthorized {
                status: status.as_u16(),
                message: envelope_message(&body),
            });
        }

        if !status.is_success() {
            warn!(endpoint = path, status = status.as_u16(), "api request failed");
            return Err(ApiError::from_status(status.as_u16(), envelope_message(&body)).into());
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
                endpoint: path.to_string(),
                source,
            })?;
        let data = envelope.into_result(status.as_u16())?;
        debug!(endpoint = path, status = status.as_u16(), "api request succeeded");
        Ok(data)
    }
}

fn classify_send_error(path: &str, err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout {
            endpoint: path.to_string(),
        }
    } else if err.is_connect() {
        ClientError::Unreachable {
            endpoint: path.to_string(),
            source: err,
        }
    } else {
        ClientError::Transport(err)
    }
}

fn envelope_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
}

#[async_trait]
impl MarketplaceApi for MarketplaceClient {
    async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let path = "auth/login";
        let request = self
            .http
            .post(self.endpoint(path)?)
            .timeout(self.config.auth_timeout)
            .json(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            });
        let response: LoginResponse =
            self.execute(path, request, false)
                .await?
                .ok_or_else(|| ClientError::MissingData {
                    endpoint: path.to_string(),
                })?;
        let session = Session::new(response.user, response.token);
        self.session.establish(session.clone()).await?;
        Ok(session)
    }

    async fn logout(&self) {
        self.session.invalidate(InvalidationReason::Logout).await;
    }

    async fn list_employees(&self) -> Result<Vec<Employee>> {
        self.get("employers").await
    }

    async fn get_employee(&self, id: &EmployeeId) -> Result<Employee> {
        self.get(&format!("employers/{id}")).await
    }

    async fn register_housekeeper(
        &self,
        request: &HousekeeperRegistrationRequest,
    ) -> Result<Employee> {
        // Registration is open to visitors; a token is attached when present.
        let path = "employers";
        let mut builder = self.http.post(self.endpoint(path)?).json(request);
        if let Some(token) = self.session.token().await {
            builder = builder.bearer_auth(token);
        }
        self.fetch(path, builder).await
    }

    async fn update_employee(&self, employee: &Employee) -> Result<Employee> {
        self.send_json(Method::PUT, &format!("employers/{}", employee.id), employee)
            .await
    }

    async fn delete_employee(&self, id: &EmployeeId) -> Result<()> {
        self.delete(&format!("employers/{id}")).await
    }

    async fn register_client(
        &self,
        request: &ClientRegistrationRequest,
    ) -> Result<RegistrationReceipt> {
        let path = "clients/register";
        let builder = self.http.post(self.endpoint(path)?).json(request);
        self.execute(path, builder, false)
            .await?
            .ok_or_else(|| ClientError::MissingData {
                endpoint: path.to_string(),
            })
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        self.get("reservations").await
    }

    async fn get_reservation(&self, id: &ReservationId) -> Result<Reservation> {
        self.get(&format!("reservations/{id}")).await
    }

    async fn create_reservation(&self, request: &ReservationRequest) -> Result<Reservation> {
        self.send_json(Method::POST, "reservations", request).await
    }

    async fn update_reservation_status(
        &self,
        id: &ReservationId,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        self.send_json(
            Method::PATCH,
            &format!("reservations/{id}/status"),
            &StatusUpdate { status },
        )
        .await
    }

    async fn delete_reservation(&self, id: &ReservationId) -> Result<()> {
        self.delete(&format!("reservations/{id}")).await
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        self.get("services").await
    }

    async fn create_service(&self, input: &ServiceInput) -> Result<Service> {
        self.send_json(Method::POST, "services", input).await
    }

    async fn update_service(&self, id: &ServiceId, input: &ServiceInput) -> Result<Service> {
        self.send_json(Method::PUT, &format!("services/{id}"), input)
            .await
    }

    async fn delete_service(&self, id: &ServiceId) -> Result<()> {
        self.delete(&format!("services/{id}")).await
    }

    async fn list_reviews(&self) -> Result<Vec<Review>> {
        self.get("reviews").await
    }

    async fn create_review(&self, input: &ReviewInput) -> Result<Review> {
        self.send_json(Method::POST, "reviews", input).await
    }

    async fn archive_review(&self, id: &ReviewId) -> Result<Review> {
        let path = format!("reviews/{id}/archive");
        let request = self.authed(Method::PATCH, &path).await?;
        self.fetch(&path, request).await
    }

    async fn delete_review(&self, id: &ReviewId) -> Result<()> {
        self.delete(&format!("reviews/{id}")).await
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment> {
        self.send_json(Method::POST, "payments", request).await
    }

    async fn process_payment(
        &self,
        id: &PaymentId,
        details: &PaymentDetails,
    ) -> Result<PaymentAck> {
        self.send_json(
            Method::POST,
            &format!("payments/{id}/process"),
            &ProcessPaymentRequest {
                details: details.clone(),
            },
        )
        .await
    }

    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink> {
        self.send_json(Method::POST, "payments/link", request).await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.get("transactions").await
    }

    async fn list_tickets(&self) -> Result<Vec<SupportTicket>> {
        self.get("support/tickets").await
    }

    async fn update_ticket_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
    ) -> Result<SupportTicket> {
        self.send_json(
            Method::PATCH,
            &format!("support/tickets/{id}/status"),
            &StatusUpdate { status },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
