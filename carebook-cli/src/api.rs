//! API client for the CareBook REST API.
//!
//! This module provides an async HTTP client for the booking backend.
//! All methods are non-blocking and designed to run in a separate Tokio task.
//! Authenticated calls send the session token as a bearer token.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{
    ActivateRequest, Appointment, CreateAppointmentRequest, CreateVehicleRequest, CustomerProfile,
    ErrorBody, Invoice, PaymentEnvelope, PaymentLink, PriceLine, RegisterRequest, Service,
    UpdateCustomerRequest, VehicleType,
};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a request carries the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Required,
    IfAvailable,
    None,
}

/// API client for the booking backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client with the specified base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Attach the session token used for authenticated calls
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, auth: Auth) -> Result<(String, RequestBuilder), ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, &url);
        match (auth, self.token.as_deref()) {
            (Auth::Required | Auth::IfAvailable, Some(token)) => {
                builder = builder.bearer_auth(token);
            }
            (Auth::Required, None) => return Err(ApiError::MissingSession("token")),
            _ => {}
        }
        Ok((url, builder))
    }

    async fn send(url: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        tracing::debug!(%url, "sending request");
        let response = builder.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.text().map(str::to_string))
            .unwrap_or(text);
        tracing::warn!(%url, %status, %message, "request rejected");
        Err(ApiError::Status { status, message })
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
        response.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, auth: Auth) -> Result<T, ApiError> {
        let (url, builder) = self.request(Method::GET, path, auth)?;
        let response = Self::send(&url, builder).await?;
        Self::decode(&url, response).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        auth: Auth,
    ) -> Result<Response, ApiError> {
        let (url, builder) = self.request(method, path, auth)?;
        Self::send(&url, builder.json(body)).await
    }

    // ============================================
    // Account
    // ============================================

    /// Register a new customer account. The backend mails a one-time code.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/users/register", request, Auth::None)
            .await?;
        Ok(())
    }

    /// Activate an account with the mailed one-time code
    pub async fn activate(&self, request: &ActivateRequest) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/users/activate", request, Auth::None)
            .await?;
        Ok(())
    }

    /// Fetch the customer behind a user account, with their vehicles
    pub async fn fetch_customer_profile(&self, user_id: &str) -> Result<CustomerProfile, ApiError> {
        self.get(&format!("/users/mobile/{}", user_id), Auth::Required)
            .await
    }

    /// Fetch the full profile page data (rank, spending, vehicles)
    pub async fn fetch_profile(&self, user_id: &str) -> Result<CustomerProfile, ApiError> {
        self.get(&format!("/users/{}", user_id), Auth::Required).await
    }

    /// Update customer contact details
    pub async fn update_customer(
        &self,
        customer_id: &str,
        request: &UpdateCustomerRequest,
    ) -> Result<(), ApiError> {
        self.send_json(
            Method::PUT,
            &format!("/users/{}", customer_id),
            request,
            Auth::Required,
        )
        .await?;
        Ok(())
    }

    // ============================================
    // Vehicles
    // ============================================

    /// Register a vehicle for a customer
    pub async fn add_vehicle(&self, request: &CreateVehicleRequest) -> Result<(), ApiError> {
        self.send_json(Method::POST, "/vehicles", request, Auth::Required)
            .await?;
        Ok(())
    }

    /// Remove a vehicle
    pub async fn delete_vehicle(&self, vehicle_id: &str) -> Result<(), ApiError> {
        let (url, builder) =
            self.request(Method::DELETE, &format!("/vehicles/{}", vehicle_id), Auth::Required)?;
        Self::send(&url, builder).await?;
        Ok(())
    }

    // ============================================
    // Catalogue
    // ============================================

    /// Fetch every service the shop offers
    pub async fn fetch_services(&self) -> Result<Vec<Service>, ApiError> {
        self.get("/services", Auth::Required).await
    }

    /// Fetch all vehicle types
    pub async fn fetch_vehicle_types(&self) -> Result<Vec<VehicleType>, ApiError> {
        self.get("/vehicle-types", Auth::Required).await
    }

    /// Fetch service prices for one vehicle type
    pub async fn fetch_prices(&self, vehicle_type_name: &str) -> Result<Vec<PriceLine>, ApiError> {
        let (url, builder) = self.request(Method::GET, "/prices/filterprice/", Auth::IfAvailable)?;
        let builder = builder.query(&[("vehicleTypeName", vehicle_type_name)]);
        let response = Self::send(&url, builder).await?;
        Self::decode(&url, response).await
    }

    // ============================================
    // Appointments
    // ============================================

    /// Book an appointment. The backend assigns a bay slot later.
    pub async fn book_appointment(&self, request: &CreateAppointmentRequest) -> Result<(), ApiError> {
        self.send_json(
            Method::POST,
            "/appointments/without-slot",
            request,
            Auth::Required,
        )
        .await?;
        Ok(())
    }

    /// Fetch the customer's appointment history
    pub async fn fetch_appointments(&self, customer_id: &str) -> Result<Vec<Appointment>, ApiError> {
        self.get(
            &format!("/appointments/mobile/appointment/customer/{}", customer_id),
            Auth::Required,
        )
        .await
    }

    /// Fetch the customer's appointments that are still being processed
    pub async fn fetch_waiting_appointments(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Appointment>, ApiError> {
        // "watting" is the backend's spelling
        self.get(
            &format!("/appointments/mobile/appointment/customer/watting/{}", customer_id),
            Auth::Required,
        )
        .await
    }

    // ============================================
    // Payments
    // ============================================

    /// Fetch full invoice details
    pub async fn fetch_invoice(&self, invoice_id: &str) -> Result<Invoice, ApiError> {
        let envelope: PaymentEnvelope = self
            .get(&format!("/payments/invoice/{}", invoice_id), Auth::Required)
            .await?;
        envelope
            .invoice
            .ok_or_else(|| ApiError::Rejected(rejection(envelope.msg, "Unable to fetch invoice details")))
    }

    /// Create the invoice for a finished appointment
    pub async fn generate_invoice(
        &self,
        appointment_id: &str,
        employee_id: &str,
    ) -> Result<Invoice, ApiError> {
        let path = format!(
            "/payments/generate-invoice/{}/employee/{}",
            appointment_id, employee_id
        );
        let (url, builder) = self.request(Method::POST, &path, Auth::Required)?;
        let response = Self::send(&url, builder).await?;
        let envelope: PaymentEnvelope = Self::decode(&url, response).await?;
        envelope
            .invoice
            .ok_or_else(|| ApiError::Rejected(rejection(envelope.msg, "Unable to create invoice")))
    }

    /// Create a checkout link for an unpaid invoice
    pub async fn create_payment_link(&self, invoice_id: &str) -> Result<PaymentLink, ApiError> {
        let path = format!("/payments/mobile/create-payment-link/{}", invoice_id);
        let (url, builder) = self.request(Method::POST, &path, Auth::Required)?;
        let response = Self::send(&url, builder).await?;
        let envelope: PaymentEnvelope = Self::decode(&url, response).await?;
        envelope
            .payment_link
            .ok_or_else(|| ApiError::Rejected(rejection(envelope.msg, "Unable to create payment link")))
    }

    // ============================================
    // Utility
    // ============================================

    /// Health check - attempts to fetch the vehicle types
    pub async fn health_check(&self) -> bool {
        match self.fetch_vehicle_types().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }
}

fn rejection(msg: Option<String>, fallback: &str) -> String {
    msg.filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(format!("{}/api/", server.uri()))
            .unwrap()
            .with_token("test-token")
    }

    #[tokio::test]
    async fn test_fetch_customer_profile_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/mobile/u1"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "customer": { "_id": "c1", "name": "An", "total_spending": 250000 },
                "vehicles": [ { "_id": "v1", "license_plate": "51A-12345" } ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let profile = client.fetch_customer_profile("u1").await.unwrap();

        assert_eq!(profile.customer.id, "c1");
        assert_eq!(profile.customer.total_spending, 250000.0);
        assert_eq!(profile.vehicles.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected_locally() {
        let server = MockServer::start().await;
        let client = ApiClient::new(server.uri()).unwrap();

        let err = client.fetch_services().await.unwrap_err();
        assert!(matches!(err, ApiError::MissingSession("token")));
    }

    #[tokio::test]
    async fn test_error_status_carries_backend_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/services"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "Token expired" })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch_services().await.unwrap_err();

        assert!(err.is_auth());
        match err {
            ApiError::Status { message, .. } => assert_eq!(message, "Token expired"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_status_with_plain_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vehicle-types"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch_vehicle_types().await.unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
        assert!(err.to_string().contains("upstream down"));
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_fetch_prices_by_vehicle_type() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/prices/filterprice/"))
            .and(query_param("vehicleTypeName", "Sedan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "priceline_id": "p1", "service": "Wash", "price": 50000, "time_required": 30 },
                { "priceline_id": "p2", "service": "Wax", "price": 120000, "time_required": 45 }
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let prices = client.fetch_prices("Sedan").await.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1].time_required, 45);
    }

    #[tokio::test]
    async fn test_book_appointment_posts_payload() {
        let server = MockServer::start().await;
        let start = Utc.with_ymd_and_hms(2024, 10, 10, 9, 0, 0).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/appointments/without-slot"))
            .and(body_json(json!({
                "vehicle_id": "v1",
                "service_ids": ["p1", "p2"],
                "appointment_datetime": "2024-10-10T09:00:00Z"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "a1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .book_appointment(&CreateAppointmentRequest {
                vehicle_id: "v1".to_string(),
                service_ids: vec!["p1".to_string(), "p2".to_string()],
                appointment_datetime: start,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_waiting_appointments() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/appointments/mobile/appointment/customer/watting/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "_id": "a1",
                "status": "waiting",
                "appointment_datetime": "2024-10-10T08:30:00Z",
                "slot_id": { "slot_datetime": "2024-10-10T09:00:00Z" },
                "services": [ { "name": "Wash", "time_required": 30, "is_done": false } ]
            }])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let appointments = client.fetch_waiting_appointments("c1").await.unwrap();

        assert_eq!(appointments.len(), 1);
        assert!(appointments[0].slot_id.is_some());
    }

    #[tokio::test]
    async fn test_generate_invoice_rejection_uses_msg() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/payments/generate-invoice/a1/employee/e1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "msg": "Appointment not finished" })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.generate_invoice("a1", "e1").await.unwrap_err();
        assert_eq!(err.to_string(), "Appointment not finished");
    }

    #[tokio::test]
    async fn test_create_payment_link() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/payments/mobile/create-payment-link/i1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paymentLink": { "checkoutUrl": "https://pay.example/checkout/i1" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let link = client.create_payment_link("i1").await.unwrap();
        assert_eq!(link.checkout_url, "https://pay.example/checkout/i1");
    }

    #[tokio::test]
    async fn test_register_needs_no_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "msg": "Email already used" })))
            .mount(&server)
            .await;

        let client = ApiClient::new(format!("{}/api", server.uri())).unwrap();
        let err = client
            .register(&RegisterRequest {
                username: "An".to_string(),
                password: "secret1".to_string(),
                email: "an@example.com".to_string(),
                name: "An".to_string(),
                address: "1 Le Loi".to_string(),
                phone_number: "0901234567".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
        assert!(err.to_string().ends_with("Email already used"));
    }
}
