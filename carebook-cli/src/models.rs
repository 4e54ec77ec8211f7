//! Domain models for the CareBook API.
//!
//! These structs match the JSON the booking backend returns. Field names are the
//! backend's snake_case keys, record ids are the `_id` strings, and timestamps are
//! RFC 3339 strings mapped to `DateTime<Utc>`.
//! Includes both read models and the write payloads sent by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================
// Customer
// ============================================

/// Customer loyalty rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CustomerRank {
    #[serde(default)]
    pub rank_name: String,
    /// Discount in percent
    #[serde(default)]
    pub discount_rate: f64,
}

/// Customer record (read)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_rank_id: Option<CustomerRank>,
    #[serde(default)]
    pub total_spending: f64,
}

impl Customer {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed Customer")
    }
}

/// Customer together with the vehicles they own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer: Customer,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl CustomerProfile {
    pub fn find_vehicle(&self, id_or_plate: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| {
            v.id == id_or_plate || v.license_plate.eq_ignore_ascii_case(id_or_plate)
        })
    }
}

/// Update customer payload (write)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCustomerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl UpdateCustomerRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone_number.is_none() && self.address.is_none()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.is_empty() {
            return Err("Nothing to update");
        }
        if self.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err("Name cannot be empty");
        }
        if self.phone_number.as_ref().is_some_and(|p| p.trim().len() < 10) {
            return Err("Phone number is invalid");
        }
        Ok(())
    }
}

// ============================================
// Registration
// ============================================

/// Account registration payload (write)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: String,
    pub address: String,
    pub phone_number: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("Name is required");
        }
        if self.password.is_empty() {
            return Err("Password is required");
        }
        if self.password.len() < 6 {
            return Err("Password must be at least 6 characters");
        }
        if self.email.trim().is_empty() {
            return Err("Email is required");
        }
        if !is_plausible_email(&self.email) {
            return Err("Email is invalid");
        }
        if self.address.trim().is_empty() {
            return Err("Address is required");
        }
        if self.phone_number.trim().is_empty() {
            return Err("Phone number is required");
        }
        if self.phone_number.trim().len() < 10 {
            return Err("Phone number is invalid");
        }
        Ok(())
    }
}

/// Account activation with the one-time code mailed after registration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivateRequest {
    pub email: String,
    pub otp: String,
}

impl ActivateRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.email.trim().is_empty() {
            return Err("Email is required");
        }
        if self.otp.trim().is_empty() {
            return Err("Verification code is required");
        }
        Ok(())
    }
}

/// `local@domain.tld`, no whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

// ============================================
// Vehicles
// ============================================

/// Vehicle category (car, motorbike, ...), which determines pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleType {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub vehicle_type_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Vehicle record (read)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "_id")]
    pub id: String,
    pub license_plate: String,
    #[serde(default)]
    pub vehicle_type_id: Option<VehicleType>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Vehicle {
    pub fn type_name(&self) -> Option<&str> {
        self.vehicle_type_id
            .as_ref()
            .map(|t| t.vehicle_type_name.as_str())
    }

    /// "Toyota Vios (51A-12345)"
    pub fn summary(&self) -> String {
        let make = [self.manufacturer.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if make.is_empty() {
            self.license_plate.clone()
        } else {
            format!("{} ({})", make, self.license_plate)
        }
    }
}

/// The backend stores `year` as whatever the form sent, number or string.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Create vehicle payload (write)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateVehicleRequest {
    pub license_plate: String,
    pub vehicle_type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub customer_id: String,
}

impl CreateVehicleRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.license_plate.trim().is_empty() {
            return Err("License plate is required");
        }
        if self.vehicle_type_name.trim().is_empty() {
            return Err("Vehicle type is required");
        }
        if self.customer_id.is_empty() {
            return Err("Customer is required");
        }
        Ok(())
    }
}

// ============================================
// Catalogue
// ============================================

/// Service offered by the shop (catalogue entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Minutes
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_required: i64,
}

/// Price of one service for one vehicle type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLine {
    pub priceline_id: String,
    /// Service name
    pub service: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    /// Minutes
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_required: i64,
}

// ============================================
// Appointments
// ============================================

/// Appointment lifecycle status as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    #[default]
    Waiting,
    Completed,
    Cancelled,
    Other(String),
}

impl From<String> for AppointmentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "waiting" => AppointmentStatus::Waiting,
            "completed" => AppointmentStatus::Completed,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Other(value),
        }
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Waiting => "waiting".to_string(),
            AppointmentStatus::Completed => "completed".to_string(),
            AppointmentStatus::Cancelled => "cancelled".to_string(),
            AppointmentStatus::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppointmentStatus::Waiting => write!(f, "Processing"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Bay slot an appointment has been assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub slot_datetime: DateTime<Utc>,
}

impl AppointmentSlot {
    pub fn starting_at(slot_datetime: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            slot_datetime,
        }
    }
}

/// One stage of work inside an appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLineItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Estimated minutes
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_required: i64,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub time_completed: Option<DateTime<Utc>>,
}

impl ServiceLineItem {
    pub fn pending(name: impl Into<String>, time_required: i64) -> Self {
        Self {
            name: name.into(),
            time_required,
            is_done: false,
            time_completed: None,
        }
    }

    pub fn done_at(name: impl Into<String>, time_required: i64, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            time_required,
            is_done: true,
            time_completed: Some(at),
        }
    }
}

/// Invoice reference embedded in an appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub status: String,
}

impl InvoiceRef {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }
}

/// Appointment record (read)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub vehicle_id: Option<Vehicle>,
    pub appointment_datetime: DateTime<Utc>,
    #[serde(default)]
    pub slot_id: Option<AppointmentSlot>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub services: Vec<ServiceLineItem>,
    #[serde(default)]
    pub invoice: Option<InvoiceRef>,
}

impl Appointment {
    /// Waiting for the vehicle to arrive (no bay slot assigned yet)
    pub fn is_awaiting_vehicle(&self) -> bool {
        self.slot_id.is_none() && self.status == AppointmentStatus::Waiting
    }

    pub fn is_paid(&self) -> bool {
        self.invoice.as_ref().is_some_and(InvoiceRef::is_paid)
    }

    /// Sum of estimated minutes across all stages
    pub fn total_minutes(&self) -> i64 {
        self.services.iter().map(|s| s.time_required.max(0)).sum()
    }
}

/// `null` decodes like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Book appointment payload (write). The backend assigns the slot later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub vehicle_id: String,
    pub service_ids: Vec<String>,
    pub appointment_datetime: DateTime<Utc>,
}

// ============================================
// Invoices and payments
// ============================================

/// How a promotion discount is expressed (2 = fixed amount, anything else = percent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "i32", into = "i32")]
pub enum DiscountKind {
    #[default]
    Percentage = 1,
    FixedAmount = 2,
}

impl From<i32> for DiscountKind {
    fn from(value: i32) -> Self {
        match value {
            2 => DiscountKind::FixedAmount,
            _ => DiscountKind::Percentage,
        }
    }
}

impl From<DiscountKind> for i32 {
    fn from(kind: DiscountKind) -> Self {
        kind as i32
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountKind::Percentage => write!(f, "Percentage"),
            DiscountKind::FixedAmount => write!(f, "Direct"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionDetail {
    #[serde(default)]
    pub discount_value: f64,
}

/// Promotion applied to an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_type: DiscountKind,
    #[serde(default)]
    pub details: Vec<PromotionDetail>,
}

impl Promotion {
    /// The backend only ever reads the first detail line
    pub fn discount_value(&self) -> Option<f64> {
        self.details.first().map(|d| d.discount_value)
    }
}

/// Person reference embedded in an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PartyRef {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub service_id: ServiceRef,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

impl InvoiceLine {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Full invoice (read)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub customer_id: PartyRef,
    #[serde(default)]
    pub employee_id: PartyRef,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: Vec<InvoiceLine>,
    #[serde(default)]
    pub promotion_header_ids: Vec<Promotion>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub final_amount: f64,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }

    /// Sum of line subtotals, before promotions
    pub fn lines_total(&self) -> f64 {
        self.details.iter().map(InvoiceLine::subtotal).sum()
    }
}

/// Checkout link returned by the payment gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub checkout_url: String,
}

/// Envelope used by the payment endpoints: `{ invoice }`, `{ paymentLink }` or `{ msg }`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEnvelope {
    #[serde(default)]
    pub invoice: Option<Invoice>,
    #[serde(default)]
    pub payment_link: Option<PaymentLink>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Error body the backend sends with non-success statuses
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.msg.as_deref().or(self.message.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_appointment_status_serialization() {
        assert_eq!(AppointmentStatus::from("waiting".to_string()), AppointmentStatus::Waiting);
        assert_eq!(AppointmentStatus::from("canceled".to_string()), AppointmentStatus::Cancelled);
        assert_eq!(
            AppointmentStatus::from("returned".to_string()),
            AppointmentStatus::Other("returned".to_string())
        );
        assert_eq!(String::from(AppointmentStatus::Completed), "completed");
    }

    #[test]
    fn test_discount_kind() {
        assert_eq!(DiscountKind::from(2), DiscountKind::FixedAmount);
        assert_eq!(DiscountKind::from(1), DiscountKind::Percentage);
        assert_eq!(DiscountKind::from(0), DiscountKind::Percentage);
        assert_eq!(i32::from(DiscountKind::FixedAmount), 2);
    }

    #[test]
    fn test_appointment_from_backend_json() {
        let json = r#"{
            "_id": "a1",
            "status": "waiting",
            "vehicle_id": {
                "_id": "v1",
                "license_plate": "51A-12345",
                "manufacturer": "Toyota",
                "model": "Vios",
                "year": "2019"
            },
            "appointment_datetime": "2024-10-10T08:30:00.000Z",
            "slot_id": { "_id": "s1", "slot_datetime": "2024-10-10T09:00:00.000Z" },
            "services": [
                { "name": "Wash", "time_required": 30, "is_done": true,
                  "time_completed": "2024-10-10T09:25:00.000Z" },
                { "name": "Wax" }
            ],
            "invoice": null
        }"#;

        let appointment: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Waiting);
        assert_eq!(
            appointment.slot_id.as_ref().unwrap().slot_datetime,
            Utc.with_ymd_and_hms(2024, 10, 10, 9, 0, 0).unwrap()
        );
        assert_eq!(appointment.services.len(), 2);
        assert!(appointment.services[0].is_done);
        assert_eq!(appointment.services[1].time_required, 0);
        assert!(!appointment.services[1].is_done);
        assert_eq!(appointment.vehicle_id.as_ref().unwrap().year, Some(2019));
        assert_eq!(appointment.vehicle_id.as_ref().unwrap().summary(), "Toyota Vios (51A-12345)");
        assert!(!appointment.is_awaiting_vehicle());
        assert!(!appointment.is_paid());
        assert_eq!(appointment.total_minutes(), 30);
    }

    #[test]
    fn test_null_durations_decode_as_zero() {
        let json = r#"[
            { "_id": "a1", "status": "waiting",
              "appointment_datetime": "2024-10-10T08:30:00.000Z",
              "slot_id": { "_id": "s1", "slot_datetime": "2024-10-10T09:00:00.000Z" },
              "services": [ { "name": "Wash", "time_required": null },
                            { "name": null, "time_required": 20 } ] },
            { "_id": "a2", "status": "completed",
              "appointment_datetime": "2024-10-11T08:30:00.000Z",
              "services": [ { "name": "Wax", "time_required": 45 } ] }
        ]"#;

        let appointments: Vec<Appointment> = serde_json::from_str(json).unwrap();
        assert_eq!(appointments.len(), 2);
        assert_eq!(appointments[0].services[0].time_required, 0);
        assert_eq!(appointments[0].services[1].name, "");
        assert_eq!(appointments[0].total_minutes(), 20);
        assert_eq!(appointments[1].total_minutes(), 45);

        let line: PriceLine = serde_json::from_str(
            r#"{ "priceline_id": "p1", "service": "Wash", "price": null, "time_required": null }"#,
        )
        .unwrap();
        assert_eq!(line.price, 0.0);
        assert_eq!(line.time_required, 0);

        let service: Service =
            serde_json::from_str(r#"{ "_id": "s1", "name": "Wash", "time_required": null }"#).unwrap();
        assert_eq!(service.time_required, 0);
    }

    #[test]
    fn test_appointment_null_services_and_no_slot() {
        let json = r#"{
            "_id": "a2",
            "status": "waiting",
            "appointment_datetime": "2024-10-10T08:30:00Z",
            "slot_id": null,
            "services": null,
            "invoice": { "_id": "i1", "status": "paid" }
        }"#;

        let appointment: Appointment = serde_json::from_str(json).unwrap();
        assert!(appointment.services.is_empty());
        assert!(appointment.is_awaiting_vehicle());
        assert!(appointment.is_paid());
    }

    #[test]
    fn test_invoice_from_backend_json() {
        let json = r#"{
            "invoice": {
                "_id": "i1",
                "status": "unpaid",
                "customer_id": { "name": "An", "email": "an@example.com" },
                "employee_id": { "name": "Binh" },
                "created_at": "2024-10-10T10:00:00Z",
                "details": [
                    { "_id": "d1", "service_id": { "name": "Wash" }, "price": 50000, "quantity": 2 }
                ],
                "promotion_header_ids": [
                    { "_id": "p1", "description": "Opening week", "discount_type": 2,
                      "details": [ { "discount_value": 10000 } ] }
                ],
                "total_amount": 100000,
                "discount_amount": 10000,
                "final_amount": 90000
            }
        }"#;

        let envelope: PaymentEnvelope = serde_json::from_str(json).unwrap();
        let invoice = envelope.invoice.unwrap();
        assert!(!invoice.is_paid());
        assert_eq!(invoice.lines_total(), 100000.0);
        assert_eq!(invoice.promotion_header_ids[0].discount_type, DiscountKind::FixedAmount);
        assert_eq!(invoice.promotion_header_ids[0].discount_value(), Some(10000.0));
        assert_eq!(invoice.employee_id.name.as_deref(), Some("Binh"));
    }

    #[test]
    fn test_payment_link_envelope() {
        let envelope: PaymentEnvelope =
            serde_json::from_str(r#"{ "paymentLink": { "checkoutUrl": "https://pay/x" } }"#).unwrap();
        assert_eq!(envelope.payment_link.unwrap().checkout_url, "https://pay/x");
    }

    #[test]
    fn test_register_validation() {
        let mut dto = RegisterRequest::default();
        assert_eq!(dto.validate(), Err("Name is required"));

        dto.name = "Nguyen Van An".to_string();
        dto.password = "12345".to_string();
        assert_eq!(dto.validate(), Err("Password must be at least 6 characters"));

        dto.password = "123456".to_string();
        dto.email = "not-an-email".to_string();
        assert_eq!(dto.validate(), Err("Email is invalid"));

        dto.email = "an@example.com".to_string();
        dto.address = "1 Le Loi".to_string();
        dto.phone_number = "090".to_string();
        assert_eq!(dto.validate(), Err("Phone number is invalid"));

        dto.phone_number = "0901234567".to_string();
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_email_check() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("a b@c.d"));
        assert!(!is_plausible_email("@c.d"));
        assert!(!is_plausible_email("a@@c.d"));
    }

    #[test]
    fn test_update_customer_validation() {
        let mut dto = UpdateCustomerRequest::default();
        assert_eq!(dto.validate(), Err("Nothing to update"));

        dto.address = Some("2 Hai Ba Trung".to_string());
        assert!(dto.validate().is_ok());

        dto.name = Some("  ".to_string());
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_find_vehicle_by_plate() {
        let profile: CustomerProfile = serde_json::from_str(
            r#"{
                "customer": { "_id": "c1", "name": "An" },
                "vehicles": [ { "_id": "v1", "license_plate": "51A-12345", "year": 2020 } ]
            }"#,
        )
        .unwrap();

        assert_eq!(profile.find_vehicle("51a-12345").map(|v| v.id.as_str()), Some("v1"));
        assert_eq!(profile.find_vehicle("v1").map(|v| v.year), Some(Some(2020)));
        assert!(profile.find_vehicle("v2").is_none());
    }
}
