//! Booking draft: the vehicle, services and start time a customer picks before
//! confirming an appointment.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

use crate::models::{CreateAppointmentRequest, PriceLine, Vehicle};

/// Booking in progress
#[derive(Debug, Clone, Default)]
pub struct BookingDraft {
    vehicle: Option<Vehicle>,
    services: Vec<PriceLine>,
    start: Option<DateTime<Utc>>,
}

impl BookingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.vehicle.as_ref()
    }

    pub fn services(&self) -> &[PriceLine] {
        &self.services
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Pick the vehicle. Prices depend on the vehicle type, so previously
    /// selected services are dropped.
    pub fn select_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicle = Some(vehicle);
        self.services.clear();
    }

    /// Vehicle type used to look up prices
    pub fn vehicle_type_name(&self) -> Result<&str, &'static str> {
        let vehicle = self
            .vehicle
            .as_ref()
            .ok_or("Choose the vehicle to be serviced")?;
        vehicle
            .type_name()
            .ok_or("Selected vehicle has no vehicle type")
    }

    /// Add the price line, or remove it if it is already selected.
    /// Returns whether it is selected afterwards.
    pub fn toggle_service(&mut self, line: PriceLine) -> bool {
        if let Some(pos) = self
            .services
            .iter()
            .position(|s| s.priceline_id == line.priceline_id)
        {
            self.services.remove(pos);
            false
        } else {
            self.services.push(line);
            true
        }
    }

    pub fn is_selected(&self, priceline_id: &str) -> bool {
        self.services.iter().any(|s| s.priceline_id == priceline_id)
    }

    /// Set the start time. Services must be chosen first so the completion
    /// estimate is meaningful.
    pub fn set_start(&mut self, start: DateTime<Utc>) -> Result<(), &'static str> {
        if self.services.is_empty() {
            return Err("Choose services before picking a date and time");
        }
        self.start = Some(start);
        Ok(())
    }

    /// Sum of estimated minutes of the selected services
    pub fn total_minutes(&self) -> i64 {
        self.services.iter().map(|s| s.time_required.max(0)).sum()
    }

    pub fn total_price(&self) -> f64 {
        self.services.iter().map(|s| s.price).sum()
    }

    pub fn estimated_completion(&self) -> Option<DateTime<Utc>> {
        let start = self.start?;
        Duration::try_minutes(self.total_minutes()).and_then(|d| start.checked_add_signed(d))
    }

    pub fn is_complete(&self) -> bool {
        self.vehicle.is_some() && !self.services.is_empty() && self.start.is_some()
    }

    /// Build the request sent to the backend
    pub fn to_request(&self) -> Result<CreateAppointmentRequest, &'static str> {
        match (&self.vehicle, self.start) {
            (Some(vehicle), Some(start)) if !self.services.is_empty() => {
                Ok(CreateAppointmentRequest {
                    vehicle_id: vehicle.id.clone(),
                    service_ids: self.services.iter().map(|s| s.priceline_id.clone()).collect(),
                    appointment_datetime: start,
                })
            }
            _ => Err("Complete all booking steps before confirming"),
        }
    }

    /// Start over after a booking is sent
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// `HH:MM dd/mm/yyyy` in the given time zone
pub fn format_date_time<Tz>(time: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.with_timezone(tz).format("%H:%M %d/%m/%Y").to_string()
}

/// Parse a start time given as RFC 3339, or as `YYYY-MM-DD HH:MM` in `tz`
pub fn parse_start<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>, &'static str> {
    let input = input.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(time.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
        .map_err(|_| "Expected a time like 2024-10-10 09:00")?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|time| time.with_timezone(&Utc))
        .ok_or("That time does not exist in the local time zone")
}
