//! Application state.
//!
//! A single [`App`] holds the latest snapshot of everything fetched from the
//! backend. Worker messages are folded into it with [`App::handle_api_message`],
//! which may ask for a follow-up command (e.g. refresh after an invoice is
//! generated). Every view reads from here instead of fetching on its own.

use std::time::Instant;

use crate::models::{Appointment, CustomerProfile, Invoice, PaymentLink, Service, VehicleType};
use crate::worker::{ApiCommand, ApiMessage};

/// Which appointment list is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Full appointment history (default)
    #[default]
    All,
    /// Appointments still being processed, with timelines
    Waiting,
}

impl ViewMode {
    pub fn next(&self) -> Self {
        match self {
            ViewMode::All => ViewMode::Waiting,
            ViewMode::Waiting => ViewMode::All,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewMode::All => "History",
            ViewMode::Waiting => "In progress",
        }
    }
}

/// Snapshot store
#[derive(Debug, Default)]
pub struct App {
    /// Signed-in customer and their vehicles
    pub profile: Option<CustomerProfile>,

    /// Service catalogue
    pub services: Vec<Service>,

    /// Vehicle types
    pub vehicle_types: Vec<VehicleType>,

    /// Appointment history
    pub appointments: Vec<Appointment>,

    /// Appointments still in progress
    pub waiting_appointments: Vec<Appointment>,

    /// Current appointment list
    pub view_mode: ViewMode,

    /// Invoice currently opened
    pub invoice: Option<Invoice>,

    /// Most recent checkout link
    pub payment_link: Option<PaymentLink>,

    /// API connection status
    pub api_connected: bool,

    /// Last error reported by the worker
    pub last_error: Option<String>,

    /// Last appointment refresh
    pub last_refresh: Option<Instant>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view_mode(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    /// Appointments for the current view mode
    pub fn visible_appointments(&self) -> &[Appointment] {
        match self.view_mode {
            ViewMode::All => &self.appointments,
            ViewMode::Waiting => &self.waiting_appointments,
        }
    }

    pub fn find_appointment(&self, id: &str) -> Option<&Appointment> {
        self.appointments
            .iter()
            .chain(self.waiting_appointments.iter())
            .find(|a| a.id == id)
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.customer.id.as_str())
    }

    /// Fold a worker message into the snapshot. Returns a command to send
    /// back to the worker when the change invalidates other data.
    pub fn handle_api_message(&mut self, message: ApiMessage) -> Option<ApiCommand> {
        match message {
            ApiMessage::ProfileLoaded(profile) => {
                tracing::debug!(vehicles = profile.vehicles.len(), "profile loaded");
                self.profile = Some(profile);
                None
            }
            ApiMessage::ServicesLoaded(services) => {
                tracing::debug!(count = services.len(), "services loaded");
                self.services = services;
                None
            }
            ApiMessage::VehicleTypesLoaded(types) => {
                tracing::debug!(count = types.len(), "vehicle types loaded");
                self.vehicle_types = types;
                None
            }
            ApiMessage::AppointmentsLoaded(appointments) => {
                tracing::debug!(count = appointments.len(), "appointments loaded");
                self.appointments = appointments;
                self.last_refresh = Some(Instant::now());
                self.last_error = None;
                None
            }
            ApiMessage::WaitingAppointmentsLoaded(appointments) => {
                tracing::debug!(count = appointments.len(), "waiting appointments loaded");
                self.waiting_appointments = appointments;
                self.last_refresh = Some(Instant::now());
                None
            }
            ApiMessage::InvoiceLoaded(invoice) => {
                self.invoice = Some(invoice);
                None
            }
            ApiMessage::InvoiceGenerated(invoice) => {
                tracing::info!(invoice = %invoice.id, "invoice generated");
                self.invoice = Some(invoice);
                Some(ApiCommand::RefreshAppointments)
            }
            ApiMessage::PaymentLinkCreated(link) => {
                self.payment_link = Some(link);
                None
            }
            ApiMessage::ConnectionStatus(connected) => {
                let was_connected = self.api_connected;
                self.api_connected = connected;
                if connected && !was_connected {
                    tracing::info!("connected to API");
                } else if !connected && was_connected {
                    tracing::warn!("disconnected from API");
                }
                None
            }
            ApiMessage::Error(error) => {
                tracing::error!(%error, "api error");
                self.last_error = Some(error);
                None
            }
        }
    }
}
