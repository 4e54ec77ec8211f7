//! Background API worker and refresh pollers.
//!
//! The worker owns the [`ApiClient`] and runs in its own Tokio task. Callers
//! send [`ApiCommand`]s and receive [`ApiMessage`]s over bounded channels.
//! Pollers re-send a refresh command on a fixed interval.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::ApiClient;
use crate::models::{Appointment, CustomerProfile, Invoice, PaymentLink, Service, VehicleType};

/// Channel capacity for commands and messages
pub const CHANNEL_CAPACITY: usize = 32;

/// Messages sent from the API worker to the caller
#[derive(Debug, Clone)]
pub enum ApiMessage {
    /// Customer profile and vehicles have been loaded
    ProfileLoaded(CustomerProfile),
    /// Service catalogue has been loaded
    ServicesLoaded(Vec<Service>),
    /// Vehicle types have been loaded
    VehicleTypesLoaded(Vec<VehicleType>),
    /// Appointment history has been loaded
    AppointmentsLoaded(Vec<Appointment>),
    /// Appointments still in progress have been loaded
    WaitingAppointmentsLoaded(Vec<Appointment>),
    /// Invoice details have been loaded
    InvoiceLoaded(Invoice),
    /// A new invoice was generated for an appointment
    InvoiceGenerated(Invoice),
    /// A checkout link is ready
    PaymentLinkCreated(PaymentLink),
    /// API connection status changed
    ConnectionStatus(bool),
    /// An error occurred during API communication
    Error(String),
}

/// Commands sent to the API worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCommand {
    /// Refresh everything
    RefreshAll,
    /// Refresh profile, services and vehicle types
    RefreshHome,
    /// Refresh both appointment lists
    RefreshAppointments,
    /// Check API connection status
    CheckConnection,
    /// Load one invoice
    FetchInvoice(String),
    /// Generate the invoice for an appointment
    GenerateInvoice(String),
    /// Create a checkout link for an invoice
    CreatePaymentLink(String),
    /// Shutdown the API worker
    Shutdown,
}

/// State owned by the worker task
pub struct ApiWorker {
    client: ApiClient,
    user_id: Option<String>,
    employee_id: Option<String>,
    customer_id: Option<String>,
    tx: mpsc::Sender<ApiMessage>,
}

impl ApiWorker {
    pub fn new(client: ApiClient, tx: mpsc::Sender<ApiMessage>) -> Self {
        Self {
            client,
            user_id: None,
            employee_id: None,
            customer_id: None,
            tx,
        }
    }

    /// Account whose profile and appointments are refreshed
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    /// Process commands until `Shutdown`, or until either channel closes
    pub async fn run(mut self, mut rx: mpsc::Receiver<ApiCommand>) {
        while let Some(cmd) = rx.recv().await {
            tracing::debug!(?cmd, "api command");
            if cmd == ApiCommand::Shutdown {
                break;
            }
            if !self.handle(cmd).await {
                tracing::debug!("message receiver dropped, stopping api worker");
                break;
            }
        }
    }

    /// Returns false once nobody is listening
    async fn handle(&mut self, cmd: ApiCommand) -> bool {
        match cmd {
            ApiCommand::RefreshAll => {
                let connected = self.client.health_check().await;
                if !self.emit(ApiMessage::ConnectionStatus(connected)).await {
                    return false;
                }
                if !connected {
                    return self
                        .emit(ApiMessage::Error("Cannot connect to API".to_string()))
                        .await;
                }
                self.refresh_home().await && self.refresh_appointments().await
            }
            ApiCommand::RefreshHome => self.refresh_home().await,
            ApiCommand::RefreshAppointments => self.refresh_appointments().await,
            ApiCommand::CheckConnection => {
                let connected = self.client.health_check().await;
                self.emit(ApiMessage::ConnectionStatus(connected)).await
            }
            ApiCommand::FetchInvoice(id) => {
                let message = match self.client.fetch_invoice(&id).await {
                    Ok(invoice) => ApiMessage::InvoiceLoaded(invoice),
                    Err(e) => ApiMessage::Error(format!("Fetch invoice failed: {}", e)),
                };
                self.emit(message).await
            }
            ApiCommand::GenerateInvoice(appointment_id) => {
                let message = match self.employee_id.as_deref() {
                    None => ApiMessage::Error("Generate invoice failed: no employee configured".to_string()),
                    Some(employee_id) => {
                        match self.client.generate_invoice(&appointment_id, employee_id).await {
                            Ok(invoice) => ApiMessage::InvoiceGenerated(invoice),
                            Err(e) => ApiMessage::Error(format!("Generate invoice failed: {}", e)),
                        }
                    }
                };
                self.emit(message).await
            }
            ApiCommand::CreatePaymentLink(invoice_id) => {
                let message = match self.client.create_payment_link(&invoice_id).await {
                    Ok(link) => ApiMessage::PaymentLinkCreated(link),
                    Err(e) => ApiMessage::Error(format!("Create payment link failed: {}", e)),
                };
                self.emit(message).await
            }
            ApiCommand::Shutdown => false,
        }
    }

    async fn refresh_home(&mut self) -> bool {
        let Some(user_id) = self.user_id.clone() else {
            return self.emit(no_user("Load profile")).await;
        };
        let (profile, services, vehicle_types) = tokio::join!(
            self.client.fetch_customer_profile(&user_id),
            self.client.fetch_services(),
            self.client.fetch_vehicle_types()
        );

        let profile = match profile {
            Ok(profile) => {
                self.customer_id = Some(profile.customer.id.clone());
                ApiMessage::ProfileLoaded(profile)
            }
            Err(e) => ApiMessage::Error(format!("Load profile failed: {}", e)),
        };
        let services = match services {
            Ok(data) => ApiMessage::ServicesLoaded(data),
            Err(e) => ApiMessage::Error(format!("Load services failed: {}", e)),
        };
        let vehicle_types = match vehicle_types {
            Ok(data) => ApiMessage::VehicleTypesLoaded(data),
            Err(e) => ApiMessage::Error(format!("Load vehicle types failed: {}", e)),
        };

        self.emit(profile).await && self.emit(services).await && self.emit(vehicle_types).await
    }

    async fn refresh_appointments(&mut self) -> bool {
        let customer_id = match self.customer_id.clone() {
            Some(id) => id,
            None => {
                let Some(user_id) = self.user_id.clone() else {
                    return self.emit(no_user("Load appointments")).await;
                };
                match self.client.fetch_customer_profile(&user_id).await {
                    Ok(profile) => {
                        let id = profile.customer.id.clone();
                        self.customer_id = Some(id.clone());
                        if !self.emit(ApiMessage::ProfileLoaded(profile)).await {
                            return false;
                        }
                        id
                    }
                    Err(e) => {
                        return self
                            .emit(ApiMessage::Error(format!("Load profile failed: {}", e)))
                            .await;
                    }
                }
            }
        };

        let (all, waiting) = tokio::join!(
            self.client.fetch_appointments(&customer_id),
            self.client.fetch_waiting_appointments(&customer_id)
        );

        let all = match all {
            Ok(data) => ApiMessage::AppointmentsLoaded(data),
            Err(e) => ApiMessage::Error(format!("Load appointments failed: {}", e)),
        };
        let waiting = match waiting {
            Ok(data) => ApiMessage::WaitingAppointmentsLoaded(data),
            Err(e) => ApiMessage::Error(format!("Load waiting appointments failed: {}", e)),
        };

        self.emit(all).await && self.emit(waiting).await
    }

    async fn emit(&self, message: ApiMessage) -> bool {
        self.tx.send(message).await.is_ok()
    }
}

fn no_user(action: &str) -> ApiMessage {
    ApiMessage::Error(format!("{} failed: no user configured", action))
}

/// Spawn the worker on the current runtime
pub fn spawn_worker(worker: ApiWorker, rx: mpsc::Receiver<ApiCommand>) -> JoinHandle<()> {
    tokio::spawn(worker.run(rx))
}

/// Send `command` every `every`, starting one period from now. A tick is
/// skipped while the worker's queue is full. Stops when the worker's command
/// channel closes.
pub fn spawn_poller(
    tx: mpsc::Sender<ApiCommand>,
    every: Duration,
    command: ApiCommand,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match tx.try_send(command.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(?command, "api worker busy, skipping refresh");
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }
    })
}
