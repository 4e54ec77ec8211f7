//! CareBook - command line client for the vehicle-care booking service
//!
//! Browse the catalogue, book appointments, follow service progress and pay
//! invoices from a terminal.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use carebook::api::ApiClient;
use carebook::app::{App, ViewMode};
use carebook::booking::{parse_start, BookingDraft};
use carebook::config::Config;
use carebook::models::{
    ActivateRequest, CreateVehicleRequest, CustomerProfile, PriceLine, RegisterRequest,
    UpdateCustomerRequest,
};
use carebook::render;
use carebook::worker::{spawn_poller, spawn_worker, ApiCommand, ApiMessage, CHANNEL_CAPACITY};

#[derive(Parser)]
#[command(name = "carebook", about = "Vehicle care booking client", version)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API is reachable with the configured session
    Status,

    /// Show the signed-in customer and their vehicles
    Profile,

    /// List the services the shop offers
    Services,

    /// List vehicle types
    VehicleTypes,

    /// Show service prices for one of your vehicles
    Prices {
        /// Vehicle id or license plate
        vehicle: String,
    },

    /// Register a vehicle
    AddVehicle {
        /// License plate
        plate: String,

        /// Vehicle type name (see `vehicle-types`)
        #[arg(long = "type")]
        vehicle_type: String,

        #[arg(long)]
        manufacturer: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        color: Option<String>,
    },

    /// Remove a vehicle
    RemoveVehicle {
        /// Vehicle id or license plate
        vehicle: String,
    },

    /// Update contact details
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },

    /// Book an appointment
    Book {
        /// Vehicle id or license plate
        vehicle: String,

        /// Service to include, by price line id or service name (repeatable)
        #[arg(long = "service", required = true)]
        services: Vec<String>,

        /// Start time, `YYYY-MM-DD HH:MM` local time or RFC 3339
        #[arg(long)]
        at: String,

        /// Show the summary without booking
        #[arg(long)]
        dry_run: bool,
    },

    /// List appointments
    Appointments {
        /// Only appointments still in progress, with their timelines
        #[arg(long)]
        waiting: bool,

        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Show an invoice
    Invoice {
        invoice_id: String,
    },

    /// Generate the invoice for a finished appointment
    GenerateInvoice {
        appointment_id: String,
    },

    /// Create a checkout link for an invoice
    Pay {
        invoice_id: String,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long, env = "CAREBOOK_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long)]
        phone: String,
    },

    /// Activate an account with the code sent by email
    Activate {
        #[arg(long)]
        email: String,

        #[arg(long)]
        otp: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().ok();

    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Appointments { watch: true, .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config;
    let client = config.client().context("Failed to create API client")?;

    match cli.command {
        Commands::Status => {
            let app = run_command(&config, ApiCommand::CheckConnection).await?;
            if !app.api_connected {
                bail!("Cannot reach the API at {}", config.api_url);
            }
            println!("Connected to {}", config.api_url);
        }
        Commands::Profile => {
            let profile = client
                .fetch_profile(config.user_id()?)
                .await
                .context("Failed to load profile")?;
            print!("{}", render::render_profile(&profile));
        }
        Commands::Services => {
            let services = client.fetch_services().await.context("Failed to load services")?;
            print!("{}", render::render_services(&services));
        }
        Commands::VehicleTypes => {
            let types = client
                .fetch_vehicle_types()
                .await
                .context("Failed to load vehicle types")?;
            print!("{}", render::render_vehicle_types(&types));
        }
        Commands::Prices { vehicle } => {
            let profile = load_profile(&client, &config).await?;
            let mut draft = BookingDraft::new();
            draft.select_vehicle(find_vehicle(&profile, &vehicle)?);
            let type_name = draft.vehicle_type_name().map_err(|e| anyhow!(e))?;
            let prices = client
                .fetch_prices(type_name)
                .await
                .context("Failed to load prices")?;
            print!("{}", render::render_prices(&prices, &draft));
        }
        Commands::AddVehicle {
            plate,
            vehicle_type,
            manufacturer,
            model,
            year,
            color,
        } => {
            let profile = load_profile(&client, &config).await?;
            let request = CreateVehicleRequest {
                license_plate: plate,
                vehicle_type_name: vehicle_type,
                manufacturer,
                model,
                year,
                color,
                customer_id: profile.customer.id,
            };
            request.validate().map_err(|e| anyhow!(e))?;
            client
                .add_vehicle(&request)
                .await
                .context("Failed to add vehicle")?;
            println!("Vehicle {} added", request.license_plate);
        }
        Commands::RemoveVehicle { vehicle } => {
            let profile = load_profile(&client, &config).await?;
            let vehicle = find_vehicle(&profile, &vehicle)?;
            client
                .delete_vehicle(&vehicle.id)
                .await
                .context("Failed to remove vehicle")?;
            println!("Vehicle {} removed", vehicle.license_plate);
        }
        Commands::UpdateProfile {
            name,
            phone,
            address,
        } => {
            let request = UpdateCustomerRequest {
                name,
                phone_number: phone,
                address,
            };
            request.validate().map_err(|e| anyhow!(e))?;
            let profile = load_profile(&client, &config).await?;
            client
                .update_customer(&profile.customer.id, &request)
                .await
                .context("Failed to update profile")?;
            println!("Profile updated");
        }
        Commands::Book {
            vehicle,
            services,
            at,
            dry_run,
        } => book(&client, &config, &vehicle, &services, &at, dry_run).await?,
        Commands::Appointments { waiting, watch } => {
            let mode = if waiting { ViewMode::Waiting } else { ViewMode::All };
            if watch {
                watch_appointments(&config, mode).await?;
            } else {
                let profile = load_profile(&client, &config).await?;
                let customer_id = &profile.customer.id;
                let appointments = match mode {
                    ViewMode::All => client.fetch_appointments(customer_id).await,
                    ViewMode::Waiting => client.fetch_waiting_appointments(customer_id).await,
                }
                .context("Failed to load appointments")?;
                print!(
                    "{}",
                    render::render_appointments(&appointments, mode, Utc::now(), &Local)
                );
            }
        }
        Commands::Invoice { invoice_id } => {
            let mut app = run_command(&config, ApiCommand::FetchInvoice(invoice_id)).await?;
            let invoice = worker_result(app.invoice.take(), &app)?;
            print!("{}", render::render_invoice(&invoice, &Local));
        }
        Commands::GenerateInvoice { appointment_id } => {
            config.employee_id()?;
            let mut app =
                run_command(&config, ApiCommand::GenerateInvoice(appointment_id.clone())).await?;
            let invoice = worker_result(app.invoice.take(), &app)?;
            print!("{}", render::render_invoice(&invoice, &Local));
            if let Some(appointment) = app.find_appointment(&appointment_id) {
                println!(
                    "Appointment {}: {}, {}",
                    appointment.id,
                    appointment.status,
                    render::invoice_status(appointment)
                );
            }
        }
        Commands::Pay { invoice_id } => {
            let mut app = run_command(&config, ApiCommand::CreatePaymentLink(invoice_id)).await?;
            let link = worker_result(app.payment_link.take(), &app)?;
            println!("Open this link to pay:");
            println!("{}", link.checkout_url);
        }
        Commands::Register {
            username,
            password,
            email,
            name,
            address,
            phone,
        } => {
            let request = RegisterRequest {
                username,
                password,
                email,
                name,
                address,
                phone_number: phone,
            };
            request.validate().map_err(|e| anyhow!(e))?;
            client.register(&request).await.context("Registration failed")?;
            println!("Account created. Check {} for the activation code.", request.email);
        }
        Commands::Activate { email, otp } => {
            let request = ActivateRequest { email, otp };
            request.validate().map_err(|e| anyhow!(e))?;
            client.activate(&request).await.context("Activation failed")?;
            println!("Account activated");
        }
    }

    Ok(())
}

async fn load_profile(client: &ApiClient, config: &Config) -> Result<CustomerProfile> {
    client
        .fetch_customer_profile(config.user_id()?)
        .await
        .context("Failed to load customer profile")
}

fn find_vehicle(profile: &CustomerProfile, id_or_plate: &str) -> Result<carebook::models::Vehicle> {
    profile
        .find_vehicle(id_or_plate)
        .cloned()
        .with_context(|| format!("No vehicle matching '{}'", id_or_plate))
}

/// Run one command on a fresh worker and fold its messages into a store. A
/// follow-up the store asks for runs before the worker shuts down.
async fn run_command(config: &Config, command: ApiCommand) -> Result<App> {
    let (api_tx, mut api_rx) = mpsc::channel::<ApiMessage>(CHANNEL_CAPACITY);
    let (cmd_tx, cmd_rx) = mpsc::channel::<ApiCommand>(CHANNEL_CAPACITY);
    let worker_task = spawn_worker(config.worker(api_tx)?, cmd_rx);

    let mut app = App::new();
    cmd_tx.send(command).await.context("API worker stopped")?;
    if let Some(msg) = api_rx.recv().await {
        if let Some(follow_up) = app.handle_api_message(msg) {
            if config.user_id.is_some() {
                cmd_tx.send(follow_up).await.ok();
            }
        }
    }
    cmd_tx.send(ApiCommand::Shutdown).await.ok();
    while let Some(msg) = api_rx.recv().await {
        app.handle_api_message(msg);
    }
    worker_task.await.ok();
    Ok(app)
}

/// The value a worker command produced, or the error it reported
fn worker_result<T>(value: Option<T>, app: &App) -> Result<T> {
    value.ok_or_else(|| {
        anyhow!(app
            .last_error
            .clone()
            .unwrap_or_else(|| "No response from the API".to_string()))
    })
}

/// Match a `--service` argument against the price list
fn find_price_line<'a>(prices: &'a [PriceLine], wanted: &str) -> Option<&'a PriceLine> {
    prices
        .iter()
        .find(|p| p.priceline_id == wanted)
        .or_else(|| prices.iter().find(|p| p.service.eq_ignore_ascii_case(wanted)))
}

async fn book(
    client: &ApiClient,
    config: &Config,
    vehicle: &str,
    services: &[String],
    at: &str,
    dry_run: bool,
) -> Result<()> {
    let profile = load_profile(client, config).await?;
    let mut draft = BookingDraft::new();
    draft.select_vehicle(find_vehicle(&profile, vehicle)?);

    let type_name = draft.vehicle_type_name().map_err(|e| anyhow!(e))?;
    let prices = client
        .fetch_prices(type_name)
        .await
        .context("Failed to load prices")?;

    for wanted in services {
        let line = find_price_line(&prices, wanted)
            .with_context(|| format!("No service '{}' for this vehicle type", wanted))?;
        if !draft.is_selected(&line.priceline_id) {
            draft.toggle_service(line.clone());
        }
    }

    let start = parse_start(at, &Local).map_err(|e| anyhow!(e))?;
    if start <= Utc::now() {
        bail!("Appointment time must be in the future");
    }
    draft.set_start(start).map_err(|e| anyhow!(e))?;

    print!("{}", render::render_booking(&draft, &Local));
    if dry_run {
        return Ok(());
    }

    let request = draft.to_request().map_err(|e| anyhow!(e))?;
    client
        .book_appointment(&request)
        .await
        .context("Failed to book appointment")?;
    println!("Appointment booked");
    Ok(())
}

/// Keep the appointment list on screen, refreshing on the configured
/// intervals until Ctrl-C.
async fn watch_appointments(config: &Config, mode: ViewMode) -> Result<()> {
    let (api_tx, mut api_rx) = mpsc::channel::<ApiMessage>(CHANNEL_CAPACITY);
    let (cmd_tx, cmd_rx) = mpsc::channel::<ApiCommand>(CHANNEL_CAPACITY);

    config.user_id()?;
    let worker_task = spawn_worker(config.worker(api_tx)?, cmd_rx);
    let pollers = [
        spawn_poller(
            cmd_tx.clone(),
            config.appointment_poll(),
            ApiCommand::RefreshAppointments,
        ),
        spawn_poller(cmd_tx.clone(), config.home_poll(), ApiCommand::RefreshHome),
    ];

    cmd_tx.send(ApiCommand::RefreshAll).await.ok();

    let mut app = App::new().with_view_mode(mode);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            msg = api_rx.recv() => {
                let Some(msg) = msg else { break };
                let redraw = matches!(
                    (&msg, app.view_mode),
                    (ApiMessage::AppointmentsLoaded(_), ViewMode::All)
                        | (ApiMessage::WaitingAppointmentsLoaded(_), ViewMode::Waiting)
                );
                if let Some(cmd) = app.handle_api_message(msg) {
                    cmd_tx.send(cmd).await.ok();
                }
                if redraw {
                    print_watch_screen(&app);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }
    }

    for poller in pollers {
        poller.abort();
    }
    cmd_tx.send(ApiCommand::Shutdown).await.ok();
    worker_task.await.ok();
    Ok(())
}

fn print_watch_screen(app: &App) {
    // clear and home
    print!("\x1B[2J\x1B[H");
    println!(
        "{} - {} (Ctrl-C to quit)\n",
        app.view_mode.name(),
        Local::now().format("%H:%M:%S")
    );
    print!(
        "{}",
        render::render_appointments(app.visible_appointments(), app.view_mode, Utc::now(), &Local)
    );
    if let Some(error) = &app.last_error {
        println!("\n! {}", error);
    }
}
