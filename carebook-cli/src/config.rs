//! Runtime configuration and session.
//!
//! Every option can come from the command line or the environment, so a shell
//! profile can hold the session token and user id between runs.

use std::time::Duration;

use clap::Args;
use tokio::sync::mpsc;

use crate::api::{ApiClient, DEFAULT_BASE_URL};
use crate::error::ApiError;
use crate::worker::{ApiMessage, ApiWorker};

/// Options shared by every command
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base URL of the booking API
    #[arg(long, global = true, env = "CAREBOOK_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Session token issued at sign-in
    #[arg(long, global = true, env = "CAREBOOK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Account id issued at sign-in
    #[arg(long, global = true, env = "CAREBOOK_USER_ID")]
    pub user_id: Option<String>,

    /// Employee recorded on invoices generated from this client
    #[arg(long, global = true, env = "CAREBOOK_EMPLOYEE_ID")]
    pub employee_id: Option<String>,

    /// Seconds between appointment refreshes while watching
    #[arg(
        long,
        global = true,
        env = "CAREBOOK_APPOINTMENT_POLL_SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub appointment_poll_secs: u64,

    /// Seconds between profile and catalogue refreshes while watching
    #[arg(
        long,
        global = true,
        env = "CAREBOOK_HOME_POLL_SECS",
        default_value_t = 15,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub home_poll_secs: u64,
}

impl Config {
    /// API client carrying the session token, if one is configured
    pub fn client(&self) -> Result<ApiClient, ApiError> {
        let client = ApiClient::new(&self.api_url)?;
        Ok(match &self.token {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    /// Session token, required before any worker is started
    pub fn token(&self) -> Result<&str, ApiError> {
        self.token
            .as_deref()
            .ok_or(ApiError::MissingSession("CAREBOOK_TOKEN"))
    }

    /// Worker for the configured session. Fails up front when no token is
    /// set, since every worker command is authenticated.
    pub fn worker(&self, tx: mpsc::Sender<ApiMessage>) -> Result<ApiWorker, ApiError> {
        self.token()?;
        let mut worker = ApiWorker::new(self.client()?, tx);
        if let Some(user_id) = &self.user_id {
            worker = worker.with_user(user_id);
        }
        if let Some(employee_id) = &self.employee_id {
            worker = worker.with_employee(employee_id);
        }
        Ok(worker)
    }

    pub fn user_id(&self) -> Result<&str, ApiError> {
        self.user_id
            .as_deref()
            .ok_or(ApiError::MissingSession("CAREBOOK_USER_ID"))
    }

    pub fn employee_id(&self) -> Result<&str, ApiError> {
        self.employee_id
            .as_deref()
            .ok_or(ApiError::MissingSession("CAREBOOK_EMPLOYEE_ID"))
    }

    pub fn appointment_poll(&self) -> Duration {
        Duration::from_secs(self.appointment_poll_secs)
    }

    pub fn home_poll(&self) -> Duration {
        Duration::from_secs(self.home_poll_secs)
    }
}
