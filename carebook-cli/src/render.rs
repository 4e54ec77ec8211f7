//! Plain-text rendering for the command line.
//!
//! Every function takes the time zone to display in and, where progress is
//! shown, the current time, so output is reproducible in tests.

use std::fmt::{Display, Write};

use chrono::{DateTime, TimeZone, Utc};

use crate::app::ViewMode;
use crate::booking::{format_date_time, BookingDraft};
use crate::models::{
    Appointment, CustomerProfile, DiscountKind, Invoice, PriceLine, Promotion, Service,
    VehicleType,
};
use crate::timeline::{format_countdown, Timeline, COMPLETED, RECEIVED};

const REACHED: &str = "[x]";
const PENDING: &str = "[ ]";

/// `1234567.0` as `1,234,567 VND`
pub fn format_money(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{}{} VND", sign, grouped)
}

fn clock<Tz>(time: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.with_timezone(tz).format("%H:%M").to_string()
}

fn stage_label(label: &str) -> &str {
    match label {
        RECEIVED => "Received",
        COMPLETED => "Completed",
        other => other,
    }
}

/// One line per checkpoint: `[x] Received: 09:00`
pub fn render_timeline<Tz>(timeline: &Timeline, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    for checkpoint in timeline {
        let mark = if checkpoint.reached { REACHED } else { PENDING };
        let _ = writeln!(
            out,
            "{} {}: {}",
            mark,
            stage_label(&checkpoint.label),
            clock(checkpoint.time, tz)
        );
    }
    out
}

/// Status line shown on an in-progress card
pub fn progress_status(appointment: &Appointment) -> &'static str {
    if appointment.is_awaiting_vehicle() {
        "Awaiting vehicle"
    } else {
        "In progress"
    }
}

pub fn invoice_status(appointment: &Appointment) -> &'static str {
    if appointment.is_paid() {
        "Paid"
    } else {
        "Awaiting payment"
    }
}

/// Appointment card. The timeline is only drawn in the in-progress view.
pub fn render_appointment<Tz>(
    appointment: &Appointment,
    mode: ViewMode,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "Appointment {}", appointment.id);
    let status = match mode {
        ViewMode::All => appointment.status.to_string(),
        ViewMode::Waiting => progress_status(appointment).to_string(),
    };
    let _ = writeln!(out, "  Status:   {}", status);
    if let Some(vehicle) = &appointment.vehicle_id {
        let _ = writeln!(out, "  Vehicle:  {}", vehicle.summary());
    }
    let _ = writeln!(
        out,
        "  Booked:   {}",
        format_date_time(appointment.appointment_datetime, tz)
    );
    let _ = writeln!(out, "  Payment:  {}", invoice_status(appointment));
    if let Some(invoice) = &appointment.invoice {
        let _ = writeln!(out, "  Invoice:  {}", invoice.id);
    }

    if mode == ViewMode::Waiting {
        let timeline = Timeline::of(appointment, now);
        if !timeline.is_empty() {
            let (reached, total) = timeline.progress();
            let _ = write!(out, "  Progress: {}/{}", reached, total);
            if let Some(stage) = timeline.current_stage() {
                let _ = write!(out, ", next: {}", stage_label(&stage.label));
            }
            out.push_str("\n\n");
            for line in render_timeline(&timeline, tz).lines() {
                let _ = writeln!(out, "  {}", line);
            }
            if let (false, Some(done)) = (timeline.is_finished(), timeline.estimated_completion()) {
                let _ = writeln!(out, "  Ready in {}", format_countdown(now, done));
            }
        }
    }
    out
}

/// Every visible appointment, or a placeholder when there are none
pub fn render_appointments<Tz>(
    appointments: &[Appointment],
    mode: ViewMode,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if appointments.is_empty() {
        return "No appointments\n".to_string();
    }
    appointments
        .iter()
        .map(|a| render_appointment(a, mode, now, tz))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_profile(profile: &CustomerProfile) -> String {
    let customer = &profile.customer;
    let mut out = String::new();
    let _ = writeln!(out, "Name:      {}", customer.display_name());
    let _ = writeln!(out, "Email:     {}", customer.email.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Phone:     {}", customer.phone_number.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Address:   {}", customer.address.as_deref().unwrap_or("-"));
    if let Some(rank) = &customer.customer_rank_id {
        let _ = writeln!(out, "Rank:      {} ({}% off)", rank.rank_name, rank.discount_rate);
    }
    let _ = writeln!(out, "Spent:     {}", format_money(customer.total_spending));

    out.push_str("\nVehicles:\n");
    if profile.vehicles.is_empty() {
        out.push_str("  none\n");
    }
    for vehicle in &profile.vehicles {
        let _ = write!(out, "  {}  {}", vehicle.id, vehicle.summary());
        if let Some(kind) = vehicle.type_name() {
            let _ = write!(out, "  [{}]", kind);
        }
        if let Some(color) = &vehicle.color {
            let _ = write!(out, "  {}", color);
        }
        if let Some(year) = vehicle.year {
            let _ = write!(out, "  {}", year);
        }
        out.push('\n');
    }
    out
}

pub fn render_services(services: &[Service]) -> String {
    let mut out = String::new();
    for service in services {
        let _ = writeln!(out, "{}  ({} min)", service.name, service.time_required);
        if let Some(description) = service.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "    {}", description);
        }
    }
    out
}

pub fn render_vehicle_types(types: &[VehicleType]) -> String {
    let mut out = String::new();
    for kind in types {
        match kind.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => {
                let _ = writeln!(out, "{}: {}", kind.vehicle_type_name, description);
            }
            None => {
                let _ = writeln!(out, "{}", kind.vehicle_type_name);
            }
        }
    }
    out
}

/// Price list with selection marks from the draft
pub fn render_prices(prices: &[PriceLine], draft: &BookingDraft) -> String {
    let mut out = String::new();
    for line in prices {
        let mark = if draft.is_selected(&line.priceline_id) { REACHED } else { PENDING };
        let _ = writeln!(
            out,
            "{} {}  {}  {}  ({} min)",
            mark,
            line.priceline_id,
            line.service,
            format_money(line.price),
            line.time_required
        );
    }
    out
}

/// Summary shown before a booking is confirmed
pub fn render_booking<Tz>(draft: &BookingDraft, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    if let Some(vehicle) = draft.vehicle() {
        let _ = writeln!(out, "Vehicle:   {}", vehicle.summary());
    }
    out.push_str("Services:\n");
    for line in draft.services() {
        let _ = writeln!(out, "  - {} - {} min", line.service, line.time_required);
    }
    let _ = writeln!(out, "Total time:  {} min", draft.total_minutes());
    let _ = writeln!(out, "Total price: {}", format_money(draft.total_price()));
    if let Some(start) = draft.start() {
        let _ = writeln!(out, "Start:       {}", format_date_time(start, tz));
    }
    if let Some(done) = draft.estimated_completion() {
        let _ = writeln!(out, "Expected completion at {}", format_date_time(done, tz));
    }
    out
}

fn render_promotion(promotion: &Promotion) -> String {
    let value = promotion.discount_value().unwrap_or_default();
    let amount = match promotion.discount_type {
        DiscountKind::FixedAmount => format_money(value),
        DiscountKind::Percentage => format!("{}%", value),
    };
    format!(
        "{} ({}): {}",
        promotion.description, promotion.discount_type, amount
    )
}

pub fn render_invoice<Tz>(invoice: &Invoice, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let customer = &invoice.customer_id;
    let _ = writeln!(out, "Invoice {}", invoice.id);
    let _ = writeln!(out, "Customer:  {}", customer.name.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Email:     {}", customer.email.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Address:   {}", customer.address.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Phone:     {}", customer.phone_number.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Handled by {}", invoice.employee_id.name.as_deref().unwrap_or("-"));
    if let Some(created) = invoice.created_at {
        let _ = writeln!(out, "Issued:    {}", format_date_time(created, tz));
    }

    out.push_str("\nServices:\n");
    for line in &invoice.details {
        let _ = writeln!(
            out,
            "  - {}: {} x {}",
            line.service_id.name,
            format_money(line.price),
            line.quantity
        );
    }

    if !invoice.promotion_header_ids.is_empty() {
        out.push_str("\nPromotions:\n");
        for promotion in &invoice.promotion_header_ids {
            let _ = writeln!(out, "  - {}", render_promotion(promotion));
        }
    }

    out.push('\n');
    let _ = writeln!(out, "Total:     {}", format_money(invoice.total_amount));
    let _ = writeln!(out, "Discount:  {}", format_money(invoice.discount_amount));
    let _ = writeln!(out, "Amount due {}", format_money(invoice.final_amount));
    let _ = writeln!(out, "Status:    {}", if invoice.is_paid() { "Paid" } else { "Awaiting payment" });
    out
}
