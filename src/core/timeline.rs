//! Employee lifecycle timeline.
//!
//! [`load_lifecycle`] runs one fixed query per record kind;
//! [`assemble_timeline`] turns the records into dated events, newest first.
//! Records whose date field is empty produce no event.

use crate::{
    entities::{
        Employee,
        lifecycle::{
            asset, asset_assignment, award, complaint, promotion, resignation, termination,
            training, training_program, transfer, warning,
        },
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

/// Where an event came from. Declaration order is the tie-break priority for
/// events on the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Joining,
    Termination,
    Resignation,
    Promotion,
    Transfer,
    Award,
    Warning,
    Complaint,
    Training,
    Asset,
}

/// What happened, with the fields shown for that kind of event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetail {
    Joined,
    AwardReceived {
        award_type: Option<String>,
        gift: Option<String>,
    },
    Promotion {
        reason: Option<String>,
        status: String,
    },
    Transfer {
        reason: Option<String>,
        status: String,
    },
    WarningIssued {
        subject: String,
        status: String,
    },
    ComplaintRecorded {
        subject: String,
        status: String,
    },
    ResignationSubmitted {
        reason: Option<String>,
        status: String,
    },
    Termination {
        reason: Option<String>,
        status: String,
    },
    AssetAssigned {
        asset_name: String,
    },
    AssetReturned {
        asset_name: String,
    },
    TrainingAssigned {
        program_title: String,
        status: String,
    },
    TrainingCompleted {
        program_title: String,
        status: String,
    },
}

impl EventDetail {
    /// Display title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Joined => "Employee Joined",
            Self::AwardReceived { .. } => "Award Received",
            Self::Promotion { .. } => "Promotion",
            Self::Transfer { .. } => "Department Transfer",
            Self::WarningIssued { .. } => "Warning Issued",
            Self::ComplaintRecorded { .. } => "Complaint Recorded",
            Self::ResignationSubmitted { .. } => "Resignation Submitted",
            Self::Termination { .. } => "Termination",
            Self::AssetAssigned { .. } => "Asset Assigned",
            Self::AssetReturned { .. } => "Asset Returned",
            Self::TrainingAssigned { .. } => "Training Assigned",
            Self::TrainingCompleted { .. } => "Training Completed",
        }
    }

    #[must_use]
    pub const fn source(&self) -> EventSource {
        match self {
            Self::Joined => EventSource::Joining,
            Self::AwardReceived { .. } => EventSource::Award,
            Self::Promotion { .. } => EventSource::Promotion,
            Self::Transfer { .. } => EventSource::Transfer,
            Self::WarningIssued { .. } => EventSource::Warning,
            Self::ComplaintRecorded { .. } => EventSource::Complaint,
            Self::ResignationSubmitted { .. } => EventSource::Resignation,
            Self::Termination { .. } => EventSource::Termination,
            Self::AssetAssigned { .. } | Self::AssetReturned { .. } => EventSource::Asset,
            Self::TrainingAssigned { .. } | Self::TrainingCompleted { .. } => {
                EventSource::Training
            }
        }
    }
}

/// One entry on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub date: NaiveDate,
    pub title: &'static str,
    /// Id of the source record (the employee for the joining event)
    pub record_id: i64,
    #[serde(flatten)]
    pub detail: EventDetail,
}

impl TimelineEvent {
    fn new(date: NaiveDate, record_id: i64, detail: EventDetail) -> Self {
        Self {
            date,
            title: detail.title(),
            record_id,
            detail,
        }
    }
}

/// Every lifecycle record of one employee.
#[derive(Debug, Clone, Default)]
pub struct LifecycleRecords {
    pub employee_id: i64,
    pub date_of_joining: Option<NaiveDate>,
    pub awards: Vec<award::Model>,
    pub promotions: Vec<promotion::Model>,
    pub transfers: Vec<transfer::Model>,
    pub warnings: Vec<warning::Model>,
    pub complaints: Vec<complaint::Model>,
    pub resignations: Vec<resignation::Model>,
    pub terminations: Vec<termination::Model>,
    pub asset_assignments: Vec<(asset_assignment::Model, Option<asset::Model>)>,
    pub trainings: Vec<(training::Model, Option<training_program::Model>)>,
}

/// Timeline order: date descending, then source priority, then id descending.
fn timeline_order(a: &TimelineEvent, b: &TimelineEvent) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.detail.source().cmp(&b.detail.source()))
        .then_with(|| b.record_id.cmp(&a.record_id))
}

/// Builds the ordered timeline from loaded records.
#[must_use]
pub fn assemble_timeline(records: LifecycleRecords) -> Vec<TimelineEvent> {
    let mut events = Vec::new();

    if let Some(joined) = records.date_of_joining {
        events.push(TimelineEvent::new(joined, records.employee_id, EventDetail::Joined));
    }
    for a in records.awards {
        if let Some(date) = a.award_date {
            events.push(TimelineEvent::new(
                date,
                a.id,
                EventDetail::AwardReceived {
                    award_type: a.award_type,
                    gift: a.gift,
                },
            ));
        }
    }
    for p in records.promotions {
        if let Some(date) = p.promotion_date.or(p.effective_date) {
            events.push(TimelineEvent::new(
                date,
                p.id,
                EventDetail::Promotion {
                    reason: p.reason,
                    status: p.status,
                },
            ));
        }
    }
    for t in records.transfers {
        if let Some(date) = t.transfer_date.or(t.effective_date) {
            events.push(TimelineEvent::new(
                date,
                t.id,
                EventDetail::Transfer {
                    reason: t.reason,
                    status: t.status,
                },
            ));
        }
    }
    for w in records.warnings {
        if let Some(date) = w.warning_date {
            events.push(TimelineEvent::new(
                date,
                w.id,
                EventDetail::WarningIssued {
                    subject: w.subject,
                    status: w.status,
                },
            ));
        }
    }
    for c in records.complaints {
        if let Some(date) = c.complaint_date {
            events.push(TimelineEvent::new(
                date,
                c.id,
                EventDetail::ComplaintRecorded {
                    subject: c.subject,
                    status: c.status,
                },
            ));
        }
    }
    for r in records.resignations {
        if let Some(date) = r.resignation_date {
            events.push(TimelineEvent::new(
                date,
                r.id,
                EventDetail::ResignationSubmitted {
                    reason: r.reason,
                    status: r.status,
                },
            ));
        }
    }
    for t in records.terminations {
        if let Some(date) = t.termination_date {
            events.push(TimelineEvent::new(
                date,
                t.id,
                EventDetail::Termination {
                    reason: t.reason,
                    status: t.status,
                },
            ));
        }
    }
    for (assignment, asset) in records.asset_assignments {
        let asset_name = asset.map(|a| a.name).unwrap_or_default();
        if let Some(date) = assignment.checkout_date {
            events.push(TimelineEvent::new(
                date,
                assignment.id,
                EventDetail::AssetAssigned {
                    asset_name: asset_name.clone(),
                },
            ));
        }
        if let Some(date) = assignment.checkin_date {
            events.push(TimelineEvent::new(
                date,
                assignment.id,
                EventDetail::AssetReturned { asset_name },
            ));
        }
    }
    for (t, program) in records.trainings {
        let program_title = program.map(|p| p.title).unwrap_or_default();
        if let Some(date) = t.assigned_date {
            events.push(TimelineEvent::new(
                date,
                t.id,
                EventDetail::TrainingAssigned {
                    program_title: program_title.clone(),
                    status: t.status.clone(),
                },
            ));
        }
        if let Some(date) = t.completion_date {
            events.push(TimelineEvent::new(
                date,
                t.id,
                EventDetail::TrainingCompleted {
                    program_title,
                    status: t.status,
                },
            ));
        }
    }

    events.sort_by(timeline_order);
    events
}

/// Loads every lifecycle record of `employee_id`.
pub async fn load_lifecycle<C>(db: &C, employee_id: i64) -> Result<LifecycleRecords>
where
    C: ConnectionTrait,
{
    let employee = Employee::find_by_id(employee_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Employee", employee_id))?;

    Ok(LifecycleRecords {
        employee_id,
        date_of_joining: Some(employee.date_of_joining),
        awards: award::Entity::find()
            .filter(award::Column::EmployeeId.eq(employee_id))
            .all(db)
            .await?,
        promotions: promotion::Entity::find()
            .filter(promotion::Column::EmployeeId.eq(employee_id))
            .all(db)
            .await?,
        transfers: transfer::Entity::find()
            .filter(transfer::Column::EmployeeId.eq(employee_id))
            .all(db)
            .await?,
        warnings: warning::Entity::find()
            .filter(warning::Column::EmployeeId.eq(employee_id))
            .all(db)
            .await?,
        complaints: complaint::Entity::find()
            .filter(complaint::Column::EmployeeId.eq(employee_id))
            .all(db)
            .await?,
        resignations: resignation::Entity::find()
            .filter(resignation::Column::EmployeeId.eq(employee_id))
            .all(db)
            .await?,
        terminations: termination::Entity::find()
            .filter(termination::Column::EmployeeId.eq(employee_id))
            .all(db)
            .await?,
        asset_assignments: asset_assignment::Entity::find()
            .filter(asset_assignment::Column::EmployeeId.eq(employee_id))
            .find_also_related(asset::Entity)
            .all(db)
            .await?,
        trainings: training::Entity::find()
            .filter(training::Column::EmployeeId.eq(employee_id))
            .find_also_related(training_program::Entity)
            .all(db)
            .await?,
    })
}

/// The ordered timeline of one employee.
pub async fn employee_timeline<C>(db: &C, employee_id: i64) -> Result<Vec<TimelineEvent>>
where
    C: ConnectionTrait,
{
    Ok(assemble_timeline(load_lifecycle(db, employee_id).await?))
}
