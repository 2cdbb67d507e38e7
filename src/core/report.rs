//! Analytics report entries.
//!
//! A report entry is one measured fact about a place (a neighbourhood
//! metric, an incident cost, a service level) with the status it was graded
//! at and who is responsible for it. Entries are city-wide and shown newest
//! first.

use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign, assign_opt};
use crate::entities::types::SensorStatus;
use crate::entities::{ReportEntry, ReportEntryColumn, ReportEntryModel, report_entry};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts the metric value as a JSON string or number and keeps its text.
fn value_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or a number, got {other}"
        ))),
    }
}

/// Report entry write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportEntryInput {
    /// When the entry was recorded
    pub timestamp: Option<DateTime<Utc>>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// Human-readable place name
    pub location_name: Option<String>,
    /// Category
    pub category: Option<String>,
    /// Metric shown in the report
    pub metric_label: Option<String>,
    /// Stored as text; numbers are accepted
    #[serde(deserialize_with = "value_text")]
    pub value: Option<String>,
    /// Estimated cost, free text
    pub cost_impact: Option<String>,
    /// Current status
    pub status: Option<SensorStatus>,
    /// Responsible party
    pub responsible: Option<String>,
}

impl ReportEntryInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.required("timestamp", self.timestamp.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        checker.text("location_name", self.location_name.as_ref());
        checker.text("category", self.category.as_ref());
        checker.text("metric_label", self.metric_label.as_ref());
        checker.text("value", self.value.as_ref());
        checker.required("status", self.status.as_ref());
        checker.text("responsible", self.responsible.as_ref());
        checker.finish()
    }
}

async fn find_entry<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<ReportEntryModel> {
    ReportEntry::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("ReportEntry", id))
}

/// Report entry resource
pub struct ReportEntries;

impl Resource for ReportEntries {
    const NAME: &'static str = "report-entries";
    type Input = ReportEntryInput;
    type View = ReportEntryModel;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<ReportEntryModel>> {
        Ok(ReportEntry::find()
            .order_by_desc(ReportEntryColumn::Timestamp)
            .all(db)
            .await?)
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<ReportEntryModel> {
        find_entry(db, id).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: ReportEntryInput) -> Result<ReportEntryModel> {
        input.validate(WriteMode::Create)?;
        let (
            Some(timestamp),
            Some(mfy),
            Some(location_name),
            Some(category),
            Some(metric_label),
            Some(value),
            Some(status),
            Some(responsible),
        ) = (
            input.timestamp,
            input.mfy,
            input.location_name,
            input.category,
            input.metric_label,
            input.value,
            input.status,
            input.responsible,
        )
        else {
            return Err(Error::field("timestamp", REQUIRED));
        };
        Ok(report_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            timestamp: Set(timestamp),
            mfy: Set(mfy),
            location_name: Set(location_name),
            category: Set(category),
            metric_label: Set(metric_label),
            value: Set(value),
            cost_impact: Set(input.cost_impact),
            status: Set(status),
            responsible: Set(responsible),
        }
        .insert(db)
        .await?)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: ReportEntryInput,
        mode: WriteMode,
    ) -> Result<ReportEntryModel> {
        input.validate(mode)?;
        let mut active: report_entry::ActiveModel = find_entry(db, id).await?.into();
        assign(&mut active.timestamp, input.timestamp);
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.location_name, input.location_name);
        assign(&mut active.category, input.category);
        assign(&mut active.metric_label, input.metric_label);
        assign(&mut active.value, input.value);
        assign_opt(&mut active.cost_impact, input.cost_impact);
        assign(&mut active.status, input.status);
        assign(&mut active.responsible, input.responsible);
        Ok(active.update(db).await?)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        find_entry(db, id).await?;
        ReportEntry::delete_by_id(id).exec(db).await?;
        Ok(())
    }
}
