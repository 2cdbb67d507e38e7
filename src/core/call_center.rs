//! Citizen call center: incoming requests, their processing timeline, and
//! the field services (responsible organizations) that handle them.
//!
//! Requests are city-wide. A request may be assigned to an organization;
//! deleting that organization leaves the request unassigned.

use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{
    Checker, REQUIRED, WriteMode, assign, assign_opt, ensure_references,
};
use crate::entities::call_request::{RequestCategory, RequestStatus};
use crate::entities::call_request_timeline::TimelineStatus;
use crate::entities::types::Labels;
use crate::entities::{
    CallRequest, CallRequestColumn, CallRequestModel, CallRequestTimeline, Organization,
    ResponsibleOrg, ResponsibleOrgColumn, ResponsibleOrgModel, TimelineColumn, TimelineModel,
    call_request, call_request_timeline, responsible_org,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, LoaderTrait, QueryOrder, Set,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

/// Responsible organization write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponsibleOrgInput {
    /// Organization name
    pub name: Option<String>,
    /// Service type
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Brigades on duty
    pub active_brigades: Option<i32>,
    /// Brigades in total
    pub total_brigades: Option<i32>,
    /// Load percentage
    pub current_load: Option<f64>,
    /// Dispatch phone
    pub contact_phone: Option<String>,
}

impl ResponsibleOrgInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.text("type", self.kind.as_ref());
        for (field, value) in [
            ("active_brigades", self.active_brigades),
            ("total_brigades", self.total_brigades),
        ] {
            checker.required(field, value.as_ref());
            checker.int_range(field, value, 0, i32::MAX);
        }
        checker.required("current_load", self.current_load.as_ref());
        checker.float_range("current_load", self.current_load, 0.0, f64::MAX);
        checker.text("contact_phone", self.contact_phone.as_ref());
        checker.finish()
    }
}

async fn find_responsible<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<ResponsibleOrgModel> {
    ResponsibleOrg::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("ResponsibleOrg", id))
}

/// Responsible organization resource
pub struct ResponsibleOrgs;

impl Resource for ResponsibleOrgs {
    const NAME: &'static str = "responsible-orgs";
    type Input = ResponsibleOrgInput;
    type View = ResponsibleOrgModel;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<ResponsibleOrgModel>> {
        Ok(ResponsibleOrg::find()
            .order_by_asc(ResponsibleOrgColumn::Name)
            .all(db)
            .await?)
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<ResponsibleOrgModel> {
        find_responsible(db, id).await
    }

    async fn create(
        db: &DatabaseConnection,
        _scope: Scope,
        input: ResponsibleOrgInput,
    ) -> Result<ResponsibleOrgModel> {
        input.validate(WriteMode::Create)?;
        let (
            Some(name),
            Some(kind),
            Some(active_brigades),
            Some(total_brigades),
            Some(current_load),
            Some(contact_phone),
        ) = (
            input.name,
            input.kind,
            input.active_brigades,
            input.total_brigades,
            input.current_load,
            input.contact_phone,
        )
        else {
            return Err(Error::field("name", REQUIRED));
        };
        Ok(responsible_org::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            kind: Set(kind),
            active_brigades: Set(active_brigades),
            total_brigades: Set(total_brigades),
            current_load: Set(current_load),
            contact_phone: Set(contact_phone),
        }
        .insert(db)
        .await?)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: ResponsibleOrgInput,
        mode: WriteMode,
    ) -> Result<ResponsibleOrgModel> {
        input.validate(mode)?;
        let mut active: responsible_org::ActiveModel = find_responsible(db, id).await?.into();
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.kind, input.kind);
        assign(&mut active.active_brigades, input.active_brigades);
        assign(&mut active.total_brigades, input.total_brigades);
        assign(&mut active.current_load, input.current_load);
        assign(&mut active.contact_phone, input.contact_phone);
        Ok(active.update(db).await?)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        find_responsible(db, id).await?;
        ResponsibleOrg::delete_by_id(id).exec(db).await?;
        Ok(())
    }
}

/// Call request with its processing steps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRequestView {
    /// The row itself
    #[serde(flatten)]
    pub item: CallRequestModel,
    /// Steps in chronological order
    pub timeline: Vec<TimelineModel>,
}

/// Distinguishes an explicit `null` from an absent field.
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Call request write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallRequestInput {
    /// Caller name
    pub citizen_name: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Call transcript
    pub transcript: Option<String>,
    /// Category
    pub category: Option<RequestCategory>,
    /// Processing status
    pub status: Option<RequestStatus>,
    /// When the call came in
    pub timestamp: Option<DateTime<Utc>>,
    /// Street address
    pub address: Option<String>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// Generated call summary
    pub ai_summary: Option<String>,
    /// Keywords extracted from the transcript
    pub keywords: Option<Vec<String>>,
    /// Caller trust score
    pub citizen_trust_score: Option<f64>,
    /// `null` unassigns, absent keeps the current assignment
    #[serde(deserialize_with = "explicit_null")]
    pub assigned_org: Option<Option<Uuid>>,
    /// Due date
    pub deadline: Option<DateTime<Utc>>,
}

impl CallRequestInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("citizen_name", self.citizen_name.as_ref());
        checker.text("phone", self.phone.as_ref());
        checker.text("transcript", self.transcript.as_ref());
        checker.required("category", self.category.as_ref());
        checker.required("timestamp", self.timestamp.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        checker.required("ai_summary", self.ai_summary.as_ref());
        checker.required("keywords", self.keywords.as_ref());
        checker.required("citizen_trust_score", self.citizen_trust_score.as_ref());
        checker.float_range("citizen_trust_score", self.citizen_trust_score, 0.0, 100.0);
        checker.finish()
    }
}

async fn find_request<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<CallRequestModel> {
    CallRequest::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("CallRequest", id))
}

async fn request_views<C: ConnectionTrait>(db: &C, requests: Vec<CallRequestModel>) -> Result<Vec<CallRequestView>> {
    let timelines = requests.load_many(CallRequestTimeline, db).await?;
    Ok(requests
        .into_iter()
        .zip(timelines)
        .map(|(item, mut timeline)| {
            timeline.sort_by_key(|step| step.timestamp);
            CallRequestView { item, timeline }
        })
        .collect())
}

async fn request_view<C: ConnectionTrait>(db: &C, request: CallRequestModel) -> Result<CallRequestView> {
    request_views(db, vec![request])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("CallRequest", "view"))
}

async fn check_assignee<C: ConnectionTrait>(db: &C, assigned: Option<Uuid>) -> Result<()> {
    match assigned {
        Some(id) => ensure_references::<Organization, _>(db, "assigned_org", &[id]).await,
        None => Ok(()),
    }
}

/// Call request resource
pub struct CallRequests;

impl Resource for CallRequests {
    const NAME: &'static str = "call-requests";
    type Input = CallRequestInput;
    type View = CallRequestView;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<CallRequestView>> {
        let requests = CallRequest::find()
            .order_by_desc(CallRequestColumn::Timestamp)
            .all(db)
            .await?;
        request_views(db, requests).await
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<CallRequestView> {
        let request = find_request(db, id).await?;
        request_view(db, request).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: CallRequestInput) -> Result<CallRequestView> {
        input.validate(WriteMode::Create)?;
        let assigned = input.assigned_org.flatten();
        check_assignee(db, assigned).await?;
        let (
            Some(citizen_name),
            Some(phone),
            Some(transcript),
            Some(category),
            Some(timestamp),
            Some(mfy),
            Some(ai_summary),
            Some(keywords),
            Some(citizen_trust_score),
        ) = (
            input.citizen_name,
            input.phone,
            input.transcript,
            input.category,
            input.timestamp,
            input.mfy,
            input.ai_summary,
            input.keywords,
            input.citizen_trust_score,
        )
        else {
            return Err(Error::field("citizen_name", REQUIRED));
        };
        let request = call_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            citizen_name: Set(citizen_name),
            phone: Set(phone),
            transcript: Set(transcript),
            category: Set(category),
            status: Set(input.status.unwrap_or_default()),
            timestamp: Set(timestamp),
            address: Set(input.address),
            mfy: Set(mfy),
            ai_summary: Set(ai_summary),
            keywords: Set(Labels(keywords)),
            citizen_trust_score: Set(citizen_trust_score),
            assigned_org_id: Set(assigned),
            deadline: Set(input.deadline),
        }
        .insert(db)
        .await?;
        info!(request = %request.id, category = ?request.category, "Registered call request");
        Ok(CallRequestView {
            item: request,
            timeline: Vec::new(),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: CallRequestInput,
        mode: WriteMode,
    ) -> Result<CallRequestView> {
        input.validate(mode)?;
        let existing = find_request(db, id).await?;
        let mut active: call_request::ActiveModel = existing.into();
        if let Some(assigned) = input.assigned_org {
            check_assignee(db, assigned).await?;
            active.assigned_org_id = ActiveValue::Set(assigned);
        }
        assign(&mut active.citizen_name, input.citizen_name);
        assign(&mut active.phone, input.phone);
        assign(&mut active.transcript, input.transcript);
        assign(&mut active.category, input.category);
        assign(&mut active.status, input.status);
        assign(&mut active.timestamp, input.timestamp);
        assign_opt(&mut active.address, input.address);
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.ai_summary, input.ai_summary);
        assign(&mut active.keywords, input.keywords.map(Labels));
        assign(&mut active.citizen_trust_score, input.citizen_trust_score);
        assign_opt(&mut active.deadline, input.deadline);
        let request = active.update(db).await?;
        request_view(db, request).await
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        find_request(db, id).await?;
        let txn = db.begin().await?;
        CallRequestTimeline::delete_many()
            .filter(TimelineColumn::CallRequestId.eq(id))
            .exec(&txn)
            .await?;
        CallRequest::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Call requests in one status, newest first.
pub async fn requests_by_status(db: &DatabaseConnection, status: RequestStatus) -> Result<Vec<CallRequestView>> {
    let requests = CallRequest::find()
        .filter(CallRequestColumn::Status.eq(status))
        .order_by_desc(CallRequestColumn::Timestamp)
        .all(db)
        .await?;
    request_views(db, requests).await
}

/// Timeline step write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimelineInput {
    /// Call request this step belongs to
    pub call_request: Option<Uuid>,
    /// Step description
    pub step: Option<String>,
    /// When the call came in
    pub timestamp: Option<DateTime<Utc>>,
    /// Who performed the step
    pub actor: Option<String>,
    /// Processing status
    pub status: Option<TimelineStatus>,
}

impl TimelineInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.required("call_request", self.call_request.as_ref());
        checker.text("step", self.step.as_ref());
        checker.required("timestamp", self.timestamp.as_ref());
        checker.text("actor", self.actor.as_ref());
        checker.required("status", self.status.as_ref());
        checker.finish()
    }
}

async fn find_step<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<TimelineModel> {
    CallRequestTimeline::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("CallRequestTimeline", id))
}

/// Call request timeline resource
pub struct CallRequestTimelines;

impl Resource for CallRequestTimelines {
    const NAME: &'static str = "call-request-timelines";
    type Input = TimelineInput;
    type View = TimelineModel;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<TimelineModel>> {
        Ok(CallRequestTimeline::find()
            .order_by_asc(TimelineColumn::Timestamp)
            .all(db)
            .await?)
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<TimelineModel> {
        find_step(db, id).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: TimelineInput) -> Result<TimelineModel> {
        input.validate(WriteMode::Create)?;
        let (Some(call_request), Some(step), Some(timestamp), Some(actor), Some(status)) = (
            input.call_request,
            input.step,
            input.timestamp,
            input.actor,
            input.status,
        ) else {
            return Err(Error::field("call_request", REQUIRED));
        };
        ensure_references::<CallRequest, _>(db, "call_request", &[call_request]).await?;
        Ok(call_request_timeline::ActiveModel {
            id: Set(Uuid::new_v4()),
            call_request_id: Set(call_request),
            step: Set(step),
            timestamp: Set(timestamp),
            actor: Set(actor),
            status: Set(status),
        }
        .insert(db)
        .await?)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: TimelineInput,
        mode: WriteMode,
    ) -> Result<TimelineModel> {
        input.validate(mode)?;
        let existing = find_step(db, id).await?;
        if let Some(call_request) = input.call_request {
            ensure_references::<CallRequest, _>(db, "call_request", &[call_request]).await?;
        }
        let mut active: call_request_timeline::ActiveModel = existing.into();
        assign(&mut active.call_request_id, input.call_request);
        assign(&mut active.step, input.step);
        assign(&mut active.timestamp, input.timestamp);
        assign(&mut active.actor, input.actor);
        assign(&mut active.status, input.status);
        Ok(active.update(db).await?)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        find_step(db, id).await?;
        CallRequestTimeline::delete_by_id(id).exec(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    fn request_input(name: &str, status: Option<RequestStatus>) -> CallRequestInput {
        CallRequestInput {
            citizen_name: Some(name.into()),
            phone: Some("+998901234567".into()),
            transcript: Some("Ko'chada chiqindi to'planib qolgan".into()),
            category: Some(RequestCategory::Waste),
            status,
            timestamp: Some(Utc::now()),
            mfy: Some("Navbahor MFY".into()),
            ai_summary: Some("Chiqindi olib ketilmagan".into()),
            keywords: Some(vec!["chiqindi".into()]),
            citizen_trust_score: Some(82.0),
            ..Default::default()
        }
    }

    async fn add_step(db: &DatabaseConnection, request: Uuid, step: &str, minutes: i64) -> Result<TimelineModel> {
        CallRequestTimelines::create(
            db,
            Scope::All,
            TimelineInput {
                call_request: Some(request),
                step: Some(step.into()),
                timestamp: Some(Utc::now() + Duration::minutes(minutes)),
                actor: Some("Operator".into()),
                status: Some(TimelineStatus::Done),
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_request_defaults_to_new() -> Result<()> {
        let db = setup_test_db().await?;
        let request = CallRequests::create(&db, Scope::All, request_input("Aziza", None)).await?;
        assert_eq!(request.item.status, RequestStatus::New);
        assert!(request.timeline.is_empty());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["category"], "WASTE");
        assert_eq!(json["keywords"][0], "chiqindi");
        assert!(json["assigned_org"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn test_timeline_is_embedded_in_order() -> Result<()> {
        let db = setup_test_db().await?;
        let request = CallRequests::create(&db, Scope::All, request_input("Aziza", None)).await?;
        add_step(&db, request.item.id, "Brigada yuborildi", 30).await?;
        add_step(&db, request.item.id, "Qabul qilindi", 0).await?;

        let request = CallRequests::retrieve(&db, Scope::All, request.item.id).await?;
        let steps: Vec<_> = request.timeline.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(steps, ["Qabul qilindi", "Brigada yuborildi"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_timeline_requires_existing_request() -> Result<()> {
        let db = setup_test_db().await?;
        let result = add_step(&db, Uuid::new_v4(), "Qabul qilindi", 0).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("call_request"));
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_and_unassign() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let request = CallRequests::create(&db, Scope::All, request_input("Aziza", None)).await?;

        let assign: CallRequestInput = serde_json::from_value(serde_json::json!({
            "assigned_org": org.item.id,
            "status": "ASSIGNED",
        }))
        .unwrap();
        let updated = CallRequests::update(&db, Scope::All, request.item.id, assign, WriteMode::Patch).await?;
        assert_eq!(updated.item.assigned_org_id, Some(org.item.id));
        assert_eq!(updated.item.status, RequestStatus::Assigned);

        let keep: CallRequestInput = serde_json::from_value(serde_json::json!({"status": "PROCESSING"})).unwrap();
        let updated = CallRequests::update(&db, Scope::All, request.item.id, keep, WriteMode::Patch).await?;
        assert_eq!(updated.item.assigned_org_id, Some(org.item.id));

        let clear: CallRequestInput = serde_json::from_value(serde_json::json!({"assigned_org": null})).unwrap();
        let updated = CallRequests::update(&db, Scope::All, request.item.id, clear, WriteMode::Patch).await?;
        assert_eq!(updated.item.assigned_org_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_requests_by_status() -> Result<()> {
        let db = setup_test_db().await?;
        CallRequests::create(&db, Scope::All, request_input("A", None)).await?;
        CallRequests::create(&db, Scope::All, request_input("B", Some(RequestStatus::Resolved))).await?;

        let resolved = requests_by_status(&db, RequestStatus::Resolved).await?;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].item.citizen_name, "B");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_request_drops_timeline() -> Result<()> {
        let db = setup_test_db().await?;
        let request = CallRequests::create(&db, Scope::All, request_input("Aziza", None)).await?;
        let step = add_step(&db, request.item.id, "Qabul qilindi", 0).await?;

        CallRequests::delete(&db, Scope::All, request.item.id).await?;
        let result = CallRequestTimelines::retrieve(&db, Scope::All, step.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }
}
