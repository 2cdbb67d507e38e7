//! Construction monitoring: schedule stages (missions) and the camera-watched
//! sites that follow them.
//!
//! Missions are shared reference data; a site may belong to an organization
//! and links any number of missions.

use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{
    Checker, REQUIRED, WriteMode, assign, dedup_ids, ensure_references,
};
use crate::entities::construction_mission::{MissionStatus, StageType};
use crate::entities::construction_site::SiteStatus;
use crate::entities::{
    ConstructionMission, ConstructionSite, MissionColumn, MissionModel, SiteColumn, SiteMission,
    SiteMissionColumn, SiteModel, construction_mission, construction_site, site_mission,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, LoaderTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Construction mission write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MissionInput {
    /// Stage name
    pub stage_name: Option<String>,
    /// Construction stage
    pub stage_type: Option<StageType>,
    /// Due date
    pub deadline: Option<DateTime<Utc>>,
    /// Current status
    pub status: Option<MissionStatus>,
    /// Completion percentage
    pub progress: Option<f64>,
}

impl MissionInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("stage_name", self.stage_name.as_ref());
        checker.required("stage_type", self.stage_type.as_ref());
        checker.required("deadline", self.deadline.as_ref());
        checker.required("progress", self.progress.as_ref());
        checker.float_range("progress", self.progress, 0.0, 100.0);
        checker.finish()
    }
}

async fn find_mission<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<MissionModel> {
    ConstructionMission::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("ConstructionMission", id))
}

/// Construction mission resource
pub struct ConstructionMissions;

impl Resource for ConstructionMissions {
    const NAME: &'static str = "construction-missions";
    type Input = MissionInput;
    type View = MissionModel;

    async fn list(db: &DatabaseConnection, _scope: Scope) -> Result<Vec<MissionModel>> {
        Ok(ConstructionMission::find()
            .order_by_asc(MissionColumn::Deadline)
            .all(db)
            .await?)
    }

    async fn retrieve(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<MissionModel> {
        find_mission(db, id).await
    }

    async fn create(db: &DatabaseConnection, _scope: Scope, input: MissionInput) -> Result<MissionModel> {
        input.validate(WriteMode::Create)?;
        let (Some(stage_name), Some(stage_type), Some(deadline), Some(progress)) =
            (input.stage_name, input.stage_type, input.deadline, input.progress)
        else {
            return Err(Error::field("stage_name", REQUIRED));
        };
        let mission = construction_mission::ActiveModel {
            id: Set(Uuid::new_v4()),
            stage_name: Set(stage_name),
            stage_type: Set(stage_type),
            deadline: Set(deadline),
            status: Set(input.status.unwrap_or_default()),
            progress: Set(progress),
        }
        .insert(db)
        .await?;
        Ok(mission)
    }

    async fn update(
        db: &DatabaseConnection,
        _scope: Scope,
        id: Uuid,
        input: MissionInput,
        mode: WriteMode,
    ) -> Result<MissionModel> {
        input.validate(mode)?;
        let mut active: construction_mission::ActiveModel = find_mission(db, id).await?.into();
        assign(&mut active.stage_name, input.stage_name);
        assign(&mut active.stage_type, input.stage_type);
        assign(&mut active.deadline, input.deadline);
        assign(&mut active.status, input.status);
        assign(&mut active.progress, input.progress);
        Ok(active.update(db).await?)
    }

    async fn delete(db: &DatabaseConnection, _scope: Scope, id: Uuid) -> Result<()> {
        find_mission(db, id).await?;
        let txn = db.begin().await?;
        SiteMission::delete_many()
            .filter(SiteMissionColumn::MissionId.eq(id))
            .exec(&txn)
            .await?;
        ConstructionMission::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Construction site with its schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteView {
    /// The row itself
    #[serde(flatten)]
    pub item: SiteModel,
    /// Linked missions, earliest deadline first
    pub missions: Vec<MissionModel>,
}

/// Construction site write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteInput {
    /// Owning organization id
    pub organization: Option<Uuid>,
    /// Display name
    pub name: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Contractor
    pub contractor_name: Option<String>,
    /// Camera stream URL
    pub camera_url: Option<String>,
    /// First day of the range, `YYYY-MM-DD`
    pub start_date: Option<DateTime<Utc>>,
    /// Current status
    pub status: Option<SiteStatus>,
    /// Completion percentage
    pub overall_progress: Option<f64>,
    /// Stage detected on camera
    pub current_ai_stage: Option<StageType>,
    /// Confidence of the last analysis
    pub ai_confidence: Option<f64>,
    /// Objects detected on camera, as JSON
    pub detected_objects: Option<Value>,
    /// Mission ids; replaces the linked set when present
    pub missions: Option<Vec<Uuid>>,
}

impl SiteInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.text("address", self.address.as_ref());
        checker.text("contractor_name", self.contractor_name.as_ref());
        checker.text("camera_url", self.camera_url.as_ref());
        checker.required("start_date", self.start_date.as_ref());
        checker.required("status", self.status.as_ref());
        checker.required("overall_progress", self.overall_progress.as_ref());
        checker.float_range("overall_progress", self.overall_progress, 0.0, 100.0);
        checker.required("current_ai_stage", self.current_ai_stage.as_ref());
        checker.required("ai_confidence", self.ai_confidence.as_ref());
        checker.float_range("ai_confidence", self.ai_confidence, 0.0, 100.0);
        if self.detected_objects.as_ref().is_some_and(|v| !v.is_object()) {
            checker.add("detected_objects", "Expected a JSON object.");
        }
        checker.finish()
    }
}

async fn find_site<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<SiteModel> {
    let site = ConstructionSite::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("ConstructionSite", id))?;
    scope.ensure(site.organization_id)?;
    Ok(site)
}

async fn site_views<C: ConnectionTrait>(db: &C, sites: Vec<SiteModel>) -> Result<Vec<SiteView>> {
    let missions = sites.load_many_to_many(ConstructionMission, SiteMission, db).await?;
    Ok(sites
        .into_iter()
        .zip(missions)
        .map(|(item, mut missions)| {
            missions.sort_by_key(|m| m.deadline);
            SiteView { item, missions }
        })
        .collect())
}

async fn site_view<C: ConnectionTrait>(db: &C, site: SiteModel) -> Result<SiteView> {
    site_views(db, vec![site])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("ConstructionSite", "view"))
}

/// Replaces the missions linked to a site.
async fn replace_missions<C: ConnectionTrait>(db: &C, site_id: Uuid, mission_ids: Vec<Uuid>) -> Result<()> {
    let mission_ids = dedup_ids(mission_ids);
    ensure_references::<ConstructionMission, _>(db, "missions", &mission_ids).await?;
    SiteMission::delete_many()
        .filter(SiteMissionColumn::SiteId.eq(site_id))
        .exec(db)
        .await?;
    if mission_ids.is_empty() {
        return Ok(());
    }
    SiteMission::insert_many(mission_ids.into_iter().map(|mission_id| site_mission::ActiveModel {
        site_id: Set(site_id),
        mission_id: Set(mission_id),
    }))
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Construction site resource
pub struct ConstructionSites;

impl Resource for ConstructionSites {
    const NAME: &'static str = "construction-sites";
    type Input = SiteInput;
    type View = SiteView;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<SiteView>> {
        let sites = ConstructionSite::find()
            .filter(scope.condition(SiteColumn::OrganizationId))
            .order_by_asc(SiteColumn::Name)
            .all(db)
            .await?;
        site_views(db, sites).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<SiteView> {
        let site = find_site(db, scope, id).await?;
        site_view(db, site).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: SiteInput) -> Result<SiteView> {
        input.validate(WriteMode::Create)?;
        let (
            Some(name),
            Some(address),
            Some(contractor_name),
            Some(camera_url),
            Some(start_date),
            Some(status),
            Some(overall_progress),
            Some(current_ai_stage),
            Some(ai_confidence),
        ) = (
            input.name,
            input.address,
            input.contractor_name,
            input.camera_url,
            input.start_date,
            input.status,
            input.overall_progress,
            input.current_ai_stage,
            input.ai_confidence,
        )
        else {
            return Err(Error::field("name", REQUIRED));
        };
        let txn = db.begin().await?;
        let owner = organization::owner_for_create(&txn, scope, input.organization).await?;
        let site = construction_site::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            name: Set(name.trim().to_string()),
            address: Set(address),
            contractor_name: Set(contractor_name),
            camera_url: Set(camera_url),
            start_date: Set(start_date),
            status: Set(status),
            overall_progress: Set(overall_progress),
            current_ai_stage: Set(current_ai_stage),
            ai_confidence: Set(ai_confidence),
            detected_objects: Set(input.detected_objects.unwrap_or_else(|| Value::Object(Default::default()))),
        }
        .insert(&txn)
        .await?;
        replace_missions(&txn, site.id, input.missions.unwrap_or_default()).await?;
        let view = site_view(&txn, site).await?;
        txn.commit().await?;
        info!(site = %view.item.name, missions = view.missions.len(), "Created construction site");
        Ok(view)
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: SiteInput,
        mode: WriteMode,
    ) -> Result<SiteView> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_site(&txn, scope, id).await?;
        let owner =
            organization::owner_for_update(&txn, scope, existing.organization_id, input.organization).await?;
        let mut active: construction_site::ActiveModel = existing.into();
        active.organization_id = Set(owner);
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.address, input.address);
        assign(&mut active.contractor_name, input.contractor_name);
        assign(&mut active.camera_url, input.camera_url);
        assign(&mut active.start_date, input.start_date);
        assign(&mut active.status, input.status);
        assign(&mut active.overall_progress, input.overall_progress);
        assign(&mut active.current_ai_stage, input.current_ai_stage);
        assign(&mut active.ai_confidence, input.ai_confidence);
        assign(&mut active.detected_objects, input.detected_objects);
        let site = active.update(&txn).await?;
        if let Some(missions) = input.missions {
            replace_missions(&txn, site.id, missions).await?;
        }
        let view = site_view(&txn, site).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        find_site(&txn, scope, id).await?;
        SiteMission::delete_many()
            .filter(SiteMissionColumn::SiteId.eq(id))
            .exec(&txn)
            .await?;
        ConstructionSite::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Construction sites in one status.
pub async fn sites_by_status(db: &DatabaseConnection, scope: Scope, status: SiteStatus) -> Result<Vec<SiteView>> {
    let sites = ConstructionSite::find()
        .filter(scope.condition(SiteColumn::OrganizationId))
        .filter(SiteColumn::Status.eq(status))
        .order_by_asc(SiteColumn::Name)
        .all(db)
        .await?;
    site_views(db, sites).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;
    use serde_json::json;

    async fn create_mission(db: &DatabaseConnection, name: &str, days: i64) -> Result<MissionModel> {
        ConstructionMissions::create(
            db,
            Scope::All,
            MissionInput {
                stage_name: Some(name.into()),
                stage_type: Some(StageType::Fundament),
                deadline: Some(Utc::now() + Duration::days(days)),
                status: None,
                progress: Some(10.0),
            },
        )
        .await
    }

    fn site_input(name: &str, missions: Vec<Uuid>) -> SiteInput {
        SiteInput {
            name: Some(name.into()),
            address: Some("Mustaqillik ko'chasi 5".into()),
            contractor_name: Some("Farg'ona Qurilish".into()),
            camera_url: Some("rtsp://cam/site".into()),
            start_date: Some(Utc::now()),
            status: Some(SiteStatus::OnTrack),
            overall_progress: Some(35.0),
            current_ai_stage: Some(StageType::Karkas1),
            ai_confidence: Some(91.5),
            detected_objects: Some(json!({"workers": 12, "cranes": 1})),
            missions: Some(missions),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_mission_defaults_to_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let mission = create_mission(&db, "Poydevor", 10).await?;
        assert_eq!(mission.status, MissionStatus::Pending);

        let json = serde_json::to_value(&mission).unwrap();
        assert_eq!(json["stage_type"], "FUNDAMENT");
        assert_eq!(json["status"], "PENDING");
        Ok(())
    }

    #[tokio::test]
    async fn test_site_embeds_missions_by_deadline() -> Result<()> {
        let db = setup_test_db().await?;
        let late = create_mission(&db, "Tom", 30).await?;
        let early = create_mission(&db, "Kotlovan", 5).await?;

        let site = ConstructionSites::create(&db, Scope::All, site_input("Maktab", vec![late.id, early.id, late.id]))
            .await?;
        let names: Vec<_> = site.missions.iter().map(|m| m.stage_name.as_str()).collect();
        assert_eq!(names, ["Kotlovan", "Tom"]);

        let json = serde_json::to_value(&site).unwrap();
        assert_eq!(json["current_ai_stage"], "KARKAS_1");
        assert_eq!(json["detected_objects"]["workers"], 12);
        assert_eq!(json["missions"].as_array().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_missions_replaces_links() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_mission(&db, "Kotlovan", 5).await?;
        let second = create_mission(&db, "Karkas", 15).await?;
        let site = ConstructionSites::create(&db, Scope::All, site_input("Bog'cha", vec![first.id])).await?;

        let patch = SiteInput {
            missions: Some(vec![second.id]),
            ..Default::default()
        };
        let updated = ConstructionSites::update(&db, Scope::All, site.item.id, patch, WriteMode::Patch).await?;
        assert_eq!(updated.missions.len(), 1);
        assert_eq!(updated.missions[0].id, second.id);

        let untouched = SiteInput {
            status: Some(SiteStatus::Warning),
            ..Default::default()
        };
        let updated = ConstructionSites::update(&db, Scope::All, site.item.id, untouched, WriteMode::Patch).await?;
        assert_eq!(updated.missions.len(), 1);
        assert_eq!(updated.item.status, SiteStatus::Warning);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_mission_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = ConstructionSites::create(&db, Scope::All, site_input("X", vec![Uuid::new_v4()])).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("missions"));
        assert!(ConstructionSites::list(&db, Scope::All).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_mission_unlinks_it() -> Result<()> {
        let db = setup_test_db().await?;
        let mission = create_mission(&db, "Kotlovan", 5).await?;
        let site = ConstructionSites::create(&db, Scope::All, site_input("Shifoxona", vec![mission.id])).await?;

        ConstructionMissions::delete(&db, Scope::All, mission.id).await?;
        let site = ConstructionSites::retrieve(&db, Scope::All, site.item.id).await?;
        assert!(site.missions.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sites_by_status_respects_scope() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "andijan_admin").await?;
        let scope = Scope::Organization(org.item.id);
        ConstructionSites::create(&db, scope, site_input("Mine", vec![])).await?;
        ConstructionSites::create(&db, Scope::All, site_input("Other", vec![])).await?;

        let mine = sites_by_status(&db, scope, SiteStatus::OnTrack).await?;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].item.organization_id, Some(org.item.id));
        assert!(sites_by_status(&db, Scope::All, SiteStatus::Critical).await?.is_empty());
        Ok(())
    }
}
