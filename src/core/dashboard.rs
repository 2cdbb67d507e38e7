//! Dashboard figures, cross-entity search and the organization picker.
//!
//! Everything here is read-only and tenant-scoped.

use super::geo::{self, Located};
use super::organization::{OrganizationView, Organizations};
use super::resource::Resource;
use super::tenant::Scope;
use crate::entities::truck::TruckStatus;
use crate::entities::{
    Organization, OrganizationColumn, Truck, TruckColumn, TruckModel, WasteBin, WasteBinColumn,
    WasteBinModel,
};
use crate::errors::Result;
use sea_orm::{DatabaseConnection, PaginatorTrait, QueryOrder, prelude::*};
use serde::Serialize;
use tracing::debug;

/// Waste collection summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    /// All visible waste bins
    pub total_bins: u64,
    /// Bins that are not full
    pub active_bins: u64,
    /// All visible trucks
    pub total_trucks: u64,
    /// Trucks currently busy
    pub busy_trucks: u64,
    /// Share of full bins in percent, 0 without bins
    pub fill_rate: f64,
}

/// Counts bins and trucks visible in `scope`.
pub async fn stats(db: &DatabaseConnection, scope: Scope) -> Result<DashboardStats> {
    let bins = WasteBin::find().filter(scope.condition(WasteBinColumn::OrganizationId));
    let trucks = Truck::find().filter(scope.condition(TruckColumn::OrganizationId));

    let total_bins = bins.clone().count(db).await?;
    let active_bins = bins.filter(WasteBinColumn::IsFull.eq(false)).count(db).await?;
    let total_trucks = trucks.clone().count(db).await?;
    let busy_trucks = trucks
        .filter(TruckColumn::Status.eq(TruckStatus::Busy))
        .count(db)
        .await?;

    #[allow(clippy::cast_precision_loss)]
    let fill_rate = if total_bins == 0 {
        0.0
    } else {
        (total_bins - active_bins) as f64 / total_bins as f64 * 100.0
    };

    Ok(DashboardStats {
        total_bins,
        active_bins,
        total_trucks,
        busy_trucks,
        fill_rate,
    })
}

/// Which entities a search covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Organizations, bins and trucks
    Everything,
    /// Organizations by name
    Organization,
    /// Waste bins by address
    WasteBin,
    /// Trucks by driver name
    Truck,
    /// A type nothing matches
    Unknown,
}

impl SearchKind {
    /// Parses the `type` query parameter; empty means everything.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => Self::Everything,
            "organization" => Self::Organization,
            "waste-bin" => Self::WasteBin,
            "truck" => Self::Truck,
            _ => Self::Unknown,
        }
    }

    fn covers(self, kind: Self) -> bool {
        self == Self::Everything || self == kind
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchHit {
    /// Organization hit
    Organization(OrganizationView),
    /// Waste bin hit
    WasteBin(Located<WasteBinModel>),
    /// Truck hit
    Truck(Located<TruckModel>),
}

/// Search response body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    /// Search text as received
    pub query: String,
    /// `type` filter as received, empty for everything
    #[serde(rename = "type")]
    pub kind: String,
    /// Matches across organizations, bins and trucks
    pub results: Vec<SearchHit>,
}

fn matches(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Case-insensitive substring search over organization names, bin
/// addresses and truck driver names.
///
/// # Arguments
/// * `query` - Text to look for; empty matches everything
/// * `kind` - Raw `type` parameter, see [`SearchKind::parse`]
pub async fn search(db: &DatabaseConnection, scope: Scope, query: &str, kind: &str) -> Result<SearchResults> {
    let needle = query.to_lowercase();
    let wanted = SearchKind::parse(kind);
    let mut results = Vec::new();

    if wanted.covers(SearchKind::Organization) {
        let orgs = Organization::find()
            .filter(scope.condition(OrganizationColumn::Id))
            .order_by_asc(OrganizationColumn::Name)
            .all(db)
            .await?;
        for org in orgs.into_iter().filter(|o| matches(&o.name, &needle)) {
            results.push(SearchHit::Organization(super::organization::view(db, org).await?));
        }
    }

    if wanted.covers(SearchKind::WasteBin) {
        let bins: Vec<_> = WasteBin::find()
            .filter(scope.condition(WasteBinColumn::OrganizationId))
            .order_by_asc(WasteBinColumn::Address)
            .all(db)
            .await?
            .into_iter()
            .filter(|b| matches(&b.address, &needle))
            .collect();
        let located = geo::attach_locations(db, bins, |b| b.location_id).await?;
        results.extend(located.into_iter().map(SearchHit::WasteBin));
    }

    if wanted.covers(SearchKind::Truck) {
        let trucks: Vec<_> = Truck::find()
            .filter(scope.condition(TruckColumn::OrganizationId))
            .order_by_asc(TruckColumn::DriverName)
            .all(db)
            .await?
            .into_iter()
            .filter(|t| matches(&t.driver_name, &needle))
            .collect();
        let located = geo::attach_locations(db, trucks, |t| t.location_id).await?;
        results.extend(located.into_iter().map(SearchHit::Truck));
    }

    debug!(%query, %kind, hits = results.len(), "Search finished");
    Ok(SearchResults {
        query: query.to_string(),
        kind: kind.to_string(),
        results,
    })
}

/// The caller's own organization, or every organization for an
/// unrestricted session.
pub async fn user_organizations(db: &DatabaseConnection, scope: Scope) -> Result<Vec<OrganizationView>> {
    Organizations::list(db, scope).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::validation::WriteMode;
    use crate::core::waste::{TruckInput, Trucks, WasteBinInput, WasteBins};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_stats_without_bins() -> Result<()> {
        let db = setup_test_db().await?;
        let stats = stats(&db, Scope::All).await?;
        assert_eq!(stats.total_bins, 0);
        assert_eq!(stats.fill_rate, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_are_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let mine = create_test_organization(&db, "fergana_admin").await?;
        let other = create_test_organization(&db, "kokand_admin").await?;

        let full = create_test_waste_bin(&db, mine.item.id, "Mustaqillik 1").await?;
        create_test_waste_bin(&db, mine.item.id, "Mustaqillik 2").await?;
        create_test_waste_bin(&db, mine.item.id, "Mustaqillik 3").await?;
        create_test_waste_bin(&db, mine.item.id, "Mustaqillik 4").await?;
        create_test_waste_bin(&db, other.item.id, "Kokand 1").await?;
        let patch = WasteBinInput {
            fill_level: Some(95),
            ..Default::default()
        };
        WasteBins::update(&db, Scope::All, full.item.id, patch, WriteMode::Patch).await?;

        let truck = create_test_truck(&db, mine.item.id, "driver1").await?;
        create_test_truck(&db, other.item.id, "driver2").await?;
        let busy = TruckInput {
            status: Some(TruckStatus::Busy),
            ..Default::default()
        };
        Trucks::update(&db, Scope::All, truck.item.id, busy, WriteMode::Patch).await?;

        let stats = stats(&db, Scope::Organization(mine.item.id)).await?;
        assert_eq!(stats.total_bins, 4);
        assert_eq!(stats.active_bins, 3);
        assert_eq!(stats.total_trucks, 1);
        assert_eq!(stats.busy_trucks, 1);
        assert_eq!(stats.fill_rate, 25.0);

        let all = super::stats(&db, Scope::All).await?;
        assert_eq!(all.total_bins, 5);
        assert_eq!(all.total_trucks, 2);
        Ok(())
    }

    #[test]
    fn test_search_kind_parse() {
        assert_eq!(SearchKind::parse(""), SearchKind::Everything);
        assert_eq!(SearchKind::parse("waste-bin"), SearchKind::WasteBin);
        assert_eq!(SearchKind::parse("bins"), SearchKind::Unknown);
        assert!(!SearchKind::Unknown.covers(SearchKind::Truck));
        assert!(SearchKind::Everything.covers(SearchKind::Truck));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_typed() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        create_test_waste_bin(&db, org.item.id, "Navoiy ko'chasi 4").await?;
        create_test_waste_bin(&db, org.item.id, "Mustaqillik 2").await?;

        let found = search(&db, Scope::All, "NAVOIY", "waste-bin").await?;
        assert_eq!(found.results.len(), 1);
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["query"], "NAVOIY");
        assert_eq!(json["type"], "waste-bin");
        assert_eq!(json["results"][0]["address"], "Navoiy ko'chasi 4");

        let none = search(&db, Scope::All, "navoiy", "truck").await?;
        assert!(none.results.is_empty());
        let unknown = search(&db, Scope::All, "", "bins").await?;
        assert!(unknown.results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_search_respects_scope() -> Result<()> {
        let db = setup_test_db().await?;
        let mine = create_test_organization(&db, "fergana_admin").await?;
        let other = create_test_organization(&db, "kokand_admin").await?;
        create_test_waste_bin(&db, mine.item.id, "Bozor 1").await?;
        create_test_waste_bin(&db, other.item.id, "Bozor 2").await?;

        let scoped = search(&db, Scope::Organization(mine.item.id), "bozor", "").await?;
        assert_eq!(scoped.results.len(), 1);
        let everything = search(&db, Scope::All, "", "").await?;
        // two organizations and two bins
        assert_eq!(everything.results.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_organizations() -> Result<()> {
        let db = setup_test_db().await?;
        let mine = create_test_organization(&db, "fergana_admin").await?;
        create_test_organization(&db, "kokand_admin").await?;

        let own = user_organizations(&db, Scope::Organization(mine.item.id)).await?;
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].item.id, mine.item.id);
        assert_eq!(user_organizations(&db, Scope::All).await?.len(), 2);
        Ok(())
    }
}
