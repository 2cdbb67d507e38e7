//! Utility network nodes: electricity, water and gas distribution points.

use super::geo::{self, Located, Point, check_point};
use super::organization;
use super::resource::Resource;
use super::tenant::Scope;
use super::validation::{Checker, REQUIRED, WriteMode, assign};
use crate::entities::utility_node::{NodeStatus, UtilityType};
use crate::entities::{UtilityNode, UtilityNodeColumn, UtilityNodeModel, utility_node};
use crate::errors::{Error, Result};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::Deserialize;

/// Utility node write payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UtilityNodeInput {
    /// Owning organization id
    pub organization: Option<Uuid>,
    /// Display name
    pub name: Option<String>,
    /// Utility type
    #[serde(rename = "type")]
    pub kind: Option<UtilityType>,
    /// Neighbourhood (MFY) name
    pub mfy: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Position as `{lat, lng}`
    pub location: Option<Point>,
    /// Current status
    pub status: Option<NodeStatus>,
    /// Load percentage
    pub load: Option<f64>,
    /// Rated capacity, free text
    pub capacity: Option<String>,
    /// Open maintenance tickets
    pub active_tickets: Option<i32>,
}

impl UtilityNodeInput {
    fn validate(&self, mode: WriteMode) -> Result<()> {
        let mut checker = Checker::new(mode);
        checker.text("name", self.name.as_ref());
        checker.required("type", self.kind.as_ref());
        checker.text("mfy", self.mfy.as_ref());
        checker.text("address", self.address.as_ref());
        check_point(&mut checker, "location", self.location.as_ref());
        checker.required("status", self.status.as_ref());
        checker.required("load", self.load.as_ref());
        checker.float_range("load", self.load, 0.0, f64::MAX);
        checker.text("capacity", self.capacity.as_ref());
        checker.required("active_tickets", self.active_tickets.as_ref());
        checker.int_range("active_tickets", self.active_tickets, 0, i32::MAX);
        checker.finish()
    }
}

async fn find_node<C: ConnectionTrait>(db: &C, scope: Scope, id: Uuid) -> Result<UtilityNodeModel> {
    let node = UtilityNode::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("UtilityNode", id))?;
    scope.ensure(node.organization_id)?;
    Ok(node)
}

/// Utility node resource
pub struct UtilityNodes;

impl Resource for UtilityNodes {
    const NAME: &'static str = "utility-nodes";
    type Input = UtilityNodeInput;
    type View = Located<UtilityNodeModel>;

    async fn list(db: &DatabaseConnection, scope: Scope) -> Result<Vec<Self::View>> {
        let nodes = UtilityNode::find()
            .filter(scope.condition(UtilityNodeColumn::OrganizationId))
            .order_by_asc(UtilityNodeColumn::Name)
            .all(db)
            .await?;
        geo::attach_locations(db, nodes, |n| n.location_id).await
    }

    async fn retrieve(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<Self::View> {
        let node = find_node(db, scope, id).await?;
        let location_id = node.location_id;
        geo::attach_location(db, node, location_id).await
    }

    async fn create(db: &DatabaseConnection, scope: Scope, input: UtilityNodeInput) -> Result<Self::View> {
        input.validate(WriteMode::Create)?;
        let (
            Some(name),
            Some(kind),
            Some(mfy),
            Some(address),
            Some(location),
            Some(status),
            Some(load),
            Some(capacity),
            Some(active_tickets),
        ) = (
            input.name,
            input.kind,
            input.mfy,
            input.address,
            input.location,
            input.status,
            input.load,
            input.capacity,
            input.active_tickets,
        )
        else {
            return Err(Error::field("name", REQUIRED));
        };
        let txn = db.begin().await?;
        let owner = organization::owner_for_create(&txn, scope, input.organization).await?;
        let location = geo::insert_coordinate(&txn, location).await?;
        let node = utility_node::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(owner),
            name: Set(name.trim().to_string()),
            kind: Set(kind),
            mfy: Set(mfy),
            address: Set(address),
            location_id: Set(location.id),
            status: Set(status),
            load: Set(load),
            capacity: Set(capacity),
            active_tickets: Set(active_tickets),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(Located {
            item: node,
            location: Some(location),
        })
    }

    async fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: UtilityNodeInput,
        mode: WriteMode,
    ) -> Result<Self::View> {
        input.validate(mode)?;
        let txn = db.begin().await?;
        let existing = find_node(&txn, scope, id).await?;
        let owner =
            organization::owner_for_update(&txn, scope, existing.organization_id, input.organization).await?;
        if let Some(location) = input.location {
            geo::move_coordinate(&txn, existing.location_id, location).await?;
        }
        let location_id = existing.location_id;
        let mut active: utility_node::ActiveModel = existing.into();
        active.organization_id = Set(owner);
        assign(&mut active.name, input.name.map(|n| n.trim().to_string()));
        assign(&mut active.kind, input.kind);
        assign(&mut active.mfy, input.mfy);
        assign(&mut active.address, input.address);
        assign(&mut active.status, input.status);
        assign(&mut active.load, input.load);
        assign(&mut active.capacity, input.capacity);
        assign(&mut active.active_tickets, input.active_tickets);
        let node = active.update(&txn).await?;
        let view = geo::attach_location(&txn, node, location_id).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn delete(db: &DatabaseConnection, scope: Scope, id: Uuid) -> Result<()> {
        let txn = db.begin().await?;
        let node = find_node(&txn, scope, id).await?;
        UtilityNode::delete_by_id(id).exec(&txn).await?;
        geo::delete_coordinates(&txn, [node.location_id]).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Nodes of one utility type.
pub async fn nodes_by_type(
    db: &DatabaseConnection,
    scope: Scope,
    kind: UtilityType,
) -> Result<Vec<Located<UtilityNodeModel>>> {
    let nodes = UtilityNode::find()
        .filter(scope.condition(UtilityNodeColumn::OrganizationId))
        .filter(UtilityNodeColumn::Kind.eq(kind))
        .order_by_asc(UtilityNodeColumn::Name)
        .all(db)
        .await?;
    geo::attach_locations(db, nodes, |n| n.location_id).await
}

/// Nodes in one status.
pub async fn nodes_by_status(
    db: &DatabaseConnection,
    scope: Scope,
    status: NodeStatus,
) -> Result<Vec<Located<UtilityNodeModel>>> {
    let nodes = UtilityNode::find()
        .filter(scope.condition(UtilityNodeColumn::OrganizationId))
        .filter(UtilityNodeColumn::Status.eq(status))
        .order_by_asc(UtilityNodeColumn::Name)
        .all(db)
        .await?;
    geo::attach_locations(db, nodes, |n| n.location_id).await
}
