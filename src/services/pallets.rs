use crate::{
    db::DbPool,
    entities::{
        cold_room::Entity as ColdRoom,
        cold_room_box::{self, Entity as ColdRoomBox},
        pallet::{self, Entity as Pallet},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::bucket::BoxType,
    services::balance::unwrap_txn_err,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One box batch (or part of it) selected for consolidation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PalletBoxSelection {
    pub cold_room_box_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity_to_take: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConsolidatePalletRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub cold_room_id: Uuid,
    #[validate(length(min = 1))]
    pub selections: Vec<PalletBoxSelection>,
    /// Capacity override; defaults to the box format's standard capacity
    /// (288 for 4kg boxes, 120 for 10kg crates).
    pub boxes_per_pallet: Option<i32>,
}

/// Pallet plus its derived aggregates. `complete_pallets` counts full
/// multiples of the capacity; `remainder_boxes` is disclosed so callers
/// can see a non-full pallet at a glance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PalletSummary {
    pub id: Uuid,
    pub name: String,
    pub cold_room_id: Uuid,
    pub box_type: BoxType,
    pub boxes_per_pallet: i32,
    pub total_boxes: i32,
    pub complete_pallets: i32,
    pub remainder_boxes: i32,
    pub total_weight_kg: i32,
}

impl PalletSummary {
    fn from_model(model: &pallet::Model) -> Result<Self, ServiceError> {
        let box_type: BoxType = model.box_type.parse().map_err(|_| {
            ServiceError::IntegrityError(format!(
                "pallet {} has unknown box type '{}'",
                model.id, model.box_type
            ))
        })?;
        Ok(Self {
            id: model.id,
            name: model.name.clone(),
            cold_room_id: model.cold_room_id,
            box_type,
            boxes_per_pallet: model.boxes_per_pallet,
            total_boxes: model.total_boxes,
            complete_pallets: model.total_boxes / model.boxes_per_pallet,
            remainder_boxes: model.total_boxes % model.boxes_per_pallet,
            total_weight_kg: model.total_boxes * box_type.per_box_weight_kg(),
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DissolveResult {
    pub pallet_id: Uuid,
    pub boxes_returned: i32,
}

/// Consolidates box batches into pallets and reverses that consolidation.
///
/// Partial consumption of a batch splits it into two persisted rows: the
/// original keeps the residual quantity (still available), a new row
/// carries the taken quantity with pallet linkage. Dissolution merges
/// split parts back into an unpalletized sibling of the same identity.
pub struct PalletService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PalletService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name, selections = request.selections.len()))]
    pub async fn consolidate(
        &self,
        request: ConsolidatePalletRequest,
    ) -> Result<PalletSummary, ServiceError> {
        request.validate().map_err(|_| {
            ServiceError::ValidationError(
                "pallet name must be non-empty and at least one box selected".to_string(),
            )
        })?;
        if request.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "pallet name must be non-empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for sel in &request.selections {
            if sel.quantity_to_take < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity to take from box {} must be at least 1",
                    sel.cold_room_box_id
                )));
            }
            if !seen.insert(sel.cold_room_box_id) {
                return Err(ServiceError::ValidationError(format!(
                    "box {} selected more than once",
                    sel.cold_room_box_id
                )));
            }
        }

        if ColdRoom::find_by_id(request.cold_room_id)
            .one(self.db_pool.as_ref())
            .await?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "unknown cold room {}",
                request.cold_room_id
            )));
        }

        let db = self.db_pool.as_ref();
        let model = db
            .transaction::<_, pallet::Model, ServiceError>(move |txn| {
                Box::pin(async move { consolidate_in_txn(txn, request).await })
            })
            .await
            .map_err(unwrap_txn_err)?;

        let summary = PalletSummary::from_model(&model)?;

        if let Err(e) = self
            .event_sender
            .send(Event::PalletCreated {
                pallet_id: summary.id,
                cold_room_id: summary.cold_room_id,
                total_boxes: summary.total_boxes,
            })
            .await
        {
            warn!(pallet_id = %summary.id, error = %e, "event send failed for created pallet");
        }

        info!(
            pallet_id = %summary.id,
            total_boxes = summary.total_boxes,
            complete_pallets = summary.complete_pallets,
            remainder = summary.remainder_boxes,
            "pallet consolidated"
        );
        Ok(summary)
    }

    /// Dissolves a pallet, returning every constituent box to the
    /// available pool exactly once. A returned-quantity mismatch against
    /// the pallet's recorded total aborts before anything is deleted.
    #[instrument(skip(self))]
    pub async fn dissolve(&self, pallet_id: Uuid) -> Result<DissolveResult, ServiceError> {
        let db = self.db_pool.as_ref();
        let boxes_returned = db
            .transaction::<_, i32, ServiceError>(move |txn| {
                Box::pin(async move { dissolve_in_txn(txn, pallet_id).await })
            })
            .await
            .map_err(unwrap_txn_err)?;

        if let Err(e) = self
            .event_sender
            .send(Event::PalletDissolved {
                pallet_id,
                boxes_returned,
            })
            .await
        {
            warn!(%pallet_id, error = %e, "event send failed for dissolved pallet");
        }

        info!(%pallet_id, boxes_returned, "pallet dissolved");
        Ok(DissolveResult {
            pallet_id,
            boxes_returned,
        })
    }

    pub async fn get(&self, pallet_id: Uuid) -> Result<PalletSummary, ServiceError> {
        let model = Pallet::find_by_id(pallet_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("pallet {} not found", pallet_id)))?;
        PalletSummary::from_model(&model)
    }

    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<PalletSummary>, u64), ServiceError> {
        let paginator = Pallet::find()
            .order_by_desc(pallet::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), limit.max(1));
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.saturating_sub(1)).await?;
        let mut summaries = Vec::with_capacity(models.len());
        for model in &models {
            summaries.push(PalletSummary::from_model(model)?);
        }
        Ok((summaries, total))
    }

    /// Lists box batches in a cold room, optionally only those still
    /// available for consolidation.
    pub async fn list_boxes(
        &self,
        cold_room_id: Uuid,
        only_available: bool,
    ) -> Result<Vec<cold_room_box::Model>, ServiceError> {
        let mut query =
            ColdRoomBox::find().filter(cold_room_box::Column::ColdRoomId.eq(cold_room_id));
        if only_available {
            query = query.filter(cold_room_box::Column::IsInPallet.eq(false));
        }
        Ok(query
            .order_by_asc(cold_room_box::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await?)
    }
}

async fn consolidate_in_txn<C: ConnectionTrait>(
    txn: &C,
    request: ConsolidatePalletRequest,
) -> Result<pallet::Model, ServiceError> {
    let mut boxes = Vec::with_capacity(request.selections.len());
    for sel in &request.selections {
        let b = ColdRoomBox::find_by_id(sel.cold_room_box_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("cold-room box {} not found", sel.cold_room_box_id))
            })?;
        if b.cold_room_id != request.cold_room_id {
            return Err(ServiceError::ValidationError(format!(
                "box {} is not in cold room {}",
                b.id, request.cold_room_id
            )));
        }
        // A box already claimed by another pallet has no available
        // quantity left; the residual row of a previous split stays
        // unpalletized, so it shows up here as its own box.
        if b.is_in_pallet {
            return Err(ServiceError::ValidationError(format!(
                "box {} is already in a pallet",
                b.id
            )));
        }
        if sel.quantity_to_take > b.quantity {
            return Err(ServiceError::ValidationError(format!(
                "cannot take {} boxes from batch {} holding {}",
                sel.quantity_to_take, b.id, b.quantity
            )));
        }
        boxes.push((b, sel.quantity_to_take));
    }

    let box_type: BoxType = boxes[0].0.box_type.parse().map_err(|_| {
        ServiceError::IntegrityError(format!(
            "box {} has unknown box type '{}'",
            boxes[0].0.id, boxes[0].0.box_type
        ))
    })?;
    if boxes.iter().any(|(b, _)| b.box_type != box_type.as_str()) {
        return Err(ServiceError::ValidationError(
            "all boxes on one pallet must share the same box format".to_string(),
        ));
    }

    let boxes_per_pallet = request
        .boxes_per_pallet
        .unwrap_or_else(|| box_type.default_boxes_per_pallet());
    if boxes_per_pallet < 1 {
        return Err(ServiceError::ValidationError(
            "boxes per pallet must be at least 1".to_string(),
        ));
    }

    let total_boxes: i32 = boxes.iter().map(|(_, take)| take).sum();
    let now = Utc::now();
    let pallet_row = pallet::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(request.name.trim().to_string()),
        cold_room_id: Set(request.cold_room_id),
        box_type: Set(box_type.as_str().to_string()),
        boxes_per_pallet: Set(boxes_per_pallet),
        total_boxes: Set(total_boxes),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = pallet_row.insert(txn).await?;

    for (b, take) in boxes {
        if take == b.quantity {
            let mut active: cold_room_box::ActiveModel = b.into();
            active.is_in_pallet = Set(true);
            active.pallet_id = Set(Some(created.id));
            active.updated_at = Set(now);
            active.update(txn).await?;
        } else {
            // Split: residual stays on the original row, the taken part
            // becomes a new pallet-linked row with the same identity.
            let residual = b.quantity - take;
            if residual < 1 || residual + take != b.quantity {
                return Err(ServiceError::IntegrityError(format!(
                    "split of box {} does not conserve quantity ({} + {} != {})",
                    b.id, residual, take, b.quantity
                )));
            }
            let part = cold_room_box::ActiveModel {
                id: Set(Uuid::new_v4()),
                variety: Set(b.variety.clone()),
                box_type: Set(b.box_type.clone()),
                grade: Set(b.grade.clone()),
                size: Set(b.size.clone()),
                quantity: Set(take),
                cold_room_id: Set(b.cold_room_id),
                supplier_name: Set(b.supplier_name.clone()),
                source_counting_record_id: Set(b.source_counting_record_id),
                is_in_pallet: Set(true),
                pallet_id: Set(Some(created.id)),
                created_at: Set(now),
                updated_at: Set(now),
            };
            part.insert(txn).await?;

            let mut active: cold_room_box::ActiveModel = b.into();
            active.quantity = Set(residual);
            active.updated_at = Set(now);
            active.update(txn).await?;
        }
    }

    Ok(created)
}

async fn dissolve_in_txn<C: ConnectionTrait>(
    txn: &C,
    pallet_id: Uuid,
) -> Result<i32, ServiceError> {
    let pallet = Pallet::find_by_id(pallet_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("pallet {} not found", pallet_id)))?;

    let linked = ColdRoomBox::find()
        .filter(cold_room_box::Column::PalletId.eq(pallet_id))
        .all(txn)
        .await?;

    let boxes_returned: i32 = linked.iter().map(|b| b.quantity).sum();
    if boxes_returned != pallet.total_boxes {
        // Data-integrity failure: stop before touching any row.
        return Err(ServiceError::IntegrityError(format!(
            "pallet {} dissolution would return {} boxes, expected {}",
            pallet_id, boxes_returned, pallet.total_boxes
        )));
    }

    let now = Utc::now();
    for b in linked {
        // Merge back into an unpalletized sibling of the same identity
        // when one exists, instead of leaving fragmented duplicate rows.
        let sibling = ColdRoomBox::find()
            .filter(cold_room_box::Column::Id.ne(b.id))
            .filter(cold_room_box::Column::IsInPallet.eq(false))
            .filter(cold_room_box::Column::ColdRoomId.eq(b.cold_room_id))
            .filter(
                cold_room_box::Column::SourceCountingRecordId.eq(b.source_counting_record_id),
            )
            .filter(cold_room_box::Column::Variety.eq(b.variety.clone()))
            .filter(cold_room_box::Column::BoxType.eq(b.box_type.clone()))
            .filter(cold_room_box::Column::Grade.eq(b.grade.clone()))
            .filter(cold_room_box::Column::Size.eq(b.size.clone()))
            .one(txn)
            .await?;

        match sibling {
            Some(s) => {
                let merged = s.quantity + b.quantity;
                let mut active: cold_room_box::ActiveModel = s.into();
                active.quantity = Set(merged);
                active.updated_at = Set(now);
                active.update(txn).await?;
                b.delete(txn).await?;
            }
            None => {
                let mut active: cold_room_box::ActiveModel = b.into();
                active.is_in_pallet = Set(false);
                active.pallet_id = Set(None);
                active.updated_at = Set(now);
                active.update(txn).await?;
            }
        }
    }

    pallet.delete(txn).await?;
    Ok(boxes_returned)
}
