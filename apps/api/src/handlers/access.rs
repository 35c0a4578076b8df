use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;

use lattica_application::{
    GrantOutcome, GrantPermissionInput, RevokePermissionInput, UpdatePermissionInput,
};
use lattica_core::UserIdentity;
use lattica_domain::{ItemId, ItemType, PermissionMask, RequiredMask, UserId};

use crate::dto::{
    AccessibleItemResponse, AccessibleItemsQuery, BatchEffectiveMaskRequest,
    BatchEffectiveMaskResponse, EffectiveMaskRequest, EffectiveMaskResponse, GrantOutcomeResponse,
    GrantPermissionRequest, PermissionCheckRequest, PermissionCheckResponse,
    PermissionGrantResponse, RevokePermissionRequest, UpdatePermissionRequest, parse_item_ref,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<UserIdentity>,
    Json(payload): Json<GrantPermissionRequest>,
) -> ApiResult<(StatusCode, Json<GrantOutcomeResponse>)> {
    let item = parse_item_ref(payload.item_id, payload.item_type.as_str())?;
    let mask = PermissionMask::from_bits(payload.mask)?;

    let outcome = state
        .grant_engine
        .grant(
            &actor,
            GrantPermissionInput {
                target_user_id: UserId::from_uuid(payload.target_user_id),
                item,
                mask,
            },
        )
        .await?;

    let status = match &outcome {
        GrantOutcome::Stored(_) => StatusCode::CREATED,
        GrantOutcome::AlreadyCovered { .. } => StatusCode::OK,
    };

    Ok((status, Json(GrantOutcomeResponse::from(outcome))))
}

pub async fn update_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<UserIdentity>,
    Json(payload): Json<UpdatePermissionRequest>,
) -> ApiResult<Json<PermissionGrantResponse>> {
    let item = parse_item_ref(payload.item_id, payload.item_type.as_str())?;
    let new_mask = PermissionMask::from_bits(payload.new_mask)?;

    let updated = state
        .grant_engine
        .update(
            &actor,
            UpdatePermissionInput {
                target_user_id: UserId::from_uuid(payload.target_user_id),
                item,
                new_mask,
            },
        )
        .await?;

    Ok(Json(PermissionGrantResponse::from(updated)))
}

pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<UserIdentity>,
    Json(payload): Json<RevokePermissionRequest>,
) -> ApiResult<StatusCode> {
    let item = parse_item_ref(payload.item_id, payload.item_type.as_str())?;

    state
        .grant_engine
        .revoke(
            &actor,
            RevokePermissionInput {
                target_user_id: UserId::from_uuid(payload.target_user_id),
                item,
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<UserIdentity>,
    Json(payload): Json<PermissionCheckRequest>,
) -> ApiResult<Json<PermissionCheckResponse>> {
    let item = parse_item_ref(payload.item_id, payload.item_type.as_str())?;
    let required = RequiredMask::from_bits(payload.required_mask)?;

    let allowed = state
        .authorization_gate
        .has_permission(
            actor.tenant_id(),
            UserId::from_uuid(payload.user_id),
            item,
            required,
        )
        .await?;

    Ok(Json(PermissionCheckResponse { allowed }))
}

pub async fn effective_mask_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<UserIdentity>,
    Json(payload): Json<EffectiveMaskRequest>,
) -> ApiResult<Json<EffectiveMaskResponse>> {
    let item = parse_item_ref(payload.item_id, payload.item_type.as_str())?;

    let mask = state
        .authorization_gate
        .effective_mask(actor.tenant_id(), UserId::from_uuid(payload.user_id), item)
        .await?;

    Ok(Json(EffectiveMaskResponse { mask: mask.bits() }))
}

pub async fn batch_effective_masks_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<UserIdentity>,
    Json(payload): Json<BatchEffectiveMaskRequest>,
) -> ApiResult<Json<BatchEffectiveMaskResponse>> {
    let item_type = ItemType::from_str(payload.item_type.as_str())?;
    let item_ids: Vec<ItemId> = payload
        .item_ids
        .iter()
        .map(|item_id| ItemId::from_uuid(*item_id))
        .collect();

    let masks = state
        .authorization_gate
        .effective_masks(
            actor.tenant_id(),
            UserId::from_uuid(payload.user_id),
            item_type,
            &item_ids,
        )
        .await?;

    Ok(Json(BatchEffectiveMaskResponse {
        masks: masks
            .into_iter()
            .map(|(item_id, mask)| (item_id.to_string(), mask.bits()))
            .collect(),
    }))
}

pub async fn accessible_items_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<UserIdentity>,
    Query(query): Query<AccessibleItemsQuery>,
) -> ApiResult<Json<Vec<AccessibleItemResponse>>> {
    let item_type = ItemType::from_str(query.item_type.as_str())?;

    let items = state
        .authorization_gate
        .accessible_items(
            actor.tenant_id(),
            UserId::from_uuid(query.user_id),
            item_type,
        )
        .await?
        .into_iter()
        .map(AccessibleItemResponse::from)
        .collect();

    Ok(Json(items))
}
