//! Order API Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shared::order::{
    Actor, CreateOrderRequest, CreateOrderResponse, CustomerActionRequest, DeliveryOutcomeRequest,
    Order, OrderListQuery, UpdateStatusRequest,
};
use shared::payment::ChargePayload;
use shared::{ApiResponse, AppError, AppResult, ErrorCode};
use validator::Validate;

use crate::api::optional_json;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::CustomerAction;

/// Create an order and start its payment.
///
/// A failed charge creation keeps the order in `draft`; the customer can
/// retry through `/pay` or let the draft sweeper cancel it.
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(request): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateOrderResponse>>)> {
    let method = request.payment_method;
    if !state.payments().is_available(method) {
        return Err(AppError::with_message(
            ErrorCode::PaymentInvalidMethod,
            format!("Payment method {method} is not available"),
        ));
    }

    let order = state.orders.create_order(&user.id, request)?;
    let payment = match state.payments().create_charge(&order).await {
        Ok(payment) => payment,
        Err(e) => {
            tracing::warn!(
                order_id = %order.id,
                provider = %method,
                error = %e,
                "Charge creation failed, order kept as draft"
            );
            ChargePayload::default()
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateOrderResponse { order, payment })),
    ))
}

/// Own orders; admins see every order, optionally filtered by status
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = if user.is_admin() {
        state.orders.list_orders(query.status)?
    } else {
        let mut own = state.orders.list_orders_for_owner(&user.id)?;
        if let Some(status) = query.status {
            own.retain(|o| o.status == status);
        }
        own
    };
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = if user.is_admin() {
        state.orders.get_order(&id)?
    } else {
        state.orders.get_owned_order(&id, &user.id)?
    };
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.ensure_admin()?;
    let order = state
        .orders
        .update_status(&id, request.status, request.note, &user.id)?;
    Ok(Json(ApiResponse::success(order)))
}

// ========== Customer actions ==========

fn run_customer_action(
    state: &ServerState,
    user: &CurrentUser,
    id: &str,
    action: CustomerAction,
    body: &Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    let request: CustomerActionRequest = optional_json(body)?;
    request
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let note = match action {
        CustomerAction::RequestReturn => request.reason.or(request.note),
        _ => request.note,
    };
    let order = state.orders.customer_action(id, &user.id, action, note)?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    run_customer_action(&state, &user, &id, CustomerAction::Cancel, &body)
}

pub async fn confirm_delivery(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    run_customer_action(&state, &user, &id, CustomerAction::ConfirmDelivery, &body)
}

pub async fn confirm_satisfaction(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    run_customer_action(&state, &user, &id, CustomerAction::ConfirmSatisfaction, &body)
}

pub async fn request_refund(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    run_customer_action(&state, &user, &id, CustomerAction::RequestRefund, &body)
}

pub async fn request_return(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    run_customer_action(&state, &user, &id, CustomerAction::RequestReturn, &body)
}

pub async fn report_delivery_failure(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Order>>> {
    run_customer_action(&state, &user, &id, CustomerAction::ReportDeliveryFailure, &body)
}

// ========== Courier ==========

pub async fn record_delivery(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<DeliveryOutcomeRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.ensure_delivery_staff()?;
    let actor = if user.is_admin() { Actor::Admin } else { Actor::Courier };
    let order = state
        .orders
        .record_delivery_outcome(&id, request.outcome, actor, &user.id, request.note)?;
    Ok(Json(ApiResponse::success(order)))
}

// ========== Payment retry ==========

/// Re-create the provider charge for a `draft` online order
pub async fn pay(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<ChargePayload>>> {
    let order = state.orders.order_for_payment(&id, &user.id)?;
    let payment = state.payments().create_charge(&order).await.map_err(|e| {
        tracing::warn!(order_id = %order.id, provider = %order.payment_method, error = %e, "Charge creation failed");
        AppError::from(e)
    })?;
    Ok(Json(ApiResponse::success(payment)))
}
