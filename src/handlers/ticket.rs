use crate::error::AppError;
use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::TicketService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "ticket",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ticket types of the active event with remaining quota", body = TicketsOverview),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_tickets(service: web::Data<TicketService>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_quotas(user_id).await {
        Ok(overview) => Ok(HttpResponse::Ok().json(ApiResponse::success(overview))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/checkout/sessions",
    tag = "ticket",
    request_body = CreateCheckoutRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutSessionResponse),
        (status = 400, description = "Nothing selected"),
        (status = 409, description = "No active event or ticket limit exceeded"),
        (status = 502, description = "Payment provider unavailable")
    )
)]
/// Opens a hosted checkout session. The client redirects to `url`.
pub async fn create_checkout(
    service: web::Data<TicketService>,
    req: HttpRequest,
    body: web::Json<CreateCheckoutRequest>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.create_checkout(user_id, body.into_inner()).await {
        Ok(session) => Ok(HttpResponse::Ok().json(ApiResponse::success(session))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/checkout/success",
    tag = "ticket",
    params(
        ("session_id" = String, Query, description = "Checkout session id returned by the payment provider")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Whether payment was confirmed and how many orders completed", body = FinalizeCheckoutResponse),
        (status = 400, description = "Missing session id")
    )
)]
/// Return URL after payment. Completes the session's orders when paid.
pub async fn checkout_success(
    service: web::Data<TicketService>,
    query: web::Query<FinalizeCheckoutQuery>,
) -> Result<HttpResponse> {
    let Some(session_id) = query.into_inner().session_id.filter(|s| !s.trim().is_empty()) else {
        return Ok(AppError::ValidationError("Missing session_id".to_string()).error_response());
    };
    match service.finalize_checkout(&session_id).await {
        Ok(result) if result.confirmed => Ok(HttpResponse::Ok().json(
            ApiResponse::success_with_message(result, "Payment successful! Your tickets are confirmed."),
        )),
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            result,
            "Payment not yet confirmed. Please check back shortly.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/my-tickets",
    tag = "ticket",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Owned tickets and pending transfers", body = MyTicketsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_tickets(service: web::Data<TicketService>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.my_tickets(user_id).await {
        Ok(tickets) => Ok(HttpResponse::Ok().json(ApiResponse::success(tickets))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn ticket_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/tickets", web::get().to(list_tickets))
        .route("/checkout/sessions", web::post().to(create_checkout))
        .route("/checkout/success", web::get().to(checkout_success))
        .route("/my-tickets", web::get().to(my_tickets));
}
