use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::TransferService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/my-tickets/{order_id}/transfer",
    tag = "transfer",
    params(
        ("order_id" = i32, Path, description = "Completed order owned by the caller")
    ),
    request_body = InitiateTransferRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transfer created", body = TransferResponse),
        (status = 400, description = "Missing or malformed email"),
        (status = 404, description = "Ticket or recipient not found"),
        (status = 409, description = "Pending transfer exists, self transfer or recipient at limit")
    )
)]
pub async fn initiate_transfer(
    service: web::Data<TransferService>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<InitiateTransferRequest>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .initiate(user_id, path.into_inner(), body.into_inner())
        .await
    {
        Ok(transfer) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            transfer,
            "Transfer initiated.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/transfers/{id}/accept",
    tag = "transfer",
    params(
        ("id" = i32, Path, description = "Transfer id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ticket is now yours", body = TransferResponse),
        (status = 404, description = "No pending transfer addressed to you"),
        (status = 409, description = "You are at your limit for this ticket type")
    )
)]
pub async fn accept_transfer(
    service: web::Data<TransferService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.accept(user_id, path.into_inner()).await {
        Ok(transfer) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            transfer,
            "Ticket transfer accepted.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/transfers/{id}/reject",
    tag = "transfer",
    params(
        ("id" = i32, Path, description = "Transfer id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transfer rejected", body = TransferResponse),
        (status = 404, description = "No pending transfer addressed to you")
    )
)]
pub async fn reject_transfer(
    service: web::Data<TransferService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.reject(user_id, path.into_inner()).await {
        Ok(transfer) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            transfer,
            "Ticket transfer rejected.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/transfers/{id}/rescind",
    tag = "transfer",
    params(
        ("id" = i32, Path, description = "Transfer id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transfer withdrawn"),
        (status = 404, description = "No pending transfer sent by you")
    )
)]
pub async fn rescind_transfer(
    service: web::Data<TransferService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.rescind(user_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            (),
            "Ticket transfer rescinded.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn transfer_config(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/my-tickets/{order_id}/transfer",
        web::post().to(initiate_transfer),
    )
    .service(
        web::scope("/transfers")
            .route("/{id}/accept", web::post().to(accept_transfer))
            .route("/{id}/reject", web::post().to(reject_transfer))
            .route("/{id}/rescind", web::post().to(rescind_transfer)),
    );
}
