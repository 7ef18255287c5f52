use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::ShiftService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/shifts",
    tag = "shift",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Shift board for the active event, or null", body = ShiftBoardResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn shift_board(service: web::Data<ShiftService>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.shift_board(user_id).await {
        Ok(board) => Ok(HttpResponse::Ok().json(ApiResponse::success(board))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/shifts/{id}/signup",
    tag = "shift",
    params(
        ("id" = i32, Path, description = "Shift id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Signed up", body = ShiftAssignmentResponse),
        (status = 404, description = "Shift not in the active event"),
        (status = 409, description = "No ticket, shift cap reached, already signed up or shift full")
    )
)]
pub async fn signup(
    service: web::Data<ShiftService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.signup(user_id, path.into_inner()).await {
        Ok(assignment) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            assignment,
            "You have signed up for this shift.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/shifts/{id}/cancel",
    tag = "shift",
    params(
        ("id" = i32, Path, description = "Shift id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Signup cancelled"),
        (status = 404, description = "Shift not in the active event"),
        (status = 409, description = "Not signed up")
    )
)]
pub async fn cancel(
    service: web::Data<ShiftService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.cancel(user_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            (),
            "Your signup has been cancelled.",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn shift_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/shifts")
            .route("", web::get().to(shift_board))
            .route("/{id}/signup", web::post().to(signup))
            .route("/{id}/cancel", web::post().to(cancel)),
    );
}
