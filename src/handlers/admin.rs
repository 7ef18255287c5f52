use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::{EventService, ShiftAdminService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/admin/shifts",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20, max 100)"),
        ("role_id" = Option<i32>, Query, description = "Only shifts of this role")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Shifts of the roles the caller manages", body = PaginatedResponse<AdminShiftResponse>),
        (status = 403, description = "Caller leads no role")
    )
)]
pub async fn list_shifts(
    service: web::Data<ShiftAdminService>,
    req: HttpRequest,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_shifts(user_id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/shifts",
    tag = "admin",
    request_body = CreateShiftRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Shift created", body = AdminShiftResponse),
        (status = 400, description = "End before start or capacity below 1"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Duplicate shift")
    )
)]
pub async fn create_shift(
    service: web::Data<ShiftAdminService>,
    req: HttpRequest,
    body: web::Json<CreateShiftRequest>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.create_shift(user_id, body.into_inner()).await {
        Ok(shift) => Ok(HttpResponse::Ok().json(ApiResponse::success(shift))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/shifts/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "Shift id")
    ),
    request_body = UpdateShiftRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Shift updated", body = AdminShiftResponse),
        (status = 404, description = "Shift not found"),
        (status = 409, description = "Duplicate shift or capacity below current signups")
    )
)]
pub async fn update_shift(
    service: web::Data<ShiftAdminService>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<UpdateShiftRequest>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .update_shift(user_id, path.into_inner(), body.into_inner())
        .await
    {
        Ok(shift) => Ok(HttpResponse::Ok().json(ApiResponse::success(shift))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/shifts/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "Shift id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Shift and its signups deleted"),
        (status = 404, description = "Shift not found")
    )
)]
pub async fn delete_shift(
    service: web::Data<ShiftAdminService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.delete_shift(user_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message((), "Shift deleted."))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/assignments",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20, max 100)"),
        ("role_id" = Option<i32>, Query, description = "Only signups for this role")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Signups for the roles the caller manages", body = PaginatedResponse<AdminAssignmentResponse>),
        (status = 403, description = "Caller leads no role")
    )
)]
pub async fn list_assignments(
    service: web::Data<ShiftAdminService>,
    req: HttpRequest,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_assignments(user_id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/assignments/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "Assignment id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Signup removed"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn remove_assignment(
    service: web::Data<ShiftAdminService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.remove_assignment(user_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message((), "Signup removed."))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/events/{id}/activate",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event is now the only active event", body = EventResponse),
        (status = 403, description = "Superusers only"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn activate_event(
    service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.activate_event(user_id, path.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(ApiResponse::success(event))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/shifts", web::get().to(list_shifts))
            .route("/shifts", web::post().to(create_shift))
            .route("/shifts/{id}", web::put().to(update_shift))
            .route("/shifts/{id}", web::delete().to(delete_shift))
            .route("/assignments", web::get().to(list_assignments))
            .route("/assignments/{id}", web::delete().to(remove_assignment))
            .route("/events/{id}/activate", web::post().to(activate_event)),
    );
}
