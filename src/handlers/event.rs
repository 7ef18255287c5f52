use crate::models::*;
use crate::services::EventService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/events/active",
    tag = "event",
    responses(
        (status = 200, description = "The active event, or null when none is active", body = EventResponse)
    )
)]
pub async fn get_active_event(service: web::Data<EventService>) -> Result<HttpResponse> {
    match service.get_active_event().await {
        Ok(event) => Ok(HttpResponse::Ok().json(ApiResponse::success(event))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn event_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/events/active", web::get().to(get_active_event));
}
