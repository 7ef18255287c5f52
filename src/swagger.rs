use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{OrderStatus, TransferStatus};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::event::get_active_event,
        handlers::ticket::list_tickets,
        handlers::ticket::create_checkout,
        handlers::ticket::checkout_success,
        handlers::ticket::my_tickets,
        handlers::transfer::initiate_transfer,
        handlers::transfer::accept_transfer,
        handlers::transfer::reject_transfer,
        handlers::transfer::rescind_transfer,
        handlers::shift::shift_board,
        handlers::shift::signup,
        handlers::shift::cancel,
        handlers::admin::list_shifts,
        handlers::admin::create_shift,
        handlers::admin::update_shift,
        handlers::admin::delete_shift,
        handlers::admin::list_assignments,
        handlers::admin::remove_assignment,
        handlers::admin::activate_event,
    ),
    components(
        schemas(
            EventResponse,
            TicketQuota,
            TicketsOverview,
            CheckoutLine,
            CreateCheckoutRequest,
            CheckoutSessionResponse,
            FinalizeCheckoutResponse,
            OrderStatus,
            OrderResponse,
            MyTicketsResponse,
            TransferStatus,
            InitiateTransferRequest,
            TransferResponse,
            RoleColumn,
            ShiftSummary,
            GridCell,
            GridRow,
            ScheduleGrid,
            ShiftBoardResponse,
            ShiftAssignmentResponse,
            AdminListQuery,
            CreateShiftRequest,
            UpdateShiftRequest,
            AdminShiftResponse,
            AdminAssignmentResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "event", description = "Active event API"),
        (name = "ticket", description = "Ticket quota and checkout API"),
        (name = "transfer", description = "Ticket transfer API"),
        (name = "shift", description = "Volunteer shift signup API"),
        (name = "admin", description = "Shift administration API"),
    ),
    info(
        title = "Fieldday Backend API",
        version = "1.0.0",
        description = "Event ticketing and volunteer shift REST API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/events/active",
            "/checkout/sessions",
            "/my-tickets/{order_id}/transfer",
            "/transfers/{id}/rescind",
            "/shifts/{id}/signup",
            "/admin/events/{id}/activate",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
