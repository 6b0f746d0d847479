pub mod drafts;
pub mod handlers;
pub mod response;

pub use handlers::health_check;
pub use response::{ApiError, ApiResponse, ApiResult};

use crate::service::Services;
use axum::{
    routing::{get, post, put},
    Router,
};

/// Full HTTP surface. Each service gets its own sub-router and state.
pub fn router(services: Services) -> Router {
    let client_routes = Router::new()
        .route(
            "/api/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route(
            "/api/clients/:id",
            get(handlers::get_client).put(handlers::update_client),
        )
        .route("/api/exports/clients", get(handlers::export_clients))
        .route("/api/imports/clients", post(handlers::import_clients))
        .with_state(services.clients);

    let invoice_routes = Router::new()
        .route(
            "/api/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(handlers::get_invoice).put(handlers::update_invoice),
        )
        .route("/api/invoices/:id/status", put(handlers::set_invoice_status))
        .with_state(services.invoices);

    let quotation_routes = Router::new()
        .route(
            "/api/quotations",
            get(handlers::list_quotations).post(handlers::create_quotation),
        )
        .route(
            "/api/quotations/:id",
            get(handlers::get_quotation).put(handlers::update_quotation),
        )
        .route(
            "/api/quotations/:id/status",
            put(handlers::set_quotation_status),
        )
        .route(
            "/api/quotations/:id/convert",
            post(handlers::convert_quotation),
        )
        .with_state(services.quotations);

    let delivery_routes = Router::new()
        .route("/api/delivery-orders", get(handlers::list_delivery_orders))
        .route("/api/delivery-orders/:id", get(handlers::get_delivery_order))
        .with_state(services.delivery_orders);

    let draft_routes = Router::new()
        .route("/api/delivery-drafts", post(drafts::open_draft))
        .route(
            "/api/delivery-drafts/:draft",
            get(drafts::get_draft).delete(drafts::close_draft),
        )
        .route(
            "/api/delivery-drafts/:draft/invoice",
            post(drafts::select_invoice),
        )
        .route("/api/delivery-drafts/:draft/next", post(drafts::next_step))
        .route("/api/delivery-drafts/:draft/back", post(drafts::previous_step))
        .route("/api/delivery-drafts/:draft/details", put(drafts::set_details))
        .route("/api/delivery-drafts/:draft/submit", post(drafts::submit_draft))
        .route(
            "/api/delivery-drafts/:draft/items/:item/packaging",
            put(drafts::set_packaging),
        )
        .route(
            "/api/delivery-drafts/:draft/items/:item/pieces",
            put(drafts::set_pieces),
        )
        .route(
            "/api/delivery-drafts/:draft/items/:item/cartons",
            post(drafts::add_carton),
        )
        .route(
            "/api/delivery-drafts/:draft/items/:item/cartons/:row",
            axum::routing::delete(drafts::remove_carton).patch(drafts::update_carton),
        )
        .with_state(services.drafts);

    let settings_routes = Router::new()
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .with_state(services.settings);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/lookups/currencies", get(handlers::list_currencies))
        .route("/api/lookups/countries", get(handlers::list_countries))
        .merge(client_routes)
        .merge(invoice_routes)
        .merge(quotation_routes)
        .merge(delivery_routes)
        .merge(draft_routes)
        .merge(settings_routes)
}
