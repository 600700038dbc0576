use crate::api;
use crate::services::{contract_service, dashboard, expiration, invoice_service};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::login,
        api::contracts::create_contract,
        api::invoices::create_invoice,
        api::rooms::set_room_status,
        api::dashboard::get_dashboard,
        api::admin::run_expiration,
    ),
    components(
        schemas(
            api::error::ErrorBody,
            api::auth::LoginRequest,
            api::rooms::RoomStatusRequest,
            contract_service::CreateContractInput,
            contract_service::CreatedContract,
            invoice_service::CreateInvoiceInput,
            dashboard::DashboardSummary,
            dashboard::RoomCounts,
            expiration::ExpirationReport,
        )
    ),
    tags(
        (name = "dormkeeper", description = "Dormitory management API")
    )
)]
pub struct ApiDoc;
