//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Reconnect agreement API.

use utoipa::OpenApi;

use crate::handlers::{
    AgreementResponse, CreateAgreementRequest, HealthResponse, ReadyResponse, SignRequest,
    SignatureInput, SignatureView, StatusRequest, VerifyResponse,
};

/// Reconnect Agreement API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reconnect - Agreement API",
        version = "0.1.0",
        description = r#"
## Couple Agreement Lifecycle & Verification API

Reconnect lets two partners co-author a short textual agreement, sign it by
hand, and later prove that this exact wording with these exact signatures
existed at a specific time:

1. The author **creates** an agreement with their handwritten signature (`POST /agreements`)
2. The partner **signs** it (`PUT /agreements/{id}/sign`); the agreement completes and its integrity tag is **sealed**
3. A printable PDF with an embedded QR verification payload can be **issued** (`GET /agreements/{id}/document`)
4. Any holder of the ID or QR payload can **verify** authenticity later (`GET /agreements/{id}/verify`, `POST /verify`)

Verification recomputes the integrity tag from the currently stored fields,
so a record altered after sealing reports `HASH_MISMATCH`, distinguishable
from `NOT_FOUND` and `INCOMPLETE`.

Identity arrives from the surrounding product as gateway-injected headers
(`x-user-id`, `x-user-name`, `x-partner-id`, `x-partner-name`, `x-couple-id`).
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/reconnect-app/reconnect/blob/main/LICENSE"
        ),
        contact(
            name = "Reconnect Team",
            url = "https://github.com/reconnect-app/reconnect"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server"),
    ),
    tags(
        (name = "Agreements", description = "Create, read and transition couple agreements"),
        (name = "Verification", description = "Verify agreements by ID or decoded QR payload"),
        (name = "Documents", description = "Issue printable PDF artifacts"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::agreements::create_agreement_handler,
        crate::handlers::agreements::list_my_agreements_handler,
        crate::handlers::agreements::get_agreement_handler,
        crate::handlers::sign::sign_handler,
        crate::handlers::status::status_handler,
        crate::handlers::verify::verify_agreement_handler,
        crate::handlers::verify::verify_payload_handler,
        crate::handlers::document::document_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            AgreementResponse,
            CreateAgreementRequest,
            SignatureInput,
            SignatureView,
            SignRequest,
            StatusRequest,
            VerifyResponse,
        )
    )
)]
pub struct ApiDoc;
