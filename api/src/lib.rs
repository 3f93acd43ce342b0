// Module layout (Clean Architecture style)
// - bootstrap: configuration and wiring
// - domain: file records and the owner capability
// - application: ports, DTOs and the attachment resolver
// - infrastructure: DB/filesystem/S3/HTTP-fetch adapters
// - presentation: HTTP handlers and routing

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
