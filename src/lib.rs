// Module layout (Clean Architecture style)
// - bootstrap: configuration and application context
// - infrastructure: Appwrite/Postgres/S3/in-memory adapters
// - presentation: HTTP handlers, SSE and routing
// - application: ports, query building, space accounting and use cases
// - domain: core models

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
