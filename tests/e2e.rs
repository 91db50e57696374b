//! End-to-end tests driving the assembled service and HTTP transport.

#[path = "e2e/helpers.rs"]
mod helpers;

#[path = "e2e/scenarios.rs"]
mod scenarios;

#[path = "e2e/properties.rs"]
mod properties;

#[path = "e2e/http_auth.rs"]
mod http_auth;
