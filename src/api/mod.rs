//! HTTP surface: telephony webhooks, dashboard REST API, realtime push,
//! health probes and the OpenAPI document

pub mod dashboard;
pub mod error;
pub mod health;
pub mod ivr;
pub mod openapi;
pub mod realtime;
