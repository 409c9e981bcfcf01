//! Observability for the gate: Prometheus metrics definitions.

pub mod metrics;
