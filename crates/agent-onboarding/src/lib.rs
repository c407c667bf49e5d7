//! Backend for the agent onboarding wizard: a ten-step, resumable
//! application flow with a reviewer-driven lifecycle.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
