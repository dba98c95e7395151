//! Lead Intake API Library
//!
//! Receives leads from third-party webhooks (form builders, e-commerce
//! platforms, automation tools), maps arbitrary payloads to a canonical
//! contact, validates it and stores it per organization.
//!
//! # Modules
//!
//! - `api`: HTTP-facing handlers.
//! - `core`: Field mapping pipeline and shared models/errors.
//! - `data`: Database access.
//! - `integrations`: External service clients.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `fingerprint`: Payload-shape fingerprints for mapping caches.
//! - `handlers`: Shared state, health and mapping suggestion handlers.
//! - `heuristics`: Rule-based contact detection.
//! - `lead_storage`: Lead and lead-source persistence.
//! - `llm_mapper`: LLM-assisted field mapping client.
//! - `mapping_engine`: Manual → heuristic → LLM resolution.
//! - `models`: Core data models.
//! - `nested_path`: Dot-path lookup in JSON values.
//! - `validation`: Lead acceptance rules.
//! - `webhook_handler`: Inbound lead webhook.

pub mod api;
pub mod core;
pub mod data;
pub mod integrations;

pub mod config;
pub mod db;
pub mod errors;
pub mod fingerprint;
pub mod handlers;
pub mod heuristics;
pub mod lead_storage;
pub mod llm_mapper;
pub mod mapping_engine;
pub mod models;
pub mod nested_path;
pub mod validation;
pub mod webhook_handler;
