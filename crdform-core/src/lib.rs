//! Crdform Core
//!
//! Core library for rendering Kubernetes custom resources as manifests from
//! declarative configuration

pub mod differ;
pub mod effect;
pub mod interpreter;
pub mod lifecycle;
pub mod manifest;
pub mod parser;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
