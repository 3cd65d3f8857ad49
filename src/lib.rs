//! Browsable API specs from a repository, plus "try it now" mock responses synthesized
//! from the examples the specs declare.

pub mod config;
pub mod document;
pub mod loader;
pub mod mock;
pub mod openapi;
pub mod repository;
pub mod resolve;
pub mod service;
pub mod web;
