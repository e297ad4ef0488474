//! Core system components for mower operation
pub mod command;
pub mod error;
pub mod mapper;
pub mod motion;
pub mod platform;
pub mod resources;
pub mod sensors;
pub mod shared;
