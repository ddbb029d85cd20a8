//! HTTP 处理器模块

pub mod auth;
pub mod dashboard;
pub mod health;
