//! 咖啡种植者平台认证与授权核心
//! 令牌验证、角色/权限检查、登录与凭证存储

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
