//! 结构化日志初始化

use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 未设置 RUST_LOG 时压低的依赖日志
const QUIET_TARGETS: &str = "sqlx=warn,tower_http=info";

/// 安装全局 subscriber；json 用于生产，其余按紧凑文本输出
pub fn init_telemetry(config: &AppConfig) {
    let registry = tracing_subscriber::registry().with(filter_for(&config.logging.level));
    let layer = tracing_subscriber::fmt::layer().with_target(false);

    if config.logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(layer.json().flatten_event(true).with_current_span(true))
            .init();
    } else {
        registry.with(layer.compact()).init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.logging.level,
        environment = %config.server.environment,
        legacy_tokens = config.security.legacy_tokens_enabled,
        "Telemetry initialized"
    );
}

/// RUST_LOG 优先，否则使用配置的级别
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: &str) -> String {
    format!("{},{}", level.to_lowercase(), QUIET_TARGETS)
}
