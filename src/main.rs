//! 认证服务主入口

use cafe_colombia_auth::{
    auth::PasswordHasher, config::AppConfig, db, error, handlers::health, middleware::AppState,
    repository::MySqlCredentialStore, routes, telemetry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("cafe-colombia-auth {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件
    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("CAFE_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config);
    error::set_expose_details(config.server.is_development());

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Auth service starting...");

    // 3. 数据库连接池（凭证库由外部维护，不执行迁移）
    let db_pool = db::create_pool(&config.database).await?;
    let store = Arc::new(MySqlCredentialStore::new(db_pool.clone()));

    tracing::info!("Credential store initialized");

    // 4. 构建应用状态
    let shutdown_timeout = config.server.graceful_shutdown_timeout_secs;
    let addr = config.server.addr.clone();
    let app_state = Arc::new(AppState::build(config, store, PasswordHasher::new()?)?);

    // 5. 构建路由
    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 连接池关闭设置上限，避免挂起
    if tokio::time::timeout(Duration::from_secs(shutdown_timeout), db::close_pool(&db_pool))
        .await
        .is_err()
    {
        tracing::warn!("Graceful shutdown timeout reached while closing database pool");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }
}

/// 打印帮助信息
fn print_help() {
    println!("cafe-colombia-auth {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: cafe-colombia-auth [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 CAFE_ 前缀的环境变量完成");
    println!("  例如 CAFE_DATABASE__URL, CAFE_SECURITY__JWT_SECRET");
    println!("  可用选项请参考 .env.example");
}
