//! 测试公共模块
//! 内存凭证存储、测试配置与请求辅助函数

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use cafe_colombia_auth::{
    auth::{legacy::hash_session_token, PasswordHasher},
    config::{AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig},
    db::HealthStatus,
    error::AppError,
    middleware::AppState,
    models::credential::{AdminRecord, AdminSession, CredentialRecord, Farm, GrowerRecord},
    repository::CredentialStore,
    routes,
};
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use secrecy::Secret;
use sqlx::types::Json;
use std::sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc, RwLock,
};

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";
pub const PASSWORD: &str = "Cafe-de-Origen-2024";

pub const GROWER_ID: i64 = 1;
pub const GROWER_EMAIL: &str = "grower@example.com";
pub const GROWER_FARM_ID: i64 = 10;
pub const OTHER_GROWER_ID: i64 = 4;
pub const OTHER_FARM_ID: i64 = 20;
pub const UNVERIFIED_GROWER_ID: i64 = 2;
pub const INACTIVE_EMAIL: &str = "inactive@example.com";

pub const ADMIN_ID: i64 = 100;
pub const ADMIN_EMAIL: &str = "admin@cafecolombia.co";
pub const MODERATOR_ID: i64 = 101;
pub const MODERATOR_EMAIL: &str = "moderator@cafecolombia.co";
pub const LOCKED_ADMIN_EMAIL: &str = "locked@cafecolombia.co";
pub const SUPER_ADMIN_ID: i64 = 103;

/// 有效的管理员会话令牌（属于 ADMIN_ID）
pub const ADMIN_SESSION_TOKEN: &str = "admin-token-1718000000000";
/// 已过期的管理员会话令牌
pub const EXPIRED_SESSION_TOKEN: &str = "admin-token-1600000000000";

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            graceful_shutdown_timeout_secs: 5,
            environment: "production".to_string(),
            body_limit_bytes: 64 * 1024,
        },
        database: DatabaseConfig {
            url: Secret::new("mysql://unused@localhost/unused".to_string()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Some(Secret::new(JWT_SECRET.to_string())),
            token_exp_secs: 3600,
            legacy_tokens_enabled: true,
            legacy_tokens_sunset: "2099-12-31".to_string(),
            dev_admin_stub: false,
        },
    }
}

/// 低成本哈希器（测试专用）
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::with_cost(1024, 1, 1).expect("valid argon2 params")
}

/// 种子用户：账户记录 + 邮箱是否已验证
#[derive(Clone)]
pub struct SeedUser {
    pub record: CredentialRecord,
    pub email_verified: bool,
}

#[derive(Clone)]
struct SeedSession {
    session: AdminSession,
    is_active: bool,
}

/// 内存凭证存储
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<Vec<SeedUser>>,
    admins: RwLock<Vec<AdminRecord>>,
    sessions: RwLock<Vec<SeedSession>>,
    next_session_id: AtomicI64,
    failing: AtomicBool,
    lookups: AtomicI64,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: SeedUser) {
        self.users.write().unwrap().push(user);
    }

    pub fn add_admin(&self, admin: AdminRecord) {
        self.admins.write().unwrap().push(admin);
    }

    pub fn add_session(&self, admin_id: i64, token: &str, expires_at: DateTime<Utc>, is_active: bool) {
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sessions.write().unwrap().push(SeedSession {
            session: AdminSession {
                id,
                admin_id,
                token_hash: hash_session_token(token),
                expires_at,
            },
            is_active,
        });
    }

    pub fn deactivate_user(&self, id: i64) {
        for user in self.users.write().unwrap().iter_mut() {
            if user.record.id == id {
                user.record.is_active = false;
            }
        }
    }

    pub fn deactivate_admin(&self, id: i64) {
        for admin in self.admins.write().unwrap().iter_mut() {
            if admin.id == id {
                admin.is_active = false;
            }
        }
    }

    /// 模拟存储故障（连接池耗尽等）
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 已执行的查询次数
    pub fn lookups(&self) -> i64 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn find_user(&self, pred: impl Fn(&SeedUser) -> bool) -> Option<SeedUser> {
        self.users
            .read()
            .unwrap()
            .iter()
            .find(|u| u.record.is_active && pred(u))
            .cloned()
    }

    fn find_admin(&self, pred: impl Fn(&AdminRecord) -> bool) -> Option<AdminRecord> {
        self.admins
            .read()
            .unwrap()
            .iter()
            .find(|a| a.is_active && pred(a))
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CredentialRecord>, AppError> {
        self.check()?;
        Ok(self.find_user(|u| u.record.email == email).map(|u| u.record))
    }

    async fn find_active_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, AppError> {
        self.check()?;
        Ok(self.find_user(|u| u.record.id == id).map(|u| u.record))
    }

    async fn find_active_grower_by_id(
        &self,
        id: i64,
    ) -> Result<Option<(GrowerRecord, Option<Farm>)>, AppError> {
        self.check()?;
        Ok(self
            .find_user(|u| u.record.id == id && u.email_verified)
            .map(|u| {
                let farm = match (u.record.farm_id, u.record.farm_name.clone()) {
                    (Some(id), Some(name)) => Some(Farm { id, name }),
                    _ => None,
                };
                let grower = GrowerRecord {
                    id: u.record.id,
                    email: u.record.email,
                    role: u.record.role,
                    is_active: u.record.is_active,
                    email_verified: u.email_verified,
                    first_name: u.record.first_name,
                    last_name: u.record.last_name,
                    permissions: u.record.permissions,
                };
                (grower, farm)
            }))
    }

    async fn find_active_admin_by_id(&self, id: i64) -> Result<Option<AdminRecord>, AppError> {
        self.check()?;
        Ok(self.find_admin(|a| a.id == id))
    }

    async fn find_active_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminRecord>, AppError> {
        self.check()?;
        Ok(self.find_admin(|a| a.email == email))
    }

    async fn find_active_sessions_with_hash(&self) -> Result<Vec<AdminSession>, AppError> {
        self.check()?;
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.is_active && s.session.expires_at > now)
            .map(|s| s.session.clone())
            .collect())
    }

    async fn health_check(&self) -> HealthStatus {
        if self.failing.load(Ordering::SeqCst) {
            HealthStatus::Unhealthy("pool timed out".to_string())
        } else {
            HealthStatus::Healthy
        }
    }
}

fn grower(
    id: i64,
    email: &str,
    role: &str,
    password_hash: &str,
    farm: Option<(i64, &str)>,
) -> CredentialRecord {
    CredentialRecord {
        id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role: role.to_string(),
        is_active: true,
        first_name: Some("Juan".to_string()),
        last_name: Some("Valdez".to_string()),
        permissions: None,
        farm_id: farm.map(|(id, _)| id),
        farm_name: farm.map(|(_, name)| name.to_string()),
    }
}

fn admin(id: i64, email: &str, role: &str, password_hash: &str, permissions: &[&str]) -> AdminRecord {
    AdminRecord {
        id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role: role.to_string(),
        is_active: true,
        first_name: Some("Admin".to_string()),
        last_name: None,
        permissions: (!permissions.is_empty())
            .then(|| Json(permissions.iter().map(|p| p.to_string()).collect())),
        locked_until: None,
    }
}

/// 创建带种子数据的内存存储
pub fn seeded_store() -> Arc<InMemoryCredentialStore> {
    let hash = test_hasher().hash(PASSWORD).expect("hash password");
    let store = InMemoryCredentialStore::new();

    store.add_user(SeedUser {
        record: grower(GROWER_ID, GROWER_EMAIL, "farmer", &hash, Some((GROWER_FARM_ID, "La Esperanza"))),
        email_verified: true,
    });
    store.add_user(SeedUser {
        record: grower(UNVERIFIED_GROWER_ID, "unverified@example.com", "coffee_grower", &hash, None),
        email_verified: false,
    });
    store.add_user(SeedUser {
        record: CredentialRecord {
            is_active: false,
            ..grower(3, INACTIVE_EMAIL, "caficultor", &hash, None)
        },
        email_verified: true,
    });
    store.add_user(SeedUser {
        record: grower(OTHER_GROWER_ID, "other@example.com", "coffee-grower", &hash, Some((OTHER_FARM_ID, "El Paraíso"))),
        email_verified: true,
    });

    store.add_admin(admin(ADMIN_ID, ADMIN_EMAIL, "admin", &hash, &["reports.read"]));
    store.add_admin(admin(MODERATOR_ID, MODERATOR_EMAIL, "moderator", &hash, &["content.moderate"]));
    store.add_admin(AdminRecord {
        locked_until: Some(Utc::now() + Duration::hours(1)),
        ..admin(102, LOCKED_ADMIN_EMAIL, "admin", &hash, &[])
    });
    store.add_admin(admin(SUPER_ADMIN_ID, "root@cafecolombia.co", "super_admin", &hash, &[]));

    store.add_session(ADMIN_ID, ADMIN_SESSION_TOKEN, Utc::now() + Duration::hours(8), true);
    store.add_session(ADMIN_ID, EXPIRED_SESSION_TOKEN, Utc::now() - Duration::hours(1), true);

    Arc::new(store)
}

/// users 表中的后台角色账户（无农场，邮箱已验证）
pub fn add_users_table_account(store: &InMemoryCredentialStore, id: i64, email: &str, role: &str) {
    let hash = test_hasher().hash(PASSWORD).expect("hash password");
    store.add_user(SeedUser {
        record: grower(id, email, role, &hash, None),
        email_verified: true,
    });
}

/// 创建测试应用状态
pub fn create_test_app_state(
    config: AppConfig,
    store: Arc<InMemoryCredentialStore>,
) -> Arc<AppState> {
    Arc::new(AppState::build(config, store, test_hasher()).expect("build app state"))
}

/// 默认配置 + 种子数据的路由
pub fn create_test_app() -> (Router, Arc<AppState>, Arc<InMemoryCredentialStore>) {
    let store = seeded_store();
    let state = create_test_app_state(create_test_config(), store.clone());
    (routes::create_router(state.clone()), state, store)
}

/// 为指定账户签发 JWT
pub fn jwt_for(state: &AppState, id: i64, role: cafe_colombia_auth::auth::Role) -> String {
    use cafe_colombia_auth::auth::PermissionSet;

    let claims = state
        .jwt_service
        .claims_for(id, role, &PermissionSet::new(), role.account_kind());
    state.jwt_service.encode(&claims).expect("encode token")
}

/// GET 请求，可选 Bearer 令牌
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// JSON POST 请求
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// 读取响应体为 JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
