//! Authentication and authorization module

pub mod issuer;
pub mod jwt;
pub mod legacy;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod role;
pub mod verifier;

pub use issuer::{Identity, IssuedToken, TokenFormat, TokenIssuer};
pub use jwt::{Claims, JwtError, JwtService};
pub use legacy::{LegacyToken, LegacyTokenPolicy};
pub use middleware::{authorize, optional_auth, require_auth, RouteGuard};
pub use password::PasswordHasher;
pub use permissions::PermissionSet;
pub use policy::Requirement;
pub use principal::{OptionalPrincipal, Principal};
pub use role::{AccountKind, Role};
pub use verifier::TokenVerifier;
