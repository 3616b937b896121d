//! Authentication and authorization

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod resolver;
pub mod session_holder;

pub use jwt::{Claims, TokenCodec};
pub use middleware::{authorization_gate, require_roles, AuthContext, GateState, RouteRoles};
pub use password::{HashingError, PasswordHasher};
pub use resolver::{BearerTokenResolver, CredentialResolver, ResolverChain, SessionResolver};
pub use session_holder::SessionHolder;
