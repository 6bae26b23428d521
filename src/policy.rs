//! Per-router authorization tables.

use axum::{middleware, routing::MethodRouter};

use crate::auth::{require_admin, require_auth};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// Who may call each operation of a resource router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub list: Access,
    pub get: Access,
    pub create: Access,
    pub update: Access,
    pub delete: Access,
}

impl Policy {
    /// Anyone reads, any signed-in user writes.
    pub const PUBLIC_READ: Policy = Policy {
        list: Access::Public,
        get: Access::Public,
        create: Access::Authenticated,
        update: Access::Authenticated,
        delete: Access::Authenticated,
    };

    pub const ADMIN_ONLY: Policy = Policy {
        list: Access::Admin,
        get: Access::Admin,
        create: Access::Admin,
        update: Access::Admin,
        delete: Access::Admin,
    };

    /// Contact form: anyone posts, admins manage.
    pub const INBOX: Policy = Policy {
        create: Access::Public,
        ..Policy::ADMIN_ONLY
    };
}

/// Wrap one method route in the middleware `access` calls for.
pub fn guard(
    access: Access,
    state: &AppState,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    match access {
        Access::Public => route,
        Access::Authenticated => {
            route.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        }
        Access::Admin => {
            route.route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_only_opens_create() {
        let inbox = Policy::INBOX;
        assert_eq!(inbox.create, Access::Public);
        assert_eq!(inbox.list, Access::Admin);
        assert_eq!(inbox.update, Access::Admin);
        assert_eq!(inbox.delete, Access::Admin);
    }

    #[test]
    fn test_public_read_requires_login_for_writes() {
        let policy = Policy::PUBLIC_READ;
        assert_eq!(policy.list, Access::Public);
        assert_eq!(policy.get, Access::Public);
        assert_eq!(policy.create, Access::Authenticated);
    }
}
