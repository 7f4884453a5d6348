pub mod resolver;

pub use resolver::IdentityResolver;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};
    use thoughtswap_core::UserRole;
    use thoughtswap_protocol::IdentityHint;

    fn resolver() -> IdentityResolver {
        let conn = Connection::open_in_memory().unwrap();
        thoughtswap_store::init_db(&conn).unwrap();
        IdentityResolver::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn guest_email_is_auto_created() {
        let resolver = resolver();
        let hint = IdentityHint {
            email: "guest_abc123".into(),
            name: "Guest".into(),
            role: UserRole::Student,
        };
        let user = resolver.resolve(&hint).unwrap();
        assert_eq!(user.name, "Guest");
        assert!(user.external_id.is_some());
    }

    #[test]
    fn unregistered_non_guest_email_fails_auth() {
        let resolver = resolver();
        let hint = IdentityHint {
            email: "unknown@school.edu".into(),
            name: "Whoever".into(),
            role: UserRole::Student,
        };
        let err = resolver.resolve(&hint);
        assert!(err.is_err());
    }

    #[test]
    fn registered_email_resolves_to_stored_role_not_hint() {
        let conn = Connection::open_in_memory().unwrap();
        thoughtswap_store::init_db(&conn).unwrap();
        thoughtswap_store::users::upsert_user(
            &conn,
            None,
            "t@school.edu",
            "Ms. Rivera",
            UserRole::Teacher,
        )
        .unwrap();
        let resolver = IdentityResolver::new(Arc::new(Mutex::new(conn)));

        let hint = IdentityHint {
            email: "t@school.edu".into(),
            name: "Ms. Rivera".into(),
            role: UserRole::Student, // handshake lies about role
        };
        let user = resolver.resolve(&hint).unwrap();
        assert_eq!(user.role, UserRole::Teacher);
    }
}
