//! Route guard
//!
//! Decides whether a page renders, shows the loading placeholder or
//! redirects, from the route's access level and the request's auth state.

use crate::models::Account;

/// Who may open a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    RequireAuth,
    RequireArtist,
}

/// Auth state of the current request
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// The persisted session could not be checked yet
    Pending,
    Resolved(Option<Account>),
}

impl AuthState {
    pub fn account(&self) -> Option<&Account> {
        match self {
            AuthState::Pending => None,
            AuthState::Resolved(account) => account.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    RedirectToLogin { from: String },
    RedirectHome,
    Render,
}

pub fn guard(access: RouteAccess, auth: &AuthState, path: &str) -> GuardDecision {
    if access == RouteAccess::Public {
        return GuardDecision::Render;
    }

    let account = match auth {
        AuthState::Pending => return GuardDecision::Loading,
        AuthState::Resolved(account) => account,
    };

    match account {
        None => GuardDecision::RedirectToLogin { from: path.to_string() },
        Some(account) if access == RouteAccess::RequireArtist && !account.is_artist() => GuardDecision::RedirectHome,
        Some(_) => GuardDecision::Render,
    }
}

/// Login URL that returns to `from` afterwards
pub fn login_url(from: &str) -> String {
    format!("/login?from={}", urlencoding::encode(from))
}

/// Where to go after signing in.
///
/// Only local paths are honored: a single leading `/`, no scheme-relative
/// `//host` and no backslash tricks.
pub fn post_login_target(from: Option<&str>) -> String {
    match from.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordId, Role};

    fn account(role: Role) -> Account {
        Account {
            id: RecordId::from("u1"),
            email: "ayu@x.id".into(),
            name: Some("Ayu".into()),
            avatar_url: None,
            role,
        }
    }

    #[test]
    fn test_pending_blocks_protected_routes() {
        assert_eq!(guard(RouteAccess::RequireAuth, &AuthState::Pending, "/dashboard"), GuardDecision::Loading);
        assert_eq!(guard(RouteAccess::RequireArtist, &AuthState::Pending, "/upload"), GuardDecision::Loading);
        assert_eq!(guard(RouteAccess::Public, &AuthState::Pending, "/"), GuardDecision::Render);
    }

    #[test]
    fn test_anonymous_goes_to_login_with_origin() {
        let anonymous = AuthState::Resolved(None);
        assert_eq!(
            guard(RouteAccess::RequireAuth, &anonymous, "/gallery/7"),
            GuardDecision::RedirectToLogin { from: "/gallery/7".into() }
        );
        assert_eq!(
            guard(RouteAccess::RequireArtist, &anonymous, "/upload"),
            GuardDecision::RedirectToLogin { from: "/upload".into() }
        );
    }

    #[test]
    fn test_non_artist_sent_home_from_artist_routes() {
        let user = AuthState::Resolved(Some(account(Role::User)));
        assert_eq!(guard(RouteAccess::RequireArtist, &user, "/dashboard"), GuardDecision::RedirectHome);
        assert_eq!(guard(RouteAccess::RequireAuth, &user, "/profile/u1"), GuardDecision::Render);
    }

    #[test]
    fn test_artist_renders_everything() {
        let artist = AuthState::Resolved(Some(account(Role::Artist)));
        for access in [RouteAccess::Public, RouteAccess::RequireAuth, RouteAccess::RequireArtist] {
            assert_eq!(guard(access, &artist, "/dashboard"), GuardDecision::Render);
        }
    }

    #[test]
    fn test_login_url_encodes_origin() {
        assert_eq!(login_url("/gallery/7"), "/login?from=%2Fgallery%2F7");
    }

    #[test]
    fn test_post_login_target_only_local() {
        assert_eq!(post_login_target(Some("/dashboard")), "/dashboard");
        assert_eq!(post_login_target(Some("//evil.example")), "/");
        assert_eq!(post_login_target(Some("https://evil.example")), "/");
        assert_eq!(post_login_target(Some("/\\evil.example")), "/");
        assert_eq!(post_login_target(None), "/");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn access() -> impl Strategy<Value = RouteAccess> {
            prop_oneof![
                Just(RouteAccess::Public),
                Just(RouteAccess::RequireAuth),
                Just(RouteAccess::RequireArtist),
            ]
        }

        fn auth_state() -> impl Strategy<Value = AuthState> {
            prop_oneof![
                Just(AuthState::Pending),
                Just(AuthState::Resolved(None)),
                Just(AuthState::Resolved(Some(account(Role::User)))),
                Just(AuthState::Resolved(Some(account(Role::Artist)))),
            ]
        }

        proptest! {
            #[test]
            fn public_routes_always_render(auth in auth_state(), path in "/[a-z0-9/]{0,20}") {
                prop_assert_eq!(guard(RouteAccess::Public, &auth, &path), GuardDecision::Render);
            }

            #[test]
            fn login_redirect_preserves_path(access in access(), path in "/[a-z0-9/]{0,20}") {
                let decision = guard(access, &AuthState::Resolved(None), &path);
                if access == RouteAccess::Public {
                    prop_assert_eq!(decision, GuardDecision::Render);
                } else {
                    prop_assert_eq!(decision, GuardDecision::RedirectToLogin { from: path });
                }
            }

            #[test]
            fn rendered_artist_route_implies_artist(auth in auth_state(), path in "/[a-z]{0,10}") {
                if guard(RouteAccess::RequireArtist, &auth, &path) == GuardDecision::Render {
                    prop_assert!(auth.account().map(|a| a.is_artist()).unwrap_or(false));
                }
            }
        }
    }
}
