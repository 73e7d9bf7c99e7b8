//! Property-based tests for the token model and context builder.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{build_context, Error, Role, Token, TokenType, UserProfile};
    use proptest::prelude::*;

    fn optional_id() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("   ".to_string())),
            "[a-z0-9-]{1,12}".prop_map(Some),
        ]
    }

    fn is_present(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|v| !v.trim().is_empty())
    }

    proptest! {
        #[test]
        fn test_token_new_fails_iff_blank(value in "\\PC{0,16}") {
            let result = Token::new(value.clone(), TokenType::Access);
            if value.trim().is_empty() {
                prop_assert!(matches!(result, Err(Error::MalformedToken)));
            } else {
                let token = result.unwrap();
                prop_assert_eq!(token.expose(), value.as_str());
            }
        }

        #[test]
        fn test_incomplete_identity_iff_id_missing(
            project_id in optional_id(),
            user_id in optional_id(),
            full_name in proptest::option::of("\\PC{0,10}"),
            email in proptest::option::of("[a-z]{1,5}@[a-z]{1,5}\\.com"),
            roles in proptest::collection::vec("[a-z]{0,6}", 0..6),
        ) {
            let complete = is_present(&project_id) && is_present(&user_id);
            let profile = UserProfile {
                project_id,
                user_id,
                full_name,
                email,
                roles: roles.into_iter().map(Role::new).collect(),
                ..Default::default()
            };
            match build_context(profile, &()) {
                Ok(_) => prop_assert!(complete),
                Err(Error::IncompleteIdentity { .. }) => prop_assert!(!complete),
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }

        #[test]
        fn test_role_dedup_is_order_independent(
            roles in proptest::collection::vec("[a-c]{1,2}", 0..12),
        ) {
            let profile = |roles: Vec<String>| UserProfile {
                project_id: Some("p1".to_string()),
                user_id: Some("u1".to_string()),
                roles: roles.into_iter().map(Role::new).collect(),
                ..Default::default()
            };
            let mut reversed = roles.clone();
            reversed.reverse();

            let a = build_context(profile(roles.clone()), &()).unwrap();
            let b = build_context(profile(reversed), &()).unwrap();
            prop_assert_eq!(a.roles(), b.roles());

            let mut seen = std::collections::HashSet::new();
            for role in a.roles() {
                prop_assert!(seen.insert(role.as_str().to_string()), "duplicate role {}", role);
            }
            for role in &roles {
                prop_assert!(a.has_role(role));
            }
        }
    }
}
