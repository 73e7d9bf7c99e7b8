//! Contract conformance checks runnable against any provider.
//!
//! The null provider is the baseline: every real provider should produce a
//! clean [`ConformanceReport`] for a token it accepts.
//!
//! ```rust,ignore
//! let report = check_provider(&provider, &Token::access("valid-123")?).await;
//! assert!(report.is_conformant(), "{report}");
//! ```

use std::fmt;

use crate::context::build_context;
use crate::error::Error;
use crate::provider::IdentityProvider;
use crate::token::{RevocationRequest, Token, TokenType};

/// A single failed check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Name of the check that failed.
    pub check: &'static str,
    /// What was observed.
    pub detail: String,
}

/// Result of [`check_provider`].
#[derive(Clone, Debug, Default)]
pub struct ConformanceReport {
    pub provider: String,
    pub violations: Vec<Violation>,
}

impl ConformanceReport {
    pub fn is_conformant(&self) -> bool {
        self.violations.is_empty()
    }

    fn fail(&mut self, check: &'static str, detail: impl Into<String>) {
        self.violations.push(Violation {
            check,
            detail: detail.into(),
        });
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_conformant() {
            return write!(f, "provider '{}' is conformant", self.provider);
        }
        writeln!(
            f,
            "provider '{}' has {} violation(s):",
            self.provider,
            self.violations.len()
        )?;
        for v in &self.violations {
            writeln!(f, "  - {}: {}", v.check, v.detail)?;
        }
        Ok(())
    }
}

fn outcome<T>(result: &Result<T, Error>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(e) => e.code().to_string(),
    }
}

/// Run every contract check against `provider` using `sample`.
///
/// Revocation runs last because it may invalidate `sample`.
pub async fn check_provider(provider: &dyn IdentityProvider, sample: &Token) -> ConformanceReport {
    let mut report = ConformanceReport {
        provider: provider.key().to_string(),
        violations: Vec::new(),
    };

    // validate is deterministic
    let first = provider.validate(sample).await;
    let second = provider.validate(sample).await;
    match (&first, &second) {
        (Ok(a), Ok(b)) if a != b => {
            report.fail("validate_deterministic", "two validations returned different identities")
        }
        (Ok(_), Ok(_)) => {}
        (Err(a), Err(b)) if a.code() == b.code() => {}
        _ => report.fail(
            "validate_deterministic",
            format!("outcomes differ: {} then {}", outcome(&first), outcome(&second)),
        ),
    }

    // a validated identity yields a complete context
    if let Ok(identity) = &first {
        if identity.provider != provider.key() {
            report.fail(
                "identity_provider_key",
                format!("identity tagged '{}'", identity.provider),
            );
        }
        let profile = provider.describe_user(identity);
        if let Err(e) = build_context(profile, &()) {
            report.fail("describe_user_complete", e.to_string());
        }
    }

    // unsupported token types are rejected, never guessed
    for kind in TokenType::ALL {
        if provider.supported_token_types().contains(&kind) {
            continue;
        }
        let Ok(token) = Token::new(sample.expose(), kind) else {
            continue;
        };
        match provider.validate(&token).await {
            Err(Error::UnsupportedTokenType(k)) if k == kind => {}
            other => report.fail(
                "reject_unsupported_type",
                format!("{kind} token gave {}", outcome(&other)),
            ),
        }
    }

    // revoke is idempotent: revoked twice, or unsupported twice
    let request = RevocationRequest::new(sample.expose(), sample.token_type());
    let first = provider.revoke(&request).await;
    let second = provider.revoke(&request).await;
    match (&first, &second) {
        (Ok(a), Ok(b)) if a.success && b.success => {}
        (Err(Error::UnsupportedOperation { .. }), Err(Error::UnsupportedOperation { .. })) => {}
        _ => report.fail(
            "revoke_idempotent",
            format!(
                "revoke gave {} then {}",
                match &first {
                    Ok(r) => format!("success={}", r.success),
                    Err(e) => e.code().to_string(),
                },
                match &second {
                    Ok(r) => format!("success={}", r.success),
                    Err(e) => e.code().to_string(),
                }
            ),
        ),
    }

    report
}
