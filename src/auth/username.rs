use super::template::TemplateEngine;
use super::{ClaimSet, Error};
use crate::configuration::{Configuration, UsernameMode};

/// Username rules of the configuration: validation of the name the client connected
/// with, and computation of the name it should be given instead.
#[derive(Clone, Debug)]
pub struct UsernamePolicy {
    validation: UsernameMode,
    validation_template: Option<String>,
    replacement: UsernameMode,
    replacement_template: Option<String>,
    engine: TemplateEngine,
}

impl UsernamePolicy {
    pub fn new(config: &Configuration) -> Self {
        Self {
            validation: config.username_validation,
            validation_template: config.username_validation_template.clone(),
            replacement: config.username_replacement,
            replacement_template: config.username_replacement_template.clone(),
            engine: TemplateEngine::default(),
        }
    }

    /// Checks that only need the request. Claim comparisons are left to
    /// [`Self::validate_after_introspection`], which is authoritative.
    pub fn validate_before_introspection(&self, username: Option<&str>) -> Result<(), Error> {
        match self.validation {
            UsernameMode::None => Ok(()),
            UsernameMode::OidcUsername | UsernameMode::OidcEmail | UsernameMode::OidcSub => {
                if username.is_some() {
                    Ok(())
                } else {
                    Err(mismatch("client did not present a username"))
                }
            }
            UsernameMode::Template => {
                let template = self.validation_template()?;
                let Some(username) = username else {
                    return Err(mismatch("client did not present a username"));
                };

                // Literal templates can be compared right away.
                if TemplateEngine::has_placeholders(template) || username == template {
                    Ok(())
                } else {
                    Err(mismatch("username does not match the validation template"))
                }
            }
        }
    }

    pub fn validate_after_introspection(
        &self,
        username: Option<&str>,
        claims: &ClaimSet,
    ) -> Result<(), Error> {
        if self.validation == UsernameMode::None {
            return Ok(());
        }

        let Some(username) = username.filter(|username| !username.is_empty()) else {
            return Err(mismatch("client did not present a username"));
        };

        match self.validation {
            UsernameMode::None => Ok(()),
            UsernameMode::OidcUsername | UsernameMode::OidcEmail | UsernameMode::OidcSub => {
                let claim = self.validation.claim_name().unwrap_or_default();
                let reason = match claims.get_str(claim) {
                    Some(value) if value == username => return Ok(()),
                    Some(_) => "does not match the username",
                    None => "is missing or not a string",
                };
                Err(mismatch(&format!("claim '{claim}' {reason}")))
            }
            UsernameMode::Template => {
                let template = self.validation_template()?;
                if self.engine.substitute(template, claims) == username {
                    Ok(())
                } else {
                    Err(mismatch("username does not match the rendered template"))
                }
            }
        }
    }

    /// Username the client should be given, or `None` when replacement is disabled.
    pub fn compute_replacement(&self, claims: &ClaimSet) -> Result<Option<String>, Error> {
        let username = match self.replacement {
            UsernameMode::None => return Ok(None),
            UsernameMode::OidcUsername | UsernameMode::OidcEmail | UsernameMode::OidcSub => {
                let claim = self.replacement.claim_name().unwrap_or_default();
                let Some(value) = claims.get_str(claim) else {
                    return Err(Error::Replacement(format!(
                        "claim '{claim}' is missing or not a string"
                    )));
                };
                value.to_string()
            }
            UsernameMode::Template => {
                let Some(template) = &self.replacement_template else {
                    return Err(Error::Replacement(
                        "no replacement template configured".to_string(),
                    ));
                };
                self.engine.substitute(template, claims)
            }
        };

        if username.is_empty() {
            return Err(Error::Replacement(
                "replacement username is empty".to_string(),
            ));
        }

        Ok(Some(username))
    }

    fn validation_template(&self) -> Result<&str, Error> {
        self.validation_template
            .as_deref()
            .ok_or_else(|| mismatch("no validation template configured"))
    }
}

fn mismatch(reason: &str) -> Error {
    Error::UsernameMismatch(reason.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::configuration::FailureAction;
    use crate::secret::Secret;

    fn policy(
        validation: UsernameMode,
        validation_template: Option<&str>,
        replacement: UsernameMode,
        replacement_template: Option<&str>,
    ) -> UsernamePolicy {
        let config = Configuration {
            introspection_endpoint: "https://idp.example.com/introspect".to_string(),
            client_id: "broker".to_string(),
            client_secret: Secret::new("broker-secret".to_string()),
            tls_verification: true,
            timeout: 5,
            username_validation: validation,
            username_validation_template: validation_template.map(str::to_string),
            username_validation_error: FailureAction::Defer,
            username_replacement: replacement,
            username_replacement_template: replacement_template.map(str::to_string),
            username_replacement_error: FailureAction::Deny,
            token_verification_error: FailureAction::Deny,
        };
        UsernamePolicy::new(&config)
    }

    fn validation(mode: UsernameMode, template: Option<&str>) -> UsernamePolicy {
        policy(mode, template, UsernameMode::None, None)
    }

    fn replacement(mode: UsernameMode, template: Option<&str>) -> UsernamePolicy {
        policy(UsernameMode::None, None, mode, template)
    }

    fn claims(value: Value) -> ClaimSet {
        match value {
            Value::Object(map) => ClaimSet::from(map),
            _ => panic!("Expected a JSON object"),
        }
    }

    #[test]
    fn test_before_introspection_none() {
        let policy = validation(UsernameMode::None, None);
        assert!(policy.validate_before_introspection(None).is_ok());
        assert!(policy.validate_before_introspection(Some("alice")).is_ok());
    }

    #[test]
    fn test_before_introspection_requires_username_for_claim_modes() {
        for mode in [
            UsernameMode::OidcUsername,
            UsernameMode::OidcEmail,
            UsernameMode::OidcSub,
        ] {
            let policy = validation(mode, None);
            assert!(policy.validate_before_introspection(Some("alice")).is_ok());
            assert!(policy.validate_before_introspection(Some("")).is_ok());
            assert!(matches!(
                policy.validate_before_introspection(None),
                Err(Error::UsernameMismatch(_))
            ));
        }
    }

    #[test]
    fn test_before_introspection_literal_template() {
        let policy = validation(UsernameMode::Template, Some("sensor-gateway"));

        assert!(policy
            .validate_before_introspection(Some("sensor-gateway"))
            .is_ok());
        assert!(policy
            .validate_before_introspection(Some("sensor-gateway-2"))
            .is_err());
        assert!(policy.validate_before_introspection(None).is_err());
    }

    #[test]
    fn test_before_introspection_placeholder_template_is_deferred() {
        let policy = validation(UsernameMode::Template, Some("token-%%oidc-sub%%"));

        assert!(policy.validate_before_introspection(Some("anything")).is_ok());
        assert!(policy.validate_before_introspection(None).is_err());
    }

    #[test]
    fn test_before_introspection_template_missing() {
        let policy = validation(UsernameMode::Template, None);
        assert!(policy.validate_before_introspection(Some("alice")).is_err());
    }

    #[test]
    fn test_after_introspection_none_always_valid() {
        let policy = validation(UsernameMode::None, None);
        let claims = claims(json!({"active": true}));

        assert!(policy.validate_after_introspection(None, &claims).is_ok());
        assert!(policy.validate_after_introspection(Some(""), &claims).is_ok());
    }

    #[test]
    fn test_after_introspection_claim_modes() {
        let claims = claims(json!({
            "active": true,
            "username": "alice",
            "email": "alice@example.com",
            "sub": "u123"
        }));

        let cases = [
            (UsernameMode::OidcUsername, "alice"),
            (UsernameMode::OidcEmail, "alice@example.com"),
            (UsernameMode::OidcSub, "u123"),
        ];

        for (mode, expected) in cases {
            let policy = validation(mode, None);
            assert!(policy
                .validate_after_introspection(Some(expected), &claims)
                .is_ok());
            assert!(policy
                .validate_after_introspection(Some(expected.to_uppercase().as_str()), &claims)
                .is_err());
            assert!(policy
                .validate_after_introspection(Some(format!("{expected} ").as_str()), &claims)
                .is_err());
            assert!(policy.validate_after_introspection(None, &claims).is_err());
        }
    }

    #[test]
    fn test_after_introspection_claim_type_mismatch() {
        let policy = validation(UsernameMode::OidcSub, None);

        let numeric = claims(json!({"active": true, "sub": 123}));
        assert!(policy
            .validate_after_introspection(Some("123"), &numeric)
            .is_err());

        let missing = claims(json!({"active": true}));
        assert!(policy
            .validate_after_introspection(Some("123"), &missing)
            .is_err());
    }

    #[test]
    fn test_after_introspection_empty_username_never_matches() {
        let policy = validation(UsernameMode::OidcSub, None);
        let claims = claims(json!({"active": true, "sub": ""}));

        assert!(policy.validate_after_introspection(Some(""), &claims).is_err());
    }

    #[test]
    fn test_after_introspection_template() {
        let policy = validation(UsernameMode::Template, Some("token-%%oidc-username%%"));
        let claims = claims(json!({"active": true, "username": "alice"}));

        assert!(policy
            .validate_after_introspection(Some("token-alice"), &claims)
            .is_ok());
        assert!(policy
            .validate_after_introspection(Some("token-bob"), &claims)
            .is_err());
    }

    #[test]
    fn test_after_introspection_template_rendering_empty() {
        let policy = validation(UsernameMode::Template, Some("%%oidc-username%%"));
        let claims = claims(json!({"active": true}));

        assert!(policy
            .validate_after_introspection(Some("alice"), &claims)
            .is_err());
        assert!(policy.validate_after_introspection(Some(""), &claims).is_err());
    }

    #[test]
    fn test_replacement_none() {
        let policy = replacement(UsernameMode::None, None);
        let claims = claims(json!({"active": true, "sub": "42"}));

        assert_eq!(policy.compute_replacement(&claims), Ok(None));
    }

    #[test]
    fn test_replacement_from_claims() {
        let claims = claims(json!({
            "username": "alice",
            "email": "alice@example.com",
            "sub": "42"
        }));

        let cases = [
            (UsernameMode::OidcUsername, "alice"),
            (UsernameMode::OidcEmail, "alice@example.com"),
            (UsernameMode::OidcSub, "42"),
        ];

        for (mode, expected) in cases {
            let policy = replacement(mode, None);
            assert_eq!(
                policy.compute_replacement(&claims),
                Ok(Some(expected.to_string()))
            );
        }
    }

    #[test]
    fn test_replacement_missing_claim_fails() {
        let policy = replacement(UsernameMode::OidcEmail, None);

        let claims = claims(json!({"sub": "42", "username": true}));
        assert!(matches!(
            policy.compute_replacement(&claims),
            Err(Error::Replacement(_))
        ));

        let policy = replacement(UsernameMode::OidcUsername, None);
        assert!(matches!(
            policy.compute_replacement(&claims),
            Err(Error::Replacement(_))
        ));
    }

    #[test]
    fn test_replacement_template() {
        let policy = replacement(UsernameMode::Template, Some("svc-%%oidc-sub%%"));
        let claims = claims(json!({"sub": "42"}));

        assert_eq!(
            policy.compute_replacement(&claims),
            Ok(Some("svc-42".to_string()))
        );
    }

    #[test]
    fn test_replacement_literal_template() {
        let policy = replacement(UsernameMode::Template, Some("shared-account"));
        let claims = claims(json!({}));

        assert_eq!(
            policy.compute_replacement(&claims),
            Ok(Some("shared-account".to_string()))
        );
    }

    #[test]
    fn test_replacement_template_failures() {
        let claims = claims(json!({"email": "a@b.c"}));

        let policy = replacement(UsernameMode::Template, None);
        assert!(matches!(
            policy.compute_replacement(&claims),
            Err(Error::Replacement(_))
        ));

        let policy = replacement(UsernameMode::Template, Some("%%oidc-sub%%"));
        assert!(matches!(
            policy.compute_replacement(&claims),
            Err(Error::Replacement(_))
        ));
    }
}
