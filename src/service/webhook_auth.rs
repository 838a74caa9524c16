//! Telephony webhook signature validation
//!
//! Twilio signs every webhook with HMAC-SHA1 over the full request URL
//! followed by the form parameters sorted by name, carried in the
//! `X-Twilio-Signature` header.

use std::collections::BTreeMap;
use std::env;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const ENV_TWILIO_AUTH_TOKEN: &str = "MAITRI_TWILIO_AUTH_TOKEN";

/// Validates webhook signatures. Without an auth token configured all
/// requests pass, which keeps local development working against raw curl.
#[derive(Clone)]
pub struct WebhookValidator {
    auth_token: Option<String>,
}

impl WebhookValidator {
    pub fn from_env() -> Self {
        let auth_token = env::var(ENV_TWILIO_AUTH_TOKEN).ok();
        if auth_token.is_none() {
            tracing::warn!("MAITRI_TWILIO_AUTH_TOKEN not set, webhook signatures are not validated");
        }
        Self { auth_token }
    }

    #[cfg(test)]
    pub fn with_token(token: &str) -> Self {
        Self {
            auth_token: Some(token.to_string()),
        }
    }

    /// Check a webhook signature against the request URL and form body
    pub fn validate(
        &self,
        url: &str,
        params: &BTreeMap<String, String>,
        signature: &str,
    ) -> bool {
        let Some(token) = &self.auth_token else {
            return true;
        };

        match Self::compute_signature(token, url, params) {
            Some(expected) => expected == signature,
            None => false,
        }
    }

    fn compute_signature(
        token: &str,
        url: &str,
        params: &BTreeMap<String, String>,
    ) -> Option<String> {
        let mut mac = HmacSha1::new_from_slice(token.as_bytes()).ok()?;
        mac.update(url.as_bytes());
        for (key, value) in params {
            mac.update(key.as_bytes());
            mac.update(value.as_bytes());
        }
        Some(BASE64.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn valid_signature_passes() {
        let validator = WebhookValidator::with_token("secret");
        let body = params(&[("From", "+918340570832"), ("CallSid", "CA123")]);
        let url = "https://maitri.example.org/ivr/incoming";

        let signature = WebhookValidator::compute_signature("secret", url, &body).unwrap();
        assert!(validator.validate(url, &body, &signature));
    }

    #[test]
    fn tampered_body_fails() {
        let validator = WebhookValidator::with_token("secret");
        let url = "https://maitri.example.org/ivr/incoming";
        let body = params(&[("From", "+918340570832")]);
        let signature = WebhookValidator::compute_signature("secret", url, &body).unwrap();

        let tampered = params(&[("From", "+910000000000")]);
        assert!(!validator.validate(url, &tampered, &signature));
    }

    #[test]
    fn wrong_token_fails() {
        let validator = WebhookValidator::with_token("secret");
        let url = "https://maitri.example.org/ivr/incoming";
        let body = params(&[("From", "+918340570832")]);
        let signature = WebhookValidator::compute_signature("other", url, &body).unwrap();

        assert!(!validator.validate(url, &body, &signature));
    }

    #[test]
    fn missing_token_skips_validation() {
        let validator = WebhookValidator { auth_token: None };
        assert!(validator.validate("https://any", &BTreeMap::new(), "garbage"));
    }

    #[test]
    fn params_are_signed_in_sorted_order() {
        let url = "https://maitri.example.org/ivr/incoming";
        let a = params(&[("B", "2"), ("A", "1")]);
        let b = params(&[("A", "1"), ("B", "2")]);

        assert_eq!(
            WebhookValidator::compute_signature("secret", url, &a),
            WebhookValidator::compute_signature("secret", url, &b)
        );
    }
}
