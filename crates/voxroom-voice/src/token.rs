//! Signed access tokens that let a caller join a relay room.
//!
//! Tokens are HS256 JWTs signed with the relay API secret. The claim layout is
//! the one the relay verifies at join time: the API key as issuer, the
//! participant identity as subject, and the room grants under `video`.
//! Relays ignore a top-level `grants` object, so it is never emitted.

use crate::config::{RelayConfig, DEFAULT_IDENTITY, DEFAULT_ROOM};
use crate::error::VoiceError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Permission flags embedded in a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrants {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_publish_data: bool,
}

impl VideoGrants {
    /// Join, publish media, and publish data in `room`.
    pub fn participant(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            room_join: true,
            can_publish: true,
            can_publish_data: true,
        }
    }
}

/// JWT claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// API key id of the issuer.
    pub iss: String,
    /// Participant identity.
    pub sub: String,
    /// Issuance time (unix seconds).
    pub nbf: u64,
    /// Expiry (unix seconds).
    pub exp: u64,
    pub video: VideoGrants,
}

/// A signed, immutable access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    claims: TokenClaims,
    jwt: String,
}

impl AccessToken {
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// The compact JWT handed to the client.
    pub fn as_jwt(&self) -> &str {
        &self.jwt
    }

    pub fn into_jwt(self) -> String {
        self.jwt
    }
}

/// Issues access tokens for the configured relay credentials.
#[derive(Clone)]
pub struct TokenIssuer {
    api_key: String,
    api_secret: String,
    ttl_seconds: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            ttl_seconds: config.token_ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issues a token valid from now until now + TTL.
    ///
    /// Missing or empty `identity`/`room` fall back to development defaults.
    pub fn issue(
        &self,
        identity: Option<&str>,
        room: Option<&str>,
    ) -> Result<AccessToken, VoiceError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| VoiceError::Auth(format!("system clock before unix epoch: {}", e)))?
            .as_secs();
        self.issue_at(identity, room, now)
    }

    /// Issues a token as if the current time were `issued_at` (unix seconds).
    pub fn issue_at(
        &self,
        identity: Option<&str>,
        room: Option<&str>,
        issued_at: u64,
    ) -> Result<AccessToken, VoiceError> {
        if self.api_secret.trim().is_empty() {
            return Err(VoiceError::Auth("API secret is not configured".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(VoiceError::Auth("API key is not configured".to_string()));
        }
        if self.ttl_seconds == 0 {
            return Err(VoiceError::Config(
                "token TTL must be greater than zero".to_string(),
            ));
        }

        let expires_at = issued_at.checked_add(self.ttl_seconds).ok_or_else(|| {
            VoiceError::Config(format!(
                "token TTL of {} seconds overflows the expiry time",
                self.ttl_seconds
            ))
        })?;

        let identity = non_empty(identity).unwrap_or(DEFAULT_IDENTITY);
        let room = non_empty(room).unwrap_or(DEFAULT_ROOM);

        let claims = TokenClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: issued_at,
            exp: expires_at,
            video: VideoGrants::participant(room),
        };

        let jwt = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| VoiceError::Auth(format!("failed to encode token: {}", e)))?;

        Ok(AccessToken { claims, jwt })
    }

    /// Verifies a token signed with this issuer's secret and returns its claims.
    ///
    /// Expired tokens are rejected.
    pub fn decode(&self, jwt: &str) -> Result<TokenClaims, VoiceError> {
        if self.api_secret.trim().is_empty() {
            return Err(VoiceError::Auth("API secret is not configured".to_string()));
        }
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<TokenClaims>(
            jwt,
            &DecodingKey::from_secret(self.api_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| VoiceError::Auth(format!("invalid token: {}", e)))?;
        Ok(data.claims)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUED_AT: u64 = 1_700_000_000;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&RelayConfig::new("ws://localhost:7880", "devkey", "secret"))
    }

    fn decode_unchecked(jwt: &str) -> TokenClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        decode::<TokenClaims>(jwt, &DecodingKey::from_secret(b"secret"), &validation)
            .expect("decode token")
            .claims
    }

    #[test]
    fn expiry_is_one_hour_after_issuance_for_every_input() {
        let issuer = issuer();
        let inputs = [
            (None, None),
            (Some("alice"), None),
            (None, Some("demo")),
            (Some("alice"), Some("demo")),
            (Some(""), Some("")),
        ];
        for (identity, room) in inputs {
            let token = issuer.issue_at(identity, room, ISSUED_AT).unwrap();
            let claims = decode_unchecked(token.as_jwt());
            assert_eq!(claims.exp, ISSUED_AT + 3600);
            assert_eq!(claims.nbf, ISSUED_AT);
            assert!(claims.video.room_join);
            assert!(claims.video.can_publish);
            assert!(claims.video.can_publish_data);
            assert_eq!(&claims, token.claims());
        }
    }

    #[test]
    fn absent_or_empty_inputs_use_defaults() {
        let issuer = issuer();
        let token = issuer.issue_at(None, Some(""), ISSUED_AT).unwrap();
        assert_eq!(token.claims().sub, DEFAULT_IDENTITY);
        assert_eq!(token.claims().video.room, DEFAULT_ROOM);
        assert_eq!(token.claims().iss, "devkey");
    }

    #[test]
    fn tokens_issued_at_different_times_differ() {
        let issuer = issuer();
        let first = issuer
            .issue_at(Some("alice"), Some("demo"), ISSUED_AT)
            .unwrap();
        let second = issuer
            .issue_at(Some("alice"), Some("demo"), ISSUED_AT + 1)
            .unwrap();
        let signature = |jwt: &str| jwt.rsplit('.').next().unwrap().to_string();
        assert_ne!(signature(first.as_jwt()), signature(second.as_jwt()));
    }

    #[test]
    fn missing_secret_fails_without_leaking() {
        let issuer = TokenIssuer::new(&RelayConfig::new("", "devkey", ""));
        match issuer.issue(Some("alice"), Some("demo")) {
            Err(VoiceError::Auth(msg)) => assert!(msg.contains("not configured")),
            other => panic!("expected Auth error, got {:?}", other),
        }
    }

    #[test]
    fn oversized_ttl_is_a_config_error() {
        let mut config = RelayConfig::new("ws://localhost:7880", "devkey", "secret");
        config.token_ttl_seconds = u64::MAX;
        let issuer = TokenIssuer::new(&config);

        match issuer.issue(Some("a"), Some("b")) {
            Err(VoiceError::Config(msg)) => assert!(msg.contains("overflows")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn grants_are_carried_under_video_claim() {
        let token = issuer().issue_at(Some("alice"), Some("demo"), ISSUED_AT).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let raw = decode::<serde_json::Value>(
            token.as_jwt(),
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(raw["video"]["room"], "demo");
        assert_eq!(raw["video"]["roomJoin"], true);
        assert!(raw.get("grants").is_none());
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", issuer());
        assert!(!rendered.contains("\"secret\""));
    }

    #[test]
    fn fresh_token_round_trips_through_decode() {
        let issuer = issuer();
        let token = issuer.issue(Some("bob"), Some("lobby")).unwrap();
        let claims = issuer.decode(token.as_jwt()).unwrap();
        assert_eq!(claims.sub, "bob");
        assert_eq!(claims.video.room, "lobby");
    }

    #[test]
    fn decode_rejects_foreign_signature() {
        let other = TokenIssuer::new(&RelayConfig::new("", "devkey", "other-secret"));
        let token = other.issue(Some("bob"), None).unwrap();
        assert!(matches!(
            issuer().decode(token.as_jwt()),
            Err(VoiceError::Auth(_))
        ));
    }
}
