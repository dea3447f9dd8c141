// Session domain model - identity decoded from the externally issued token
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

/// Coarse capability tier carried in the credential. `Crew` has full
/// control; `Judge` gets a fixed trailing-7-day read-only view. This is a
/// display convenience only, the backend enforces real authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Role {
    #[serde(rename = "integrante")]
    Crew,
    #[serde(rename = "juiz")]
    Judge,
}

impl Role {
    pub fn can_control(&self) -> bool {
        matches!(self, Role::Crew)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is not a three-part JWT")]
    MalformedToken,

    #[error("token payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("token claims are not valid JSON: {0}")]
    InvalidClaims(#[from] serde_json::Error),
}

/// Decode the identity claims from the payload segment of a JWT.
///
/// The token is issued and signed elsewhere; we only read the claims and
/// never verify the signature, so a decoded identity is a display hint,
/// not proof of anything.
pub fn decode_identity(token: &str) -> Result<Identity, DecodeError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::MalformedToken);
    };

    let claims = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&claims)?)
}

#[cfg(test)]
pub fn encode_test_token(claims: &serde_json::Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.{}",
        engine.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        engine.encode(claims.to_string()),
        engine.encode(b"test-signature"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_crew_identity() {
        let token = encode_test_token(&json!({
            "id": "u-42",
            "email": "driver@team.example",
            "role": "integrante"
        }));

        let identity = decode_identity(&token).unwrap();
        assert_eq!(identity.id, "u-42");
        assert_eq!(identity.email, "driver@team.example");
        assert_eq!(identity.role, Role::Crew);
        assert!(identity.role.can_control());
    }

    #[test]
    fn decodes_judge_identity() {
        let token = encode_test_token(&json!({
            "id": "u-7",
            "email": "judge@league.example",
            "role": "juiz"
        }));

        let identity = decode_identity(&token).unwrap();
        assert_eq!(identity.role, Role::Judge);
        assert!(!identity.role.can_control());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(matches!(
            decode_identity("bad-token"),
            Err(DecodeError::MalformedToken)
        ));
        assert!(matches!(
            decode_identity("a.b.c.d"),
            Err(DecodeError::MalformedToken)
        ));
        assert!(matches!(
            decode_identity("head.%%%.sig"),
            Err(DecodeError::InvalidBase64(_))
        ));
    }

    #[test]
    fn rejects_unknown_role_claim() {
        let token = encode_test_token(&json!({
            "id": "u-1",
            "email": "x@y.example",
            "role": "mechanic"
        }));
        assert!(matches!(
            decode_identity(&token),
            Err(DecodeError::InvalidClaims(_))
        ));
    }
}
