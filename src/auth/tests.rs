use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";

#[test]
fn test_issue_and_validate_token_roundtrip() {
    let user_id = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
    let token = issue_token(user_id, SECRET).unwrap();

    let claims = validate_token(&token, SECRET).expect("Valid token should pass");
    assert_eq!(claims.sub, user_id.to_string());
}

#[test]
fn test_validate_token_expired() {
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        exp: 1, // past
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let result = validate_token(&token, SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_token_invalid_signature() {
    let my_claims = Claims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        exp: 9999999999,
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(b"wrongsecret"),
    )
    .unwrap();

    let result = validate_token(&token, SECRET);
    assert!(result.is_err());
}
