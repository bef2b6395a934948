use chrono::Utc;
use dentra_auth::{create_access_token, verify_email_verification_token, verify_token};
use dentra_config::JwtConfig;
use uuid::Uuid;

fn get_test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test_secret_key_for_testing_purposes_only".to_string(),
        previous_secrets: vec![],
        access_token_expiry: 3600,
        verification_token_expiry: 600,
        cookie_secure: true,
    }
}

#[test]
fn test_access_token_carries_clinic() {
    let jwt_config = get_test_jwt_config();
    let user_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();

    let token = create_access_token(user_id, "dr@clinic.test", Some(clinic_id), &jwt_config)
        .unwrap();
    let claims = verify_token(&token, &jwt_config).unwrap();

    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.email, "dr@clinic.test");
    assert_eq!(claims.clinic_id, Some(clinic_id));
}

#[test]
fn test_access_token_expiry_window() {
    let jwt_config = get_test_jwt_config();
    let before = Utc::now().timestamp() as usize;

    let token = create_access_token(Uuid::new_v4(), "a@clinic.test", None, &jwt_config).unwrap();
    let claims = verify_token(&token, &jwt_config).unwrap();

    assert!(claims.iat >= before);
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[test]
fn test_retired_secret_rejected_after_rotation_window() {
    let old = get_test_jwt_config();
    let token = create_access_token(Uuid::new_v4(), "a@clinic.test", None, &old).unwrap();

    let rotated = JwtConfig {
        secret: "a_completely_new_secret_value_for_tests".to_string(),
        ..old.clone()
    };

    let result = verify_token(&token, &rotated);

    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().status,
        axum::http::StatusCode::UNAUTHORIZED
    );
}

#[test]
fn test_garbage_verification_token() {
    let jwt_config = get_test_jwt_config();

    let result = verify_email_verification_token("garbage", &jwt_config);

    assert!(result.is_err());
}
