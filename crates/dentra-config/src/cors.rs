use crate::env_list;

#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn from_env() -> Self {
        let mut allowed_origins = env_list("CORS_ALLOWED_ORIGINS");
        if allowed_origins.is_empty() {
            allowed_origins = vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ];
        }

        Self { allowed_origins }
    }
}
