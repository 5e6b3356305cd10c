//! Account lifecycle integration tests.

#[cfg(test)]
mod tests {
    use crate::{spawn_server, unique_email};

    #[tokio::test]
    async fn test_should_sign_up_login_and_read_own_account() {
        let server = spawn_server().await;
        let email = unique_email("ada");
        let keys = server.sign_up(&email, "analytical-1").await;
        assert_eq!(keys.secret_key.len(), 88);

        let response = server
            .signed(http::Method::GET, "/api/v1/account/1", &keys.public_key, &keys.secret_key)
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers()["server"], "Waypost");
        assert!(response.headers().contains_key("x-request-id"));

        let envelope: serde_json::Value = response.json().await.unwrap();
        let account = &envelope["Payloads"]["Account"][0];
        assert_eq!(account["Email"], email.as_str());
        assert_eq!(account["PublicKey"], keys.public_key.as_str());
        assert!(account.get("SecretKey").is_none());
    }

    #[tokio::test]
    async fn test_should_conflict_on_reused_email() {
        let server = spawn_server().await;
        let body = serde_json::json!({
            "Name": "Grace",
            "Email": unique_email("grace"),
            "Password": "compiler-1",
        });
        assert_eq!(
            server.post_json("/api/v1/account/create", &body).await.status(),
            reqwest::StatusCode::OK
        );

        let response = server.post_json("/api/v1/account/create", &body).await;
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
        let envelope: serde_json::Value = response.json().await.unwrap();
        assert_eq!(envelope["ErrorNumber"], 300_544_903);
    }

    #[tokio::test]
    async fn test_should_reject_wrong_password() {
        let server = spawn_server().await;
        let email = unique_email("linus");
        server.sign_up(&email, "kernel-123").await;

        let response = server
            .post_json(
                "/api/v1/auth/login",
                &serde_json::json!({"Email": email, "Password": "kernel-124"}),
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
        let envelope: serde_json::Value = response.json().await.unwrap();
        assert_eq!(envelope["ErrorNumber"], 5_296_511_999_i64);
    }

    #[tokio::test]
    async fn test_should_forbid_tampered_signature() {
        let server = spawn_server().await;
        let keys = server.sign_up(&unique_email("mallory"), "tamper-proof-1").await;
        let mut secret = keys.secret_key.clone();
        secret.replace_range(0..1, if secret.starts_with('A') { "B" } else { "A" });

        let response = server
            .signed(http::Method::GET, "/api/v1/account/1", &keys.public_key, &secret)
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    }
}
