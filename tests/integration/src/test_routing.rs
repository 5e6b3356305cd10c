//! Routing integration tests over real HTTP.

#[cfg(test)]
mod tests {
    use crate::spawn_server;

    #[tokio::test]
    async fn test_should_answer_unknown_routes_with_not_found_envelope() {
        let server = spawn_server().await;
        for path in ["/api/v1/widget", "/elsewhere/v1/account", "/api"] {
            let response = server.client.get(server.url(path)).send().await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND, "{path}");
            assert!(
                response.headers()["content-type"]
                    .to_str()
                    .unwrap()
                    .starts_with("application/json")
            );
            let envelope: serde_json::Value = response.json().await.unwrap();
            assert_ne!(envelope["ErrorNumber"], 0, "{path}");
        }
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_auth_route() {
        let server = spawn_server().await;
        let response = server
            .client
            .get(server.url("/api/v1/account/1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_should_reject_bad_body_with_bad_request() {
        let server = spawn_server().await;
        let response = server
            .client
            .post(server.url("/api/v1/account/create"))
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
