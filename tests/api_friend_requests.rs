//! Integration tests per gli endpoints delle richieste di amicizia

mod common;

#[cfg(test)]
mod friend_request_tests {
    use super::common::{bearer, create_test_server, create_test_state};
    use axum_test::TestServer;
    use axum_test::http::HeaderName;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    const AUTH: HeaderName = HeaderName::from_static("authorization");

    fn setup(pool: SqlitePool) -> TestServer {
        create_test_server(create_test_state(pool))
    }

    async fn send(server: &TestServer, from: (i64, &str), to: i64) -> axum_test::TestResponse {
        server
            .post("/friend-requests")
            .add_header(AUTH, bearer(from.0, from.1))
            .json(&json!({ "receiver_id": to, "message": "Ciao!" }))
            .await
    }

    fn receivers(page: &Value) -> Vec<i64> {
        page["items"]
            .as_array()
            .map(|items| items.iter().filter_map(|r| r["receiver"]["id"].as_i64()).collect())
            .unwrap_or_default()
    }

    async fn friendship_rows(pool: &SqlitePool, a: i64, b: i64) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM friendships WHERE (user_id = ? AND friend_id = ?) OR (user_id = ? AND friend_id = ?)",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_one(pool)
        .await
        .expect("count friendships")
    }

    // ============================================================
    // Test per POST /friend-requests - send_friend_request
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_send_friend_request_success(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = send(&server, (1, "alice"), 4).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["sender_id"], 1);
        assert_eq!(body["data"]["receiver_id"], 4);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["message"], "Ciao!");
        assert!(body["data"]["accepted_at"].is_null());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_send_friend_request_to_self(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = send(&server, (1, "alice"), 1).await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["kind"], "validation");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_send_friend_request_unknown_receiver(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = send(&server, (1, "alice"), 999).await;

        response.assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_send_friend_request_to_friend(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        // alice e carol sono già amiche
        let response = send(&server, (1, "alice"), 3).await;

        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["kind"], "invalid_transition");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_send_duplicate_friend_request(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        send(&server, (1, "alice"), 4).await.assert_status_ok();
        let response = send(&server, (1, "alice"), 4).await;

        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["kind"], "duplicate_request");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_reciprocal_request_becomes_match(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());

        let first: Value = send(&server, (1, "alice"), 2).await.json();
        let request_id = first["data"]["request_id"].as_i64().expect("request id");

        let response = send(&server, (2, "bob"), 1).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "You are now friends");
        assert_eq!(body["data"]["request_id"], request_id);
        assert_eq!(body["data"]["sender_id"], 1);
        assert_eq!(body["data"]["receiver_id"], 2);
        assert_eq!(body["data"]["status"], "approved");
        assert!(!body["data"]["accepted_at"].is_null());

        // nessun secondo record, amicizia in entrambe le direzioni
        let all: Value = server
            .get("/friend-requests")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .json();
        assert_eq!(all["total"], 1);
        assert_eq!(friendship_rows(&pool, 1, 2).await, 2);
        Ok(())
    }

    // ============================================================
    // Test per PATCH /friend-requests/{id} - update_friend_request
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_approve_twice_keeps_single_friendship(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());
        let created: Value = send(&server, (1, "alice"), 4).await.json();
        let request_id = created["data"]["request_id"].as_i64().expect("request id");

        for _ in 0..2 {
            let response = server
                .patch(&format!("/friend-requests/{}", request_id))
                .add_header(AUTH, bearer(4, "dave"))
                .json(&json!({ "status": "approved" }))
                .await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["data"]["status"], "approved");
        }

        assert_eq!(friendship_rows(&pool, 1, 4).await, 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_reject_does_not_create_friendship(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());
        let created: Value = send(&server, (1, "alice"), 4).await.json();
        let request_id = created["data"]["request_id"].as_i64().expect("request id");

        let response = server
            .patch(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(4, "dave"))
            .json(&json!({ "status": "rejected" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["status"], "rejected");
        assert!(body["data"]["accepted_at"].is_null());
        assert_eq!(friendship_rows(&pool, 1, 4).await, 0);

        // cambiare idea dopo il rifiuto non è permesso
        let response = server
            .patch(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(4, "dave"))
            .json(&json!({ "status": "approved" }))
            .await;
        response.assert_status_conflict();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_only_receiver_can_resolve(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);
        let created: Value = send(&server, (1, "alice"), 4).await.json();
        let request_id = created["data"]["request_id"].as_i64().expect("request id");

        let response = server
            .patch(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(1, "alice"))
            .json(&json!({ "status": "approved" }))
            .await;

        response.assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_resolve_back_to_pending(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);
        let created: Value = send(&server, (1, "alice"), 4).await.json();
        let request_id = created["data"]["request_id"].as_i64().expect("request id");

        let response = server
            .patch(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(4, "dave"))
            .json(&json!({ "status": "pending" }))
            .await;

        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["kind"], "invalid_transition");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_resolve_unknown_request(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .patch("/friend-requests/999")
            .add_header(AUTH, bearer(4, "dave"))
            .json(&json!({ "status": "approved" }))
            .await;

        response.assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // Test per GET /friend-requests/{id} e DELETE /friend-requests/{id}
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_get_request_participants_only(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);
        let created: Value = send(&server, (1, "alice"), 4).await.json();
        let request_id = created["data"]["request_id"].as_i64().expect("request id");

        server
            .get(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(4, "dave"))
            .await
            .assert_status_ok();

        server
            .get(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(5, "erin"))
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_cancel_pending_request(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);
        let created: Value = send(&server, (1, "alice"), 4).await.json();
        let request_id = created["data"]["request_id"].as_i64().expect("request id");

        // il destinatario non può cancellare
        server
            .delete(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(4, "dave"))
            .await
            .assert_status_forbidden();

        let response = server
            .delete(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(1, "alice"))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["data"].is_null());

        server
            .get(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .assert_status_not_found();

        // dopo la cancellazione si può inviare di nuovo
        send(&server, (1, "alice"), 4).await.assert_status_ok();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_cancel_resolved_request(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);
        let created: Value = send(&server, (1, "alice"), 4).await.json();
        let request_id = created["data"]["request_id"].as_i64().expect("request id");

        server
            .patch(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(4, "dave"))
            .json(&json!({ "status": "rejected" }))
            .await
            .assert_status_ok();

        let response = server
            .delete(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(1, "alice"))
            .await;

        response.assert_status_conflict();

        // il record risolto resta leggibile
        server
            .get(&format!("/friend-requests/{}", request_id))
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .assert_status_ok();
        Ok(())
    }

    // ============================================================
    // Test per le liste e le connessioni in comune
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships", "groups")))]
    async fn test_received_requests_are_enriched(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);
        send(&server, (2, "bob"), 1).await.assert_status_ok();

        let response = server
            .get("/friend-requests/received")
            .add_header(AUTH, bearer(1, "alice"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 1);
        let item = &body["items"][0];
        assert_eq!(item["status"], "pending");
        assert_eq!(item["sender"]["username"], "bob");
        assert_eq!(item["receiver"]["username"], "alice");
        // carol è amica di entrambi; il gruppo 1 è creato da alice e salvato da bob
        assert_eq!(item["mutual"]["mutual_friends"], json!([3]));
        assert_eq!(item["mutual"]["mutual_groups"], json!([1]));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships")))]
    async fn test_sent_requests_pagination(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);
        for receiver in [2, 4, 5] {
            send(&server, (1, "alice"), receiver).await.assert_status_ok();
        }

        let first: Value = server
            .get("/friend-requests/sent?page=1&limit=2")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();
        assert_eq!(first["total"], 3);
        assert_eq!(first["page"], 1);
        assert_eq!(first["limit"], 2);
        // dalla più recente: erin, dave, poi bob nella seconda pagina
        assert_eq!(receivers(&first), vec![5, 4]);

        let second: Value = server
            .get("/friend-requests/sent?page=2&limit=2")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();
        assert_eq!(receivers(&second), vec![2]);

        // le ricevute di alice sono vuote
        let received: Value = server
            .get("/friend-requests/received")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();
        assert_eq!(received["total"], 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "friendships", "groups")))]
    async fn test_mutual_connections_endpoint(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .get("/users/2/mutual")
            .add_header(AUTH, bearer(1, "alice"))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["mutual_friends"], json!([3]));
        assert_eq!(body["mutual_groups"], json!([1]));

        server
            .get("/users/999/mutual")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // Autenticazione
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_friend_requests_without_token(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server.get("/friend-requests").await;

        response.assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_friend_requests_with_invalid_token(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .get("/friend-requests")
            .add_header(AUTH, "Bearer invalid_token_here")
            .await;

        response.assert_status_unauthorized();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_token_of_unknown_user(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .get("/friend-requests")
            .add_header(AUTH, bearer(42, "ghost"))
            .await;

        response.assert_status_unauthorized();
        Ok(())
    }
}
