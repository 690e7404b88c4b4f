//! Integration tests per la moderazione degli articoli di gruppo

mod common;

#[cfg(test)]
mod article_tests {
    use super::common::{bearer, create_test_server, create_test_state};
    use axum_test::TestServer;
    use axum_test::http::HeaderName;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    const AUTH: HeaderName = HeaderName::from_static("authorization");

    fn setup(pool: SqlitePool) -> TestServer {
        create_test_server(create_test_state(pool))
    }

    fn article_ids(page: &Value) -> Vec<i64> {
        let mut ids: Vec<i64> = page["items"]
            .as_array()
            .map(|items| items.iter().filter_map(|a| a["article_id"].as_i64()).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    fn article_ids_in_order(page: &Value) -> Vec<i64> {
        page["items"]
            .as_array()
            .map(|items| items.iter().filter_map(|a| a["article_id"].as_i64()).collect())
            .unwrap_or_default()
    }

    async fn moderate(
        server: &TestServer,
        actor: (i64, &str),
        article_id: i64,
        state: &str,
    ) -> axum_test::TestResponse {
        server
            .patch(&format!("/groups/1/articles/{}", article_id))
            .add_header(AUTH, bearer(actor.0, actor.1))
            .json(&json!({ "state": state }))
            .await
    }

    // ============================================================
    // Test per POST /groups/{group_id}/articles - submit_article
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups")))]
    async fn test_member_submits_pending_article(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .post("/groups/1/articles")
            .add_header(AUTH, bearer(2, "bob"))
            .json(&json!({ "title": "Alta via 1", "content": "Dieci tappe da Braies a Belluno" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["author_id"], 2);
        assert_eq!(body["data"]["group_id"], 1);
        assert_eq!(body["data"]["state"], "pending");
        assert!(body["data"]["reviewed_by"].is_null());

        // non compare nel feed finché non è approvato
        let feed: Value = server
            .get("/groups/1/feed")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .json();
        assert_eq!(feed["total"], 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups")))]
    async fn test_guest_cannot_submit_article(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        // erin è esterna, dave ha solo una richiesta pendente
        for (id, name) in [(5, "erin"), (4, "dave")] {
            server
                .post("/groups/1/articles")
                .add_header(AUTH, bearer(id, name))
                .json(&json!({ "title": "Spam", "content": "..." }))
                .await
                .assert_status_forbidden();
        }
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups")))]
    async fn test_submit_article_without_title(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        server
            .post("/groups/1/articles")
            .add_header(AUTH, bearer(2, "bob"))
            .json(&json!({ "title": "", "content": "Testo" }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    // ============================================================
    // Coda di moderazione e decisioni
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_pending_queue_for_moderators(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        for (id, name) in [(1, "alice"), (3, "carol")] {
            let response = server
                .get("/groups/1/articles/pending")
                .add_header(AUTH, bearer(id, name))
                .await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(article_ids(&body), vec![1]);
        }

        server
            .get("/groups/1/articles/pending")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_admin_approves_article(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = moderate(&server, (3, "carol"), 1, "approved").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["state"], "approved");
        assert_eq!(body["data"]["reviewed_by"], 3);
        assert!(!body["data"]["reviewed_at"].is_null());

        let feed: Value = server
            .get("/groups/1/feed")
            .add_header(AUTH, bearer(5, "erin"))
            .await
            .json();
        assert_eq!(article_ids(&feed), vec![1, 2]);

        let pending: Value = server
            .get("/groups/1/articles/pending")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();
        assert_eq!(pending["total"], 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_owner_rejects_article(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = moderate(&server, (1, "alice"), 1, "rejected").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["state"], "rejected");

        let feed: Value = server
            .get("/groups/1/feed")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();
        assert_eq!(article_ids(&feed), vec![2]);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_article_is_moderated_once(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        moderate(&server, (3, "carol"), 1, "approved")
            .await
            .assert_status_ok();

        let response = moderate(&server, (1, "alice"), 1, "rejected").await;
        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["kind"], "invalid_transition");

        // anche gli articoli già decisi nelle fixture
        moderate(&server, (1, "alice"), 3, "approved")
            .await
            .assert_status_conflict();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_member_cannot_moderate(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        moderate(&server, (2, "bob"), 1, "approved")
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_moderate_back_to_pending(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        moderate(&server, (1, "alice"), 1, "pending")
            .await
            .assert_status_conflict();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_moderate_article_of_another_group(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        // bob è owner del gruppo 2, l'articolo 1 appartiene al gruppo 1
        server
            .patch("/groups/2/articles/1")
            .add_header(AUTH, bearer(2, "bob"))
            .json(&json!({ "state": "approved" }))
            .await
            .assert_status_not_found();

        moderate(&server, (1, "alice"), 999, "approved")
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups")))]
    async fn test_article_reaches_feed_after_admin_approval(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let created: Value = server
            .post("/groups/1/articles")
            .add_header(AUTH, bearer(2, "bob"))
            .json(&json!({ "title": "Cadini di Misurina", "content": "Tramonto dal rifugio Fonda Savio" }))
            .await
            .json();
        let article_id = created["data"]["article_id"].as_i64().expect("article id");
        assert_eq!(created["data"]["state"], "pending");

        // bob è membro semplice, non può approvare nemmeno il proprio articolo
        moderate(&server, (2, "bob"), article_id, "approved")
            .await
            .assert_status_forbidden();

        moderate(&server, (3, "carol"), article_id, "approved")
            .await
            .assert_status_ok();

        let feed: Value = server
            .get("/groups/1/feed")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .json();
        assert_eq!(article_ids(&feed), vec![article_id]);
        Ok(())
    }

    // ============================================================
    // Feed
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_feed_shows_approved_only(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .get("/groups/1/feed")
            .add_header(AUTH, bearer(5, "erin"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 1);
        assert_eq!(article_ids(&body), vec![2]);
        assert_eq!(body["items"][0]["title"], "Tre Cime");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_lists_are_newest_first(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());

        sqlx::query(
            "INSERT INTO articles (article_id, group_id, author_id, title, content, created_at) \
             VALUES (4, 1, 2, 'Sass Pordoi', 'Funivia e discesa a piedi', '2025-02-05T10:00:00Z')",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "INSERT INTO moderation_entries (article_id, group_id, state, reviewed_by, reviewed_at, created_at) \
             VALUES (4, 1, 'PENDING', NULL, NULL, '2025-02-05T10:00:00Z')",
        )
        .execute(&pool)
        .await?;

        let pending: Value = server
            .get("/groups/1/articles/pending")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();
        assert_eq!(article_ids_in_order(&pending), vec![4, 1]);

        // approvati entrambi, il feed segue la data di creazione e non quella di revisione
        for article_id in [1, 4] {
            moderate(&server, (1, "alice"), article_id, "approved")
                .await
                .assert_status_ok();
        }
        let feed: Value = server
            .get("/groups/1/feed")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .json();
        assert_eq!(article_ids_in_order(&feed), vec![4, 2, 1]);

        let second_page: Value = server
            .get("/groups/1/feed?page=2&limit=2")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .json();
        assert_eq!(article_ids_in_order(&second_page), vec![1]);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "groups", "articles")))]
    async fn test_feed_of_group_without_articles(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let body: Value = server
            .get("/groups/2/feed")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();

        assert_eq!(body["total"], 0);
        assert_eq!(body["items"], json!([]));
        Ok(())
    }
}
