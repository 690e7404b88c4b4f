//! Integration tests per pagine e ticket collegati

mod common;

#[cfg(test)]
mod page_tests {
    use super::common::{bearer, create_test_server, create_test_state};
    use axum_test::TestServer;
    use axum_test::http::HeaderName;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    const AUTH: HeaderName = HeaderName::from_static("authorization");

    fn setup(pool: SqlitePool) -> TestServer {
        create_test_server(create_test_state(pool))
    }

    async fn list_ticket(server: &TestServer, page_id: i64) -> Value {
        let page: Value = server
            .get(&format!("/pages/{}", page_id))
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .json();
        page["list_ticket"].clone()
    }

    async fn destroyed_at(pool: &SqlitePool, ticket_id: i64) -> Option<String> {
        sqlx::query_scalar("SELECT destroyed_at FROM tickets WHERE ticket_id = ?")
            .bind(ticket_id)
            .fetch_one(pool)
            .await
            .expect("ticket row")
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_create_page(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .post("/pages")
            .add_header(AUTH, bearer(4, "dave"))
            .json(&json!({ "name": "Malga Ra Stua" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["owner_id"], 4);
        assert_eq!(body["data"]["list_ticket"], json!([]));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_get_page_resolves_live_tickets(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .get("/pages/1")
            .add_header(AUTH, bearer(2, "bob"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["list_ticket"], json!([1]));
        assert_eq!(body["tickets"][0]["ticket_id"], 1);
        assert_eq!(body["tickets"][0]["name"], "Mezza pensione");

        server
            .get("/pages/999")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_create_ticket_links_it_to_page(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .post("/pages/1/tickets")
            .add_header(AUTH, bearer(1, "alice"))
            .json(&json!({ "name": "Pensione completa", "price": 80.0 }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let ticket_id = body["data"]["ticket_id"].as_i64().expect("ticket id");
        assert_eq!(body["data"]["page_id"], 1);
        assert!(body["data"]["destroyed_at"].is_null());

        assert_eq!(list_ticket(&server, 1).await, json!([1, ticket_id]));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_create_ticket_on_missing_page(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());

        let response = server
            .post("/pages/99/tickets")
            .add_header(AUTH, bearer(1, "alice"))
            .json(&json!({ "name": "Fantasma", "price": 1.0 }))
            .await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["kind"], "parent_not_found");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_create_ticket_by_non_owner(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        server
            .post("/pages/1/tickets")
            .add_header(AUTH, bearer(2, "bob"))
            .json(&json!({ "name": "Abusivo", "price": 5.0 }))
            .await
            .assert_status_forbidden();

        assert_eq!(list_ticket(&server, 1).await, json!([1]));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_create_ticket_negative_price(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        server
            .post("/pages/1/tickets")
            .add_header(AUTH, bearer(1, "alice"))
            .json(&json!({ "name": "Sconto", "price": -3.0 }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_delete_ticket_unlinks_and_soft_deletes(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());

        server
            .delete("/tickets/1")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .assert_status_ok();

        assert_eq!(list_ticket(&server, 1).await, json!([]));
        assert!(destroyed_at(&pool, 1).await.is_some());

        // un ticket già distrutto non si cancella due volte
        server
            .delete("/tickets/1")
            .add_header(AUTH, bearer(1, "alice"))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_delete_ticket_by_non_owner(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());

        server
            .delete("/tickets/1")
            .add_header(AUTH, bearer(2, "bob"))
            .await
            .assert_status_forbidden();

        assert!(destroyed_at(&pool, 1).await.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_delete_ticket_with_missing_parent_rolls_back(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool.clone());

        // il ticket 2 punta alla pagina 99, che non esiste
        let response = server
            .delete("/tickets/2")
            .add_header(AUTH, bearer(1, "alice"))
            .await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["kind"], "parent_not_found");
        assert!(destroyed_at(&pool, 2).await.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "pages")))]
    async fn test_delete_unknown_ticket(pool: SqlitePool) -> sqlx::Result<()> {
        let server = setup(pool);

        let response = server
            .delete("/tickets/999")
            .add_header(AUTH, bearer(1, "alice"))
            .await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["kind"], "not_found");
        Ok(())
    }
}
