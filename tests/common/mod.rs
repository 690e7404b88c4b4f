#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use social_server::core::{AppState, Claims};
use social_server::notifications::{Notification, NotificationDispatch, NotifyError};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};

pub const TEST_JWT_SECRET: &str = "segreto-di-test-per-le-relazioni";

/// Stato con il secret di test e le notifiche verso gli utenti online.
/// `sqlx::test` passa un database nuovo, già migrato, a ogni test.
pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    Arc::new(AppState::new(pool, TEST_JWT_SECRET.to_string()))
}

pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    TestServer::new(social_server::create_router(state)).expect("Failed to create test server")
}

/// Token firmato come quelli emessi dal servizio di login esterno (valido 24 ore)
pub fn create_test_jwt(user_id: i64, username: &str, jwt_secret: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        id: user_id,
        username: username.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(24)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("Failed to create JWT token")
}

/// Valore dell'header Authorization per l'utente indicato
pub fn bearer(user_id: i64, username: &str) -> String {
    format!("Bearer {}", create_test_jwt(user_id, username, TEST_JWT_SECRET))
}

/// Dispatcher che registra ogni notifica ricevuta
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn receivers(&self) -> Vec<i64> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .iter()
            .map(|n| n.receiver_id)
            .collect()
    }
}

impl NotificationDispatch for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push(notification);
        Ok(())
    }
}

/// Dispatcher che fallisce sempre
pub struct FailingNotifier;

impl NotificationDispatch for FailingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Other(format!(
            "delivery to {} failed",
            notification.receiver_id
        )))
    }
}
