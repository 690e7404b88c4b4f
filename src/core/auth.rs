use crate::core::{AppError, AppState};
use crate::entities::{Group, User};
use crate::relations::{Actor, Role};
use crate::repositories::Read;
use axum::extract::State;
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use jsonwebtoken::{DecodingKey, TokenData, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// struct che codifica il contenuto del token jwt (emesso dall'applicazione esterna)
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i64,
    pub username: String,
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.username);
        data
    })
    .map_err(|e| {
        error!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::forbidden("Empty header is not allowed")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::forbidden("Please add the JWT token to the header"));
        }
    };

    let mut header = auth_header.split_whitespace();
    let token = match (header.next(), header.next()) {
        (Some(bearer), Some(token)) if bearer.eq_ignore_ascii_case("bearer") => token,
        _ => {
            warn!("Malformed authorization header");
            return Err(AppError::unauthorized("Expected a Bearer token"));
        }
    };

    let token_data = decode_jwt(token, &state.jwt_secret).map_err(|_| {
        warn!("Failed to decode JWT token");
        AppError::unauthorized("Unable to decode token")
    })?;

    // Fetch the user details from the database
    let current_user = match state.user.read(&token_data.claims.id).await? {
        Some(user) if user.username == token_data.claims.username => {
            info!("User authenticated: {}", user.username);
            user
        }
        _ => {
            warn!("User not found in database: {}", token_data.claims.username);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
    };
    req.extensions_mut().insert(current_user);
    // volendo si può recuperare lo user da extension
    Ok(next.run(req).await)
}

/// Gruppo della route e ruolo dell'utente corrente al suo interno
#[derive(Debug, Clone)]
pub struct GroupContext {
    pub group: Group,
    pub role: Role,
}

impl GroupContext {
    pub fn actor(&self, user_id: i64) -> Actor {
        Actor::new(user_id, self.role)
    }
}

/// Middleware che risolve il gruppo della route e il ruolo dell'utente corrente.
/// Estrae group_id dal path e inserisce GroupContext nell'Extension; non rifiuta i Guest,
/// ogni operazione decide da sé quali ruoli accettare.
#[instrument(skip(state, req, next))]
pub async fn group_role_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running group role middleware");
    // 1. Ottenere l'utente corrente dall'Extension (deve essere stato inserito dall'authentication_middleware)
    let current_user = req
        .extensions()
        .get::<User>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    // 2. Estrarre group_id dal path (primo segmento numerico)
    let group_id: i64 = req
        .uri()
        .path()
        .split('/')
        .find_map(|segment| segment.parse::<i64>().ok())
        .ok_or_else(|| {
            warn!("Group ID not found in path: {}", req.uri().path());
            AppError::bad_request("Group ID not found in path")
        })?;

    // 3. Derivare il ruolo dell'utente nel gruppo (NOT_FOUND se il gruppo non esiste)
    let (group, role) = state.groups.role_of(group_id, current_user.user_id).await?;
    debug!(
        "User {} has role {:?} in group {}",
        current_user.user_id, role, group_id
    );

    // 4. Inserire il contesto nell'Extension per uso successivo negli handler
    req.extensions_mut().insert(GroupContext { group, role });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            exp: now + 3600,
            iat: now,
            id: 7,
            username: "greta".to_string(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
            .expect("encode token")
    }

    #[test]
    fn test_decode_jwt_returns_claims() {
        let data = decode_jwt(&token("segreto"), "segreto").expect("valid token");
        assert_eq!(data.claims.id, 7);
        assert_eq!(data.claims.username, "greta");
    }

    #[test]
    fn test_decode_jwt_rejects_wrong_secret() {
        assert!(decode_jwt(&token("segreto"), "un altro segreto").is_err());
    }
}
