//! Operator API.
//!
//! # Routes
//! - `GET /health`: health snapshot, never blocks
//! - `POST /db-sync`: run a sync pass now
//! - `POST /db-failover`: designate the secondary now
//! - `POST /db-failback`: designate the primary now
//!
//! POST routes take `{"operatorId": "..."}` and answer
//! `{"success", "message", "timestamp"}`. When an API key is configured they
//! also require it as a bearer token.

pub mod auth;
pub mod error;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::redundancy::RedundancyManager;
use crate::store::StoreConnector;

/// State shared by the admin handlers.
pub struct AdminState<C: StoreConnector> {
    pub manager: Arc<RedundancyManager<C>>,
    pub api_key: Option<Arc<str>>,
}

impl<C: StoreConnector> Clone for AdminState<C> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

impl<C: StoreConnector> AdminState<C> {
    pub fn new(manager: Arc<RedundancyManager<C>>, api_key: Option<String>) -> Self {
        Self {
            manager,
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }
}

pub fn setup_admin_router<C: StoreConnector>(state: AdminState<C>) -> Router {
    let actions = Router::new()
        .route("/db-sync", post(post_db_sync::<C>))
        .route("/db-failover", post(post_db_failover::<C>))
        .route("/db-failback", post(post_db_failback::<C>))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware::<C>,
        ));

    Router::new()
        .route("/health", get(get_health::<C>))
        .merge(actions)
        .with_state(state)
}
