// src/state.rs

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    auth::UserStore,
    judge::{EvaluationStore, Judge},
    llm::GenerativeModel,
    session::SessionStore,
};

pub struct AppState {
    // -------- Storage --------
    pub pool: SqlitePool,
    pub users: UserStore,
    pub sessions: SessionStore,
    pub evaluations: EvaluationStore,

    // -------- Model --------
    pub model: Arc<dyn GenerativeModel>,
    pub judge: Judge,
}

/// Wire up the shared application state from a connected pool and a model.
pub fn create_app_state(pool: SqlitePool, model: Arc<dyn GenerativeModel>) -> AppState {
    AppState {
        users: UserStore::new(pool.clone()),
        sessions: SessionStore::new(pool.clone()),
        evaluations: EvaluationStore::new(pool.clone()),
        judge: Judge::new(model.clone()),
        model,
        pool,
    }
}
