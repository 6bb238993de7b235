use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::voice::{normalize_locale, resolve};
use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub styles: Vec<String>,
    pub locales: Vec<String>,
}

/// Catalog bucket key → voices listed under it.
pub type VoicesResponse = BTreeMap<String, Vec<Voice>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhichVoiceQuery {
    #[serde(default, alias = "language", alias = "locale")]
    pub lang: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhichVoiceResponse {
    pub voice_id: String,
    pub locale: String,
    pub style: Option<String>,
}

/// List the loaded voice catalog.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    let mut response = VoicesResponse::new();
    for (bucket, entry) in state.catalog().all_voices() {
        response.entry(bucket.to_string()).or_default().push(Voice {
            id: entry.id.clone(),
            name: entry.display_name().to_string(),
            styles: entry.styles.clone(),
            locales: entry.locales.clone(),
        });
    }
    Json(response)
}

/// Report which voice a locale and style resolve to.
pub async fn which_voice(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WhichVoiceQuery>,
) -> AppResult<Json<WhichVoiceResponse>> {
    let voice_id = resolve(
        state.catalog(),
        query.lang.as_deref(),
        query.style.as_deref(),
        None,
    )?;

    Ok(Json(WhichVoiceResponse {
        voice_id,
        locale: normalize_locale(query.lang.as_deref()),
        style: query.style,
    }))
}
