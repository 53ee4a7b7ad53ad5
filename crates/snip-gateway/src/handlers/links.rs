use crate::error::Result;
use crate::identity::identify;
use crate::model::{
    BatchShortenRequest, BatchShortenResponse, ShortenRequest, ShortenResponse, UserUrlResponse,
};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use snip_core::ShortCode;
use snip_service::ServiceError;
use std::collections::HashMap;

/// `POST /` — text body in, short URL text out. A duplicate URL answers
/// 409 with the pre-existing short URL, which is still usable.
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: String,
) -> Result<Response> {
    let (jar, owner_id) = identify(jar);

    let shortened = state.service().shorten(body.trim(), &owner_id).await?;
    let status = if shortened.conflict {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    };

    Ok((status, jar, shortened.code.to_url(state.base_url())).into_response())
}

/// `POST /api/shorten` — JSON variant of [`shorten_text_handler`].
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ShortenRequest>,
) -> Result<Response> {
    let (jar, owner_id) = identify(jar);

    let shortened = state.service().shorten(&request.url, &owner_id).await?;
    let status = if shortened.conflict {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    };
    let body = Json(ShortenResponse {
        result: shortened.code.to_url(state.base_url()),
    });

    Ok((status, jar, body).into_response())
}

/// `POST /api/shorten/batch` — one code per correlation id.
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(requests): Json<Vec<BatchShortenRequest>>,
) -> Result<Response> {
    let (jar, owner_id) = identify(jar);

    let urls: HashMap<String, String> = requests
        .into_iter()
        .map(|r| (r.correlation_id, r.original_url))
        .collect();
    let codes = state.service().shorten_batch(urls, &owner_id).await?;

    let body: Vec<BatchShortenResponse> = codes
        .into_iter()
        .map(|(correlation_id, code)| BatchShortenResponse {
            correlation_id,
            short_url: code.to_url(state.base_url()),
        })
        .collect();

    Ok((StatusCode::CREATED, jar, Json(body)).into_response())
}

/// `GET /{code}` — 307 to the original URL.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Redirect> {
    // A string that is not even a valid code cannot name a record.
    let code = ShortCode::new(code).map_err(|_| ServiceError::NotFound)?;
    let url = state.service().resolve(&code)?;
    Ok(Redirect::temporary(&url))
}

/// `GET /api/user/urls` — the caller's live links, 204 when none.
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response> {
    let (jar, owner_id) = identify(jar);

    let records = state.service().list_by_owner(&owner_id).await?;
    if records.is_empty() {
        return Ok((jar, StatusCode::NO_CONTENT).into_response());
    }

    let body: Vec<UserUrlResponse> = records
        .into_iter()
        .map(|record| UserUrlResponse {
            short_url: record.short_code.to_url(state.base_url()),
            original_url: record.original_url,
        })
        .collect();

    Ok((jar, Json(body)).into_response())
}

/// `DELETE /api/user/urls` — enqueues the codes for deletion and answers
/// 202 immediately; the flush happens on the pipeline's schedule.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(codes): Json<Vec<String>>,
) -> Result<Response> {
    let (jar, owner_id) = identify(jar);

    for raw in codes {
        let Ok(code) = ShortCode::new(raw) else {
            continue;
        };
        state.enqueue_delete(&owner_id, code).await?;
    }

    Ok((jar, StatusCode::ACCEPTED).into_response())
}
