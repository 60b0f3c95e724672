use axum::extract::State;
use axum::Json;
use relay_common::EventFilter;
use relay_domain::{EventStatus, EventView, SearchQuery, SearchResponse};

use crate::error::AppError;
use crate::state::AppState;

/// `POST /webhooks/search`
pub async fn search(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    if let (Some(from), Some(to)) = (query.from_timestamp, query.to_timestamp) {
        if to <= from {
            return Err(AppError::Unprocessable(
                "to_timestamp must be greater than from_timestamp".to_string(),
            ));
        }
    }

    let status = query
        .status
        .as_deref()
        .map(str::parse::<EventStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let filter = EventFilter {
        status,
        event_type: query.event_type.clone(),
        from_timestamp: query.from_timestamp,
        to_timestamp: query.to_timestamp,
    };

    let (events, summary) = state.store.search(&filter, query.skip, query.limit).await?;
    let data: Vec<EventView> = events.into_iter().map(EventView::from).collect();

    Ok(Json(SearchResponse { data, summary }))
}
