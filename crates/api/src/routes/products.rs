//! Product-ranking endpoint fed by the sales aggregate.

use std::sync::Arc;

use axum::extract::{Query, State};
use engine::PopularProduct;
use market_store::MarketStore;
use serde::Deserialize;

use crate::envelope::Envelope;
use crate::routes::orders::AppState;

#[derive(Deserialize)]
pub struct PopularParams {
    pub limit: Option<i64>,
}

/// GET /products/popular — active products by total quantity sold.
pub async fn popular<S: MarketStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PopularParams>,
) -> Envelope<Vec<PopularProduct>> {
    match state.engine.popular_products(params.limit).await {
        Ok(ranked) => Envelope::success(ranked),
        Err(err) => err.into(),
    }
}
