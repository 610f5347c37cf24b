// Population percentile thresholds for every card statistic.

use thiserror::Error;
use tracing::{debug, info};

use crate::model::{Boundaries, Stat, StatThreshold, ThresholdSet};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("percentile query for {stat} failed: {source}")]
    Store { stat: Stat, source: StoreError },

    #[error("store returned no {percent}th percentile for {stat}")]
    MissingPercentile { stat: Stat, percent: f64 },
}

/// Query the store once per statistic and assemble the threshold set.
///
/// Shooting percentages only consider players above the minimum attempt
/// count; every other statistic uses the whole population. Nothing is cached:
/// each call reflects the collection as it is now.
pub async fn compute_thresholds<S>(
    store: &S,
    collection: &str,
) -> Result<ThresholdSet, ThresholdError>
where
    S: DocumentStore + ?Sized,
{
    let thresholds = ThresholdSet {
        two_point: stat_threshold(store, collection, Stat::TwoPoint).await?,
        three_point: stat_threshold(store, collection, Stat::ThreePoint).await?,
        defensive_rebound: stat_threshold(store, collection, Stat::DefensiveRebound).await?,
        offensive_rebound: stat_threshold(store, collection, Stat::OffensiveRebound).await?,
        assist: stat_threshold(store, collection, Stat::Assist).await?,
        block: stat_threshold(store, collection, Stat::Block).await?,
        steal: stat_threshold(store, collection, Stat::Steal).await?,
        turnover: stat_threshold(store, collection, Stat::Turnover).await?,
    };
    info!("Computed percentile thresholds for {} statistics", Stat::ALL.len());
    Ok(thresholds)
}

async fn stat_threshold<S>(
    store: &S,
    collection: &str,
    stat: Stat,
) -> Result<StatThreshold, ThresholdError>
where
    S: DocumentStore + ?Sized,
{
    let cut_points = stat.cut_points();
    let filter = stat.population_filter();
    let values = store
        .query_percentiles(collection, stat.field(), &cut_points, filter.as_ref())
        .await
        .map_err(|source| ThresholdError::Store { stat, source })?;

    let pick = |percent: f64| {
        values
            .get(percent)
            .ok_or(ThresholdError::MissingPercentile { stat, percent })
    };
    let boundaries = Boundaries::new(
        pick(cut_points[0])?,
        pick(cut_points[1])?,
        pick(cut_points[2])?,
    );
    debug!(
        %stat,
        low = boundaries.low,
        mid = boundaries.mid,
        high = boundaries.high,
        "percentile thresholds"
    );

    Ok(StatThreshold { boundaries, filter })
}
