// Player card generation.
//
// A `CardGenerator` computes the population thresholds once when it is built
// and then rates any number of player-seasons against that same snapshot.

use futures_util::{Stream, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::rate;
use crate::draft::DraftEntry;
use crate::model::{PlayerCard, Stat, ThresholdSet};
use crate::schema::{PLAYER_FIELD, POSITION_FIELD, SEASON_FIELD, TEAM_FIELD};
use crate::store::{field_number, field_text, Document, DocumentStore, StoreError, TermFilter};
use crate::thresholds::{compute_thresholds, ThresholdError};

#[derive(Debug, Error)]
pub enum CardError {
    #[error("failed to compute thresholds: {0}")]
    Thresholds(#[from] ThresholdError),

    #[error("failed to fetch season stats for `{name}`: {source}")]
    Scan { name: String, source: StoreError },
}

/// Rates player-seasons stored in `collection` against one threshold set.
pub struct CardGenerator<'a, S: ?Sized> {
    store: &'a S,
    collection: String,
    thresholds: ThresholdSet,
}

impl<'a, S> CardGenerator<'a, S>
where
    S: DocumentStore + ?Sized,
{
    /// Compute thresholds from the current collection contents and return a
    /// generator bound to them.
    pub async fn new(store: &'a S, collection: impl Into<String>) -> Result<Self, CardError> {
        let collection = collection.into();
        let thresholds = compute_thresholds(store, &collection).await?;
        Ok(Self::with_thresholds(store, collection, thresholds))
    }

    /// Build a generator around thresholds computed elsewhere.
    pub fn with_thresholds(
        store: &'a S,
        collection: impl Into<String>,
        thresholds: ThresholdSet,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Lazily produce one card per stored season of `name`, restricted to
    /// `year` when given, in the store's scan order.
    pub fn generate<'g>(
        &'g self,
        name: &'g str,
        year: Option<&str>,
    ) -> impl Stream<Item = Result<PlayerCard, CardError>> + 'g {
        let mut filter = TermFilter::new().term(PLAYER_FIELD, name);
        if let Some(year) = year {
            filter = filter.term(SEASON_FIELD, year);
        }
        let thresholds = &self.thresholds;
        self.store
            .scan(&self.collection, filter)
            .map(move |result| match result {
                Ok(doc) => Ok(build_card(name, &doc, thresholds)),
                Err(source) => Err(CardError::Scan {
                    name: name.to_string(),
                    source,
                }),
            })
    }

    /// Generate cards for every draft entry, in draft order.
    pub async fn generate_all(&self, draft: &[DraftEntry]) -> Result<Vec<PlayerCard>, CardError> {
        let mut cards = Vec::new();
        for entry in draft {
            let found: Vec<PlayerCard> = self
                .generate(&entry.name, entry.year.as_deref())
                .try_collect()
                .await?;
            match (found.len(), entry.year.as_deref()) {
                (0, Some(year)) => warn!("No season stats for {} in {}", entry.name, year),
                (0, None) => warn!("No season stats for {}", entry.name),
                (n, _) => info!("Generated {} card(s) for {}", n, entry.name),
            }
            cards.extend(found);
        }
        Ok(cards)
    }
}

/// Rate one stored season. Missing or unreadable statistics rate 1.
pub fn build_card(name: &str, doc: &Document, thresholds: &ThresholdSet) -> PlayerCard {
    let rating = |stat: Stat| {
        let value = match field_number(doc, stat.field()) {
            Some(Ok(v)) => Some(v),
            Some(Err(text)) => {
                warn!("Unreadable {} value '{}' for {}, rating as missing", stat, text, name);
                None
            }
            None => None,
        };
        rate(stat, thresholds.get(stat), value)
    };

    let card = PlayerCard {
        name: name.to_string(),
        year: field_text(doc, SEASON_FIELD).unwrap_or_default(),
        team: field_text(doc, TEAM_FIELD).unwrap_or_default(),
        position: field_text(doc, POSITION_FIELD).unwrap_or_default(),
        two_point: rating(Stat::TwoPoint),
        three_point: rating(Stat::ThreePoint),
        defensive_rebound: rating(Stat::DefensiveRebound),
        offensive_rebound: rating(Stat::OffensiveRebound),
        assist: rating(Stat::Assist),
        block: rating(Stat::Block),
        steal: rating(Stat::Steal),
        skill: rating(Stat::Turnover),
    };
    debug!("{card}");
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Boundaries, StatThreshold};
    use serde_json::json;

    fn threshold(low: f64, mid: f64, high: f64) -> StatThreshold {
        StatThreshold {
            boundaries: Boundaries::new(low, mid, high),
            filter: None,
        }
    }

    fn fixed_thresholds() -> ThresholdSet {
        ThresholdSet {
            two_point: threshold(0.30, 0.45, 0.60),
            three_point: threshold(0.20, 0.33, 0.40),
            defensive_rebound: threshold(10.0, 15.0, 25.0),
            offensive_rebound: threshold(2.0, 5.0, 10.0),
            assist: threshold(8.0, 13.0, 25.0),
            block: threshold(0.5, 1.2, 3.0),
            steal: threshold(1.0, 1.5, 2.2),
            turnover: threshold(8.0, 14.0, 20.0),
        }
    }

    fn full_doc() -> Document {
        json!({
            "name": "Kevin Garnett",
            "Season": "2004.0",
            "Team": "MIN",
            "Position": "PF",
            "2-Point Field Goal Percentage": "0.61",
            "3-Point Field Goal Percentage": "0.33",
            "Defensive Rebound Percentage": "30.0",
            "Offensive Rebound Percentage": "7.5",
            "Assist Percentage": "24.0",
            "Block Percentage": "3.0",
            "Steal Percentage": "1.6",
            "Turnover Percentage": "8.0"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn rates_every_statistic() {
        let card = build_card("Kevin Garnett", &full_doc(), &fixed_thresholds());
        assert_eq!(card.year, "2004.0");
        assert_eq!(card.team, "MIN");
        assert_eq!(card.position, "PF");
        assert_eq!(card.two_point, 4);
        assert_eq!(card.three_point, 2);
        assert_eq!(card.defensive_rebound, 4);
        assert_eq!(card.offensive_rebound, 3);
        assert_eq!(card.assist, 3);
        assert_eq!(card.block, 3);
        assert_eq!(card.steal, 3);
        assert_eq!(card.skill, 3);
    }

    #[test]
    fn missing_assist_rates_one() {
        let mut doc = full_doc();
        doc.remove("Assist Percentage");
        let card = build_card("Kevin Garnett", &doc, &fixed_thresholds());
        assert_eq!(card.assist, 1);
        assert_eq!(card.two_point, 4);
    }

    #[test]
    fn missing_turnovers_rate_one_not_four() {
        let mut doc = full_doc();
        doc.remove("Turnover Percentage");
        let card = build_card("Kevin Garnett", &doc, &fixed_thresholds());
        assert_eq!(card.skill, 1);
    }

    #[test]
    fn unreadable_value_rates_one() {
        let mut doc = full_doc();
        doc.insert("Block Percentage".into(), json!("n/a"));
        let card = build_card("Kevin Garnett", &doc, &fixed_thresholds());
        assert_eq!(card.block, 1);
    }

    #[test]
    fn nan_turnovers_rate_one_not_four() {
        let mut doc = full_doc();
        doc.insert("Turnover Percentage".into(), json!("nan"));
        let card = build_card("Kevin Garnett", &doc, &fixed_thresholds());
        assert_eq!(card.skill, 1);
    }

    #[test]
    fn missing_identity_fields_are_blank() {
        let doc = json!({"name": "Nobody"}).as_object().cloned().unwrap();
        let card = build_card("Nobody", &doc, &fixed_thresholds());
        assert_eq!(card.team, "");
        assert_eq!(card.position, "");
        assert_eq!(card.year, "");
        for stat in Stat::ALL {
            assert_eq!(card.rating(stat), 1);
        }
    }
}
