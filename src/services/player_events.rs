use std::collections::HashSet;

use crate::config::ScoringTables;
use crate::models::{AnalysisFocus, PlayerEvent, PlayerPrediction, PlayerPredictionResult, PredictionType};
use crate::services::modifiers::apply_focus_multiplier;

/// Score each player prediction against the actual events. A prediction is
/// correct when an event with the same player id and type exists.
pub fn score_player_predictions(
    predictions: &[PlayerPrediction],
    events: &[PlayerEvent],
    focus: AnalysisFocus,
    tables: &ScoringTables,
) -> Vec<PlayerPredictionResult> {
    let happened: HashSet<(&str, PredictionType)> = events
        .iter()
        .map(|e| (e.player_id.as_str(), e.event_type))
        .collect();

    predictions
        .iter()
        .map(|prediction| {
            let correct = happened.contains(&(prediction.player_id.as_str(), prediction.prediction_type));
            let base_points = if correct {
                tables.player_points.points(prediction.prediction_type)
            } else {
                0.0
            };
            let points = apply_focus_multiplier(
                base_points,
                prediction.prediction_type,
                focus,
                &tables.focus,
            );

            PlayerPredictionResult {
                player_id: prediction.player_id.clone(),
                prediction_type: prediction.prediction_type,
                correct,
                base_points,
                points,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(player: &str, prediction_type: PredictionType) -> PlayerPrediction {
        PlayerPrediction {
            player_id: player.to_string(),
            prediction_type,
        }
    }

    fn event(player: &str, event_type: PredictionType) -> PlayerEvent {
        PlayerEvent {
            player_id: player.to_string(),
            event_type,
        }
    }

    #[test]
    fn test_requires_matching_player_and_type() {
        let tables = ScoringTables::default();
        let predictions = vec![
            prediction("kane", PredictionType::Goal),
            prediction("kane", PredictionType::YellowCard),
            prediction("saka", PredictionType::Goal),
        ];
        let events = vec![
            event("kane", PredictionType::Goal),
            event("saka", PredictionType::Assist),
        ];

        let results = score_player_predictions(&predictions, &events, AnalysisFocus::Squad, &tables);
        assert_eq!(results.len(), 3);
        assert!(results[0].correct);
        assert_eq!(results[0].points, 5.0);
        assert!(!results[1].correct);
        assert_eq!(results[1].points, 0.0);
        assert!(!results[2].correct);
    }

    #[test]
    fn test_focus_uses_prediction_type_as_key() {
        let tables = ScoringTables::default();
        let predictions = vec![
            prediction("rice", PredictionType::ManOfTheMatch),
            prediction("rice", PredictionType::Goal),
        ];
        let events = vec![
            event("rice", PredictionType::ManOfTheMatch),
            event("rice", PredictionType::Goal),
        ];

        let results = score_player_predictions(&predictions, &events, AnalysisFocus::Squad, &tables);
        assert_eq!(results[0].base_points, 8.0);
        assert!((results[0].points - 8.0 * 1.8).abs() < 1e-9);
        assert_eq!(results[1].points, 5.0);
    }

    #[test]
    fn test_empty_events_score_nothing() {
        let tables = ScoringTables::default();
        let predictions = vec![prediction("kane", PredictionType::RedCard)];
        let results = score_player_predictions(&predictions, &[], AnalysisFocus::Defense, &tables);
        assert_eq!(results[0].points, 0.0);
        assert!(!results[0].correct);
    }
}
