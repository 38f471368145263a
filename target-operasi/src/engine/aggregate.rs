use amr_client::domain::IndicatorResult;

use crate::config::ThresholdConfig;

/// `(indicator_count, score)` for one record.
///
/// A plain sum over enabled, raised indicators in catalog order, so adding
/// or removing a rule only changes the totals. With the default uniform
/// weight of 1 the score equals the count.
pub fn aggregate(result: &IndicatorResult, cfg: &ThresholdConfig) -> (usize, f64) {
    result
        .raised()
        .filter(|i| cfg.is_enabled(*i))
        .fold((0, 0.0), |(count, score), i| (count + 1, score + cfg.weight(i)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdSettings;
    use amr_client::domain::Indicator;

    #[test]
    fn uniform_weight_scores_equal_count() {
        let result: IndicatorResult = [Indicator::VDrop, Indicator::UnbalanceI, Indicator::Freeze]
            .into_iter()
            .collect();
        assert_eq!(aggregate(&result, &ThresholdConfig::default()), (3, 3.0));
    }

    #[test]
    fn per_indicator_weights_override_the_uniform_weight() {
        let mut settings = ThresholdSettings {
            weight: 5.0,
            ..Default::default()
        };
        settings.weights.insert("in_more_Imax".to_string(), 20.0);
        let cfg = settings.build().unwrap();

        let result: IndicatorResult = [Indicator::VDrop, Indicator::InMoreImax].into_iter().collect();
        assert_eq!(aggregate(&result, &cfg), (2, 25.0));
    }

    #[test]
    fn disabled_indicators_do_not_count() {
        let settings = ThresholdSettings {
            disabled: vec!["freeze".to_string()],
            ..Default::default()
        };
        let result: IndicatorResult = [Indicator::VDrop, Indicator::Freeze].into_iter().collect();
        assert_eq!(aggregate(&result, &settings.build().unwrap()), (1, 1.0));
    }

    #[test]
    fn nothing_raised_scores_zero() {
        assert_eq!(aggregate(&IndicatorResult::default(), &ThresholdConfig::default()), (0, 0.0));
    }
}
