use crate::pipeline::{Envelope, PipelineError, Transform};
use amr_client::domain::MeterRecord;

/// Pure normalization of a `MeterRecord` before scoring.
///
/// Rules:
/// - the identifier is trimmed and must not be empty (spreadsheet rows without
///   IDPEL / LOCATION_CODE are dropped);
/// - NaN and infinite readings become 0.
pub fn normalize_meter_record(env: Envelope<MeterRecord>) -> Result<Envelope<MeterRecord>, PipelineError> {
    let m = &env.payload;

    if m.id.trim().is_empty() {
        return Err(PipelineError::Transform("record has no IDPEL or LOCATION_CODE".to_string()));
    }

    let coerced = m.non_finite_count();
    if coerced > 0 {
        metrics::counter!("meter_values_coerced_total").increment(coerced as u64);
        tracing::debug!(id = %m.id, coerced, "non-finite readings replaced with 0");
    }

    Ok(Envelope {
        payload: m.normalized(),
        received_at: env.received_at,
    })
}

#[derive(Clone, Default)]
pub struct MeterRecordNormalization;

#[async_trait::async_trait]
impl Transform<MeterRecord, MeterRecord> for MeterRecordNormalization {
    async fn apply(&self, input: Envelope<MeterRecord>) -> Result<Envelope<MeterRecord>, PipelineError> {
        match normalize_meter_record(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("meter_records_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_identifier_and_zeroes_non_finite_values() {
        let env = Envelope::new(MeterRecord::new(" 5150 ").with_current([f64::NAN, 1.0, f64::INFINITY]));

        let out = normalize_meter_record(env).unwrap();
        assert_eq!(out.payload.id, "5150");
        assert_eq!(out.payload.current, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn normalization_rejects_blank_identifier() {
        let env = Envelope::new(MeterRecord::new("   "));

        let res = normalize_meter_record(env);
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[tokio::test]
    async fn transform_passes_valid_records_through() {
        let record = MeterRecord::new("1").with_voltage([230.0, 230.0, 230.0]);
        let out = MeterRecordNormalization.apply(Envelope::new(record.clone())).await.unwrap();
        assert_eq!(out.payload, record);
    }
}
