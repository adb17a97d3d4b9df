//! Vehicle Count Decoding
//!
//! Counts arrive as JSON numbers; whole floats such as `90.0` are accepted
//! and fractional ones rejected.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum WireCount {
    Integer(i64),
    Float(f64),
}

impl WireCount {
    fn into_count<E: Error>(self) -> Result<i64, E> {
        match self {
            WireCount::Integer(n) => Ok(n),
            WireCount::Float(x)
                if x.fract() == 0.0 && x >= i64::MIN as f64 && x <= i64::MAX as f64 =>
            {
                Ok(x as i64)
            }
            WireCount::Float(x) => Err(E::custom(format!(
                "vehicle_count must be a whole number, got {}",
                x
            ))),
        }
    }
}

pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    WireCount::deserialize(deserializer)?.into_count()
}

pub(crate) fn deserialize_optional_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<WireCount>::deserialize(deserializer)?
        .map(WireCount::into_count)
        .transpose()
}

#[cfg(test)]
mod tests {
    use crate::{PredictPayload, SensorPayload};

    #[test]
    fn test_whole_float_count() {
        let payload: PredictPayload = serde_json::from_str(
            r#"{"intersection_id": "I-1", "speed_avg": 10.0, "vehicle_count": 90.0}"#,
        )
        .unwrap();
        assert_eq!(payload.vehicle_count, 90);
    }

    #[test]
    fn test_fractional_count_rejected() {
        let result: Result<PredictPayload, _> = serde_json::from_str(
            r#"{"intersection_id": "I-1", "speed_avg": 10.0, "vehicle_count": 90.5}"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("whole number"));
    }

    #[test]
    fn test_optional_count() {
        let payload: SensorPayload =
            serde_json::from_str(r#"{"sensor_id": "loop-1", "vehicle_count": 12.0}"#).unwrap();
        assert_eq!(payload.vehicle_count, Some(12));

        let payload: SensorPayload = serde_json::from_str(r#"{"sensor_id": "loop-1"}"#).unwrap();
        assert_eq!(payload.vehicle_count, None);

        let payload: SensorPayload =
            serde_json::from_str(r#"{"sensor_id": "loop-1", "vehicle_count": null}"#).unwrap();
        assert_eq!(payload.vehicle_count, None);
    }
}
