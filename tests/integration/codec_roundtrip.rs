//! Batch envelope codec properties

use apmz::error::CodecError;
use apmz::telemetry::{decode, encode, MetricTelemetry, SeverityLevel, Telemetry, TraceTelemetry};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn properties() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,8}", "[ -~]{0,16}", 0..4)
}

fn telemetry() -> impl Strategy<Value = Telemetry> {
    let trace = ("[ -~]{0,40}", 0u8..5, properties()).prop_map(|(message, level, props)| {
        let severity = SeverityLevel::try_from(level).unwrap();
        Telemetry::from(TraceTelemetry::new(message, severity)).with_properties(props)
    });
    let finite = prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO;
    let metric = ("[a-zA-Z_.]{1,20}", finite, properties()).prop_map(|(name, value, props)| {
        Telemetry::from(MetricTelemetry::new(name, value)).with_properties(props)
    });
    prop_oneof![trace, metric]
}

proptest! {
    #[test]
    fn prop_encoded_items_decode_to_the_same_item(item in telemetry()) {
        let line = encode(&item).unwrap();
        prop_assert!(!line.contains('\n'));
        let event = decode(&line).unwrap();
        prop_assert_eq!(event.event_type(), item.kind());
        prop_assert_eq!(event.into_item(), item);
    }
}

#[test]
fn test_values_needing_every_digit_survive() {
    for value in [2931.3555722177434, 0.1 + 0.2, f64::MAX, f64::MIN_POSITIVE, 5e-324] {
        let item = Telemetry::from(MetricTelemetry::new("m", value));
        assert_eq!(decode(&encode(&item).unwrap()).unwrap().into_item(), item, "{value}");
    }
}

#[test]
fn test_non_finite_metric_refused_by_encoder() {
    let item = Telemetry::from(MetricTelemetry::new("m", f64::NAN));
    assert!(matches!(encode(&item), Err(CodecError::NonFiniteValue { .. })));
}

#[test]
fn test_unknown_discriminator_rejected() {
    let err = decode(r#"{"type":"RequestTelemetry","item":{}}"#).unwrap_err();
    assert!(matches!(err, CodecError::UnknownType(t) if t == "RequestTelemetry"));
}

#[test]
fn test_missing_discriminator_rejected() {
    assert!(matches!(
        decode(r#"{"item":{"Name":"m","Value":1}}"#).unwrap_err(),
        CodecError::MissingType
    ));
}
