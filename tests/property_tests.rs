//! Property-based and fuzz-style tests using proptest.
//!
//! Properties cover the variable grammar, the embedded scanner, binary
//! fidelity and string coercion. Fuzz tests feed arbitrary bytes to every
//! codec's decoder and arbitrary text to the parser and scanner, which
//! must never panic.

use proptest::prelude::*;
use serde_json::json;

use tc_playbook::codec::{codec_for, Payload, TypedValue};
use tc_playbook::resolver::scan;
use tc_playbook::variable::{parse, type_of};
use tc_playbook::{Variable, VariableType};

// ─── Arbitrary Strategies ───────────────────────────────────────────────────

fn arb_standard_type() -> impl Strategy<Value = VariableType> {
    prop::sample::select(VariableType::STANDARD.to_vec())
}

fn arb_variable() -> impl Strategy<Value = Variable> {
    (
        "[A-Za-z]{1,12}",
        "[0-9]{1,6}",
        "[A-Za-z0-9_.\\-\\[\\]]{1,24}",
        arb_standard_type(),
    )
        .prop_map(|(app, job, key, t)| Variable::new(app, job, key, t))
}

// ─── Grammar Properties ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_variable_display_parses_back(var in arb_variable()) {
        let text = var.to_string();
        prop_assert_eq!(parse(&text), Some(var.clone()));
        prop_assert_eq!(type_of(&text), var.variable_type().clone());
    }

    #[test]
    fn prop_parse_never_panics(text in ".{0,200}") {
        let _ = parse(&text);
        let _ = type_of(&text);
    }

    #[test]
    fn prop_text_without_markers_is_literal(text in "[^#&$]{0,200}") {
        prop_assert!(parse(&text).is_none());
        prop_assert_eq!(type_of(&text), VariableType::String);
        prop_assert!(scan(&text).is_empty());
    }

    #[test]
    fn prop_scan_ranges_are_ordered_slices(
        prefix in "[a-z ]{0,20}",
        var in arb_variable(),
        suffix in "[ ,;]{1,3}[a-z ]{0,20}",
    ) {
        let text = format!("{prefix}{var}{suffix}{var}");
        let found = scan(&text);
        prop_assert_eq!(found.len(), 2);
        prop_assert!(found[0].range.end <= found[1].range.start);
        for m in &found {
            prop_assert_eq!(&text[m.range.clone()], var.to_string());
        }
    }

    #[test]
    fn prop_scan_never_panics(text in ".{0,300}") {
        for m in scan(&text) {
            prop_assert!(text.get(m.range.clone()).is_some());
        }
    }
}

// ─── Codec Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_binary_fidelity(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let codec = codec_for(&VariableType::Binary);
        let stored = codec.encode(Payload::Bytes(bytes.clone()), true).unwrap();
        prop_assert!(stored.iter().all(u8::is_ascii));
        prop_assert_eq!(codec.decode(&stored).unwrap(), Some(TypedValue::Binary(bytes)));
    }

    #[test]
    fn prop_integers_coerce_to_decimal_text(n in any::<i64>()) {
        let codec = codec_for(&VariableType::String);
        let stored = codec.encode(Payload::from(n), true).unwrap();
        prop_assert_eq!(codec.decode(&stored).unwrap(), Some(TypedValue::String(n.to_string())));
    }

    #[test]
    fn prop_string_array_preserves_length(items in prop::collection::vec(proptest::option::of(".{0,20}"), 0..20)) {
        let codec = codec_for(&VariableType::StringArray);
        let payload = Payload::list(items.clone());
        let stored = codec.encode(payload, true).unwrap();
        prop_assert_eq!(codec.decode(&stored).unwrap(), Some(TypedValue::StringArray(items)));
    }

    #[test]
    fn prop_key_value_requires_value(key in "[a-z]{1,10}") {
        let codec = codec_for(&VariableType::KeyValue);
        let err = codec.encode(Payload::from(json!({ "key": key })), true).unwrap_err();
        prop_assert!(err.is_invalid_data());
    }
}

// ─── Fuzz Decoding ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn fuzz_decode_arbitrary_bytes(
        t in arb_standard_type(),
        raw in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let _ = codec_for(&t).decode(&raw);
    }

    #[test]
    fn fuzz_decode_arbitrary_json(t in arb_standard_type(), n in any::<i64>(), s in ".{0,40}") {
        for value in [json!(n), json!(s), json!([s, n]), json!({"k": s}), json!(null)] {
            let raw = serde_json::to_vec(&value).unwrap();
            let _ = codec_for(&t).decode(&raw);
        }
    }
}
