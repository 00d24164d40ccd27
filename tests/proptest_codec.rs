//! Property-based tests for the attribute codec and field validators
//!
//! These tests use proptest to check that typed payloads survive a trip
//! through the attribute tree and that validators hold across arbitrary input.

use insightcloudsec::api::types::{
    Badge, BotAction, BotDefinition, BotFilter, BotInstructions, BotSchedule, Insight,
    InsightFilter, JsonMap, TimeOfDay, TIME_OF_DAY_TYPE,
};
use insightcloudsec::codec::{Expand, Flatten};
use insightcloudsec::provider::validate_resource_config;
use insightcloudsec::schema::Validator;
use insightcloudsec::{AttributeTree, Value};
use proptest::prelude::*;

/// Strategy for a platform config map with string values
fn arb_json_map() -> impl Strategy<Value = JsonMap> {
    prop::collection::btree_map("[a-z_]{1,10}", "[a-zA-Z0-9 ]{0,12}", 0..4).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect()
    })
}

fn arb_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9_.]{0,15}", 0..4)
}

fn arb_badge() -> impl Strategy<Value = Badge> {
    ("[a-z]{1,8}", "[a-z0-9]{0,8}").prop_map(|(key, value)| Badge { key, value })
}

fn arb_insight_filter() -> impl Strategy<Value = InsightFilter> {
    ("divvy\\.query\\.[a-z_]{1,20}", arb_json_map(), arb_json_map()).prop_map(
        |(name, config, collections)| InsightFilter {
            name,
            config: Some(config),
            collections: Some(collections),
        },
    )
}

fn arb_insight() -> impl Strategy<Value = Insight> {
    (
        "[A-Za-z][A-Za-z ]{0,20}",
        "[a-z ]{0,20}",
        1i64..=5,
        arb_names(),
        prop::collection::vec(arb_insight_filter(), 1..4),
        arb_names(),
        arb_names(),
        prop::collection::vec(arb_badge(), 0..3),
        prop_oneof![Just("OR".to_string()), Just("AND".to_string())],
    )
        .prop_map(
            |(name, description, severity, resource_types, filters, scopes, tags, badges, op)| {
                Insight {
                    id: 0,
                    name,
                    description,
                    severity,
                    resource_types,
                    filters,
                    scopes,
                    tags,
                    badges,
                    badge_filter_operator: op,
                }
            },
        )
}

fn arb_schedule() -> impl Strategy<Value = BotSchedule> {
    (
        prop_oneof![
            Just("monthly".to_string()),
            Just("weekly".to_string()),
            Just("daily".to_string()),
            Just("hourly".to_string())
        ],
        prop::option::of((0i64..24, 0i64..60, 0i64..60)),
        prop::option::of(1i64..=31),
        prop::collection::vec(0i64..7, 0..3),
    )
        .prop_map(|(kind, time, day_of_month, exclude_days)| BotSchedule {
            kind,
            time_of_day: time.map(|(hour, minute, second)| TimeOfDay {
                kind: TIME_OF_DAY_TYPE.to_string(),
                hour,
                minute,
                second,
            }),
            day_of_month,
            exclude_days,
        })
}

fn arb_instructions() -> impl Strategy<Value = BotInstructions> {
    (
        prop::collection::vec("[a-z]{1,12}", 1..3),
        arb_names(),
        prop::collection::vec(arb_badge(), 0..3),
        prop::collection::vec(
            ("divvy\\.filter\\.[a-z_]{1,12}", arb_json_map())
                .prop_map(|(name, config)| BotFilter { name, config: Some(config) }),
            0..3,
        ),
        prop::collection::vec(
            ("divvy\\.action\\.[a-z_]{1,12}", arb_json_map(), any::<bool>()).prop_map(
                |(name, config, run_when_result_is)| BotAction {
                    name,
                    config: Some(config),
                    run_when_result_is,
                },
            ),
            0..3,
        ),
        prop::option::of(arb_schedule()),
    )
        .prop_map(
            |(resource_types, groups, badges, filters, actions, schedule)| BotInstructions {
                resource_types,
                groups,
                badges,
                filters,
                actions,
                hookpoints: Vec::new(),
                schedule,
            },
        )
}

fn arb_bot_definition() -> impl Strategy<Value = BotDefinition> {
    (
        "[A-Za-z][A-Za-z ]{0,20}",
        prop_oneof![Just("paused".to_string()), Just("running".to_string())],
        prop_oneof![
            Just("Security".to_string()),
            Just("Optimization".to_string()),
            Just("Best Practices".to_string())
        ],
        prop_oneof![
            Just("low".to_string()),
            Just("medium".to_string()),
            Just("high".to_string())
        ],
        prop::option::of("[0-9]{1,4}"),
        arb_instructions(),
    )
        .prop_map(
            |(name, state, category, severity, insight_id, instructions)| BotDefinition {
                name,
                description: String::new(),
                notes: String::new(),
                state,
                badge_scope_operator: "OR".to_string(),
                category,
                severity,
                insight_id,
                instructions,
            },
        )
}

/// Arbitrary tree value, bounded in depth
fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        ".{0,12}".prop_map(Value::Str),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|m| {
                let mut tree = AttributeTree::new();
                for (k, v) in m {
                    tree.insert(k, v);
                }
                Value::Record(tree)
            }),
        ]
    })
}

proptest! {
    /// A flattened insight expands back to the same payload
    #[test]
    fn insight_flatten_then_expand_is_identity(insight in arb_insight()) {
        let tree = insight.flatten();
        let expanded = Insight::expand(&tree).unwrap();
        prop_assert_eq!(expanded, insight);
    }

    /// Insight filters keep their order through the tree
    #[test]
    fn insight_filter_order_preserved(insight in arb_insight()) {
        let expanded = Insight::expand(&insight.flatten()).unwrap();
        let names: Vec<_> = expanded.filters.iter().map(|f| f.name.clone()).collect();
        let original: Vec<_> = insight.filters.iter().map(|f| f.name.clone()).collect();
        prop_assert_eq!(names, original);
    }

    /// A flattened bot definition expands back to the same payload
    #[test]
    fn bot_flatten_then_expand_is_identity(bot in arb_bot_definition()) {
        let tree = bot.flatten();
        let expanded = BotDefinition::expand(&tree).unwrap();
        prop_assert_eq!(expanded, bot);
    }

    /// A generated bot is also a valid configuration
    #[test]
    fn generated_bot_passes_schema(bot in arb_bot_definition()) {
        prop_assert!(validate_resource_config("insightcloudsec_bot", &bot.flatten()).is_ok());
    }

    /// Nil platform maps flatten to empty records, never absent keys
    #[test]
    fn nil_maps_flatten_to_empty_records(name in "divvy\\.query\\.[a-z]{1,10}") {
        let filter = InsightFilter { name, config: None, collections: None };
        let tree = filter.flatten();
        prop_assert_eq!(tree.get("config"), Some(&Value::Record(AttributeTree::new())));
        prop_assert_eq!(tree.get("collections"), Some(&Value::Record(AttributeTree::new())));
    }
}

mod validator_tests {
    use super::*;

    const CLOUD_TYPES: [&str; 3] = ["AWS", "AZURE_ARM", "GCE"];

    proptest! {
        #[test]
        fn one_of_accepts_members(idx in 0usize..3) {
            let validator = Validator::one_of(&CLOUD_TYPES);
            prop_assert!(validator.validate(&Value::Str(CLOUD_TYPES[idx].to_string())).is_ok());
        }

        #[test]
        fn one_of_rejects_non_members(s in "[a-z]{1,10}") {
            let validator = Validator::one_of(&CLOUD_TYPES);
            let reason = validator.validate(&Value::Str(s.clone())).unwrap_err();
            prop_assert_eq!(
                reason.to_string(),
                format!("expected to be one of [AWS, AZURE_ARM, GCE], got {s}")
            );
        }

        #[test]
        fn int_between_matches_range(n in -100i64..100, min in -50i64..0, span in 0i64..50) {
            let max = min + span;
            let accepted = Validator::int_between(min, max).validate(&Value::Int(n)).is_ok();
            prop_assert_eq!(accepted, (min..=max).contains(&n));
        }

        #[test]
        fn int_between_rejects_strings(s in "[0-9]{1,4}") {
            let reason = Validator::int_between(1, 5).validate(&Value::Str(s)).unwrap_err();
            prop_assert_eq!(reason.to_string(), "expected int, got string");
        }

        /// Validators never panic, whatever value they are handed
        #[test]
        fn validators_are_total(value in arb_value()) {
            let validators = [
                Validator::one_of(&CLOUD_TYPES),
                Validator::int_between(900, 43200),
                Validator::matches(r"^[A-Za-z0-9_-]{51}$", "invalid API key").unwrap(),
            ];
            for validator in &validators {
                let _ = validator.validate(&value);
            }
        }

        /// Insight severity is enforced through the registered schema
        #[test]
        fn insight_severity_bounds(severity in -10i64..20) {
            let config = AttributeTree::new()
                .with("name", "Untagged")
                .with("severity", severity)
                .with("resource_types", vec!["instance".to_string()])
                .with(
                    "filter",
                    Value::List(vec![Value::Record(
                        AttributeTree::new().with("name", "divvy.query.resource_tag_missing"),
                    )]),
                );
            let ok = validate_resource_config("insightcloudsec_insight", &config).is_ok();
            prop_assert_eq!(ok, (1..=5).contains(&severity));
        }
    }
}
