pub mod mapping;
pub mod registry;

use serde::Serialize;

use crate::core::tags::Categories;
use mapping::{ChannelMapping, ChannelRule};
use registry::{WebhookRegistry, DEFAULT_CHANNEL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub channel: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingResult {
    /// Matched channel names in mapping definition order.
    pub matched: Vec<String>,
    pub destinations: Vec<Destination>,
    pub default_fired: bool,
    /// Required channels with no registered webhook, `default` included.
    pub unresolved: Vec<String>,
}

fn rule_matches(categories: &Categories, rule: &ChannelRule) -> bool {
    !categories.marchitecture.is_disjoint(&rule.marchitecture)
        || !categories.products.is_disjoint(&rule.products)
}

/// Every channel whose marchitecture or product set overlaps the entry's,
/// in definition order. Each channel appears at most once.
pub fn match_channels<'m>(categories: &Categories, mapping: &'m ChannelMapping) -> Vec<&'m str> {
    mapping
        .rules()
        .iter()
        .filter(|rule| rule_matches(categories, rule))
        .map(|rule| rule.name.as_str())
        .collect()
}

pub fn route(
    categories: &Categories,
    mapping: &ChannelMapping,
    registry: &WebhookRegistry,
) -> RoutingResult {
    let matched = match_channels(categories, mapping);
    let mut result = RoutingResult {
        matched: matched.iter().map(ToString::to_string).collect(),
        default_fired: matched.is_empty(),
        ..RoutingResult::default()
    };

    let required: Vec<&str> = if result.default_fired {
        vec![DEFAULT_CHANNEL]
    } else {
        matched
    };

    for channel in required {
        match registry.url_for(channel) {
            Some(url) => result.destinations.push(Destination {
                channel: channel.to_string(),
                url: url.to_string(),
            }),
            None => result.unresolved.push(channel.to_string()),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tags::parse_tag_term;
    use std::collections::BTreeSet;

    fn mapping() -> ChannelMapping {
        ChannelMapping::new(vec![
            ChannelRule::new("analytics", ["analytics"], Vec::<String>::new()),
            ChannelRule::new(
                "containers",
                ["containers"],
                ["amazon-ecs", "amazon-eks"],
            ),
            ChannelRule::new("security", ["security-identity-compliance"], ["amazon-guardduty"]),
            ChannelRule::new("machine-learning", ["artificial-intelligence"], ["sagemaker"]),
        ])
        .expect("mapping must be valid")
    }

    fn registry() -> WebhookRegistry {
        [
            ("analytics", "https://hooks.example/analytics"),
            ("containers", "https://hooks.example/containers"),
            ("machine-learning", "https://hooks.example/ml"),
            ("default", "https://hooks.example/default"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn product_overlap_selects_channel() {
        let categories = parse_tag_term("general:products/amazon-ecs");
        let result = route(&categories, &mapping(), &registry());

        assert_eq!(result.matched, vec!["containers"]);
        assert!(!result.default_fired);
        assert_eq!(
            result.destinations,
            vec![Destination {
                channel: "containers".to_string(),
                url: "https://hooks.example/containers".to_string(),
            }]
        );
    }

    #[test]
    fn unknown_topic_falls_back_to_default() {
        let categories = parse_tag_term("marketing:marchitecture/unknown-topic");
        let result = route(&categories, &mapping(), &registry());

        assert!(result.matched.is_empty());
        assert!(result.default_fired);
        assert_eq!(result.destinations.len(), 1);
        assert_eq!(result.destinations[0].channel, "default");
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn fans_out_to_every_matching_channel_in_definition_order() {
        let categories = parse_tag_term(
            "general:products/sagemaker,marketing:marchitecture/analytics",
        );
        let result = route(&categories, &mapping(), &registry());

        assert_eq!(result.matched, vec!["analytics", "machine-learning"]);
        assert_eq!(result.destinations.len(), 2);
    }

    #[test]
    fn channel_matching_both_ways_fires_once() {
        let categories = parse_tag_term(
            "general:products/amazon-eks,marketing:marchitecture/containers,general:products/amazon-ecs",
        );
        let result = route(&categories, &mapping(), &registry());

        assert_eq!(result.matched, vec!["containers"]);
        assert_eq!(result.destinations.len(), 1);
    }

    #[test]
    fn unregistered_channel_does_not_block_siblings_or_trigger_default() {
        let categories = parse_tag_term(
            "general:products/amazon-guardduty,general:products/amazon-ecs",
        );
        let result = route(&categories, &mapping(), &registry());

        assert_eq!(result.matched, vec!["containers", "security"]);
        assert_eq!(result.unresolved, vec!["security"]);
        assert!(!result.default_fired);
        assert_eq!(result.destinations.len(), 1);
        assert_eq!(result.destinations[0].channel, "containers");
    }

    #[test]
    fn unregistered_channel_alone_still_suppresses_default() {
        let categories = parse_tag_term("marketing:marchitecture/security-identity-compliance");
        let result = route(&categories, &mapping(), &registry());

        assert!(!result.default_fired);
        assert!(result.destinations.is_empty());
        assert_eq!(result.unresolved, vec!["security"]);
    }

    #[test]
    fn missing_default_is_reported_as_unresolved() {
        let registry: WebhookRegistry = [("containers", "https://hooks.example/containers")]
            .into_iter()
            .collect();
        let categories = parse_tag_term("marketing:industry/retail");
        let result = route(&categories, &mapping(), &registry);

        assert!(result.default_fired);
        assert!(result.destinations.is_empty());
        assert_eq!(result.unresolved, vec!["default"]);
    }

    #[test]
    fn use_case_and_industry_tags_never_match() {
        let categories = parse_tag_term("general:use-case/analytics,marketing:industry/containers");
        assert!(match_channels(&categories, &mapping()).is_empty());
    }

    #[test]
    fn matched_set_equals_intersection_definition() {
        let mapping = mapping();
        let inputs = [
            "",
            "general:products/amazon-ecs",
            "marketing:marchitecture/analytics,general:products/sagemaker",
            "general:products/amazon-guardduty,marketing:marchitecture/containers",
            "marketing:marchitecture/artificial-intelligence,marketing:marchitecture/analytics,general:products/amazon-eks",
        ];

        for raw in inputs {
            let categories = parse_tag_term(raw);
            let expected: BTreeSet<&str> = mapping
                .rules()
                .iter()
                .filter(|rule| {
                    categories.marchitecture.intersection(&rule.marchitecture).count() > 0
                        || categories.products.intersection(&rule.products).count() > 0
                })
                .map(|rule| rule.name.as_str())
                .collect();
            let actual: BTreeSet<&str> = match_channels(&categories, &mapping).into_iter().collect();

            assert_eq!(actual, expected, "input: {raw}");
            assert_eq!(
                route(&categories, &mapping, &registry()).default_fired,
                expected.is_empty()
            );
        }
    }

    #[test]
    fn routing_is_repeatable() {
        let mapping = mapping();
        let registry = registry();
        let categories = parse_tag_term("general:products/amazon-ecs,general:products/sagemaker");

        let first = route(&categories, &mapping, &registry);
        let second = route(&categories, &mapping, &registry);
        assert_eq!(first, second);
    }
}
