// ABOUTME: Integration tests for identifiers, image references, naming, and ordered maps.
// ABOUTME: Includes property tests for the runtime-safe name alphabet.

use bosun::types::*;
use proptest::prelude::*;

mod image_ref_tests {
    use super::*;

    #[test]
    fn parse_simple_name_defaults_to_latest() {
        let img = ImageRef::parse("nginx").unwrap();
        assert_eq!(img.name(), "nginx");
        assert_eq!(img.tag(), Some("latest"));
        assert!(img.registry().is_none());
        assert!(img.digest().is_none());
    }

    #[test]
    fn parse_with_registry_and_org() {
        let img = ImageRef::parse("ghcr.io/acme/shop-web:2.1.0").unwrap();
        assert_eq!(img.registry(), Some("ghcr.io"));
        assert_eq!(img.name(), "acme/shop-web");
        assert_eq!(img.tag(), Some("2.1.0"));
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        let img = ImageRef::parse("localhost:5000/app").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "app");
        assert_eq!(img.tag(), Some("latest"));
    }

    #[test]
    fn digest_without_tag_has_no_tag() {
        let img = ImageRef::parse("nginx@sha256:abc123").unwrap();
        assert_eq!(img.digest(), Some("sha256:abc123"));
        assert!(img.tag().is_none());
    }

    #[test]
    fn rejects_empty_and_invalid() {
        assert!(matches!(ImageRef::parse("  "), Err(ParseImageRefError::Empty)));
        assert!(matches!(
            ImageRef::parse("bad image"),
            Err(ParseImageRefError::InvalidChar(' '))
        ));
        assert!(ImageRef::parse("nginx:").is_err());
    }

    #[test]
    fn display_round_trips_the_reference() {
        let img = ImageRef::parse("ghcr.io/org/repo:v1@sha256:abc").unwrap();
        assert_eq!(img.to_string(), "ghcr.io/org/repo:v1@sha256:abc");
    }
}

mod id_tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(EnvironmentId::new("env-1"), EnvironmentId::new("env-1"));
        assert_ne!(EnvironmentId::new("env-1"), EnvironmentId::new("env-2"));
        assert_eq!(DeploymentId::new("d").to_string(), "d");
    }

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: HashSet<DeploymentId> = (0..100).map(|_| DeploymentId::generate()).collect();
        assert_eq!(ids.len(), 100);
    }
}

mod ordered_map_tests {
    use super::*;

    #[test]
    fn preserves_yaml_order_and_replaces_in_place() {
        let mut map: OrderedMap<u32> = serde_yaml::from_str("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);

        assert_eq!(map.insert("alpha", 20), Some(2));
        assert_eq!(map.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
        assert_eq!(map["alpha"], 20);
        assert_eq!(map.position("mid"), Some(2));
    }

    #[test]
    fn null_section_is_an_empty_map() {
        let map: OrderedMap<u32> = serde_yaml::from_str("~").unwrap();
        assert!(map.is_empty());
    }
}

mod naming_tests {
    use super::*;

    proptest! {
        #[test]
        fn output_stays_in_runtime_alphabet(input in ".{0,40}") {
            let name = docker_safe_name(&input);
            prop_assert!(!name.is_empty());
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')));
            prop_assert!(!name.contains("__"));
            prop_assert!(!name.ends_with('_') || name == "_");
        }

        #[test]
        fn sanitizing_is_idempotent(input in "[a-zA-Z0-9 ._!-]{1,30}") {
            let once = docker_safe_name(&input);
            prop_assert_eq!(docker_safe_name(&once), once.clone());
        }

        #[test]
        fn clean_names_pass_through(input in "[a-z][a-z0-9-]{0,20}[a-z0-9]") {
            prop_assert_eq!(docker_safe_name(&input), input);
        }
    }

    #[test]
    fn scoped_names_use_the_stack_prefix() {
        assert_eq!(scoped_name("shop", "dbdata"), "shop_dbdata");
        assert_eq!(scoped_name("My Shop", "front"), "My_Shop_front");
    }
}
