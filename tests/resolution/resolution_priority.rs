//! Declaration order decides which repository supplies an artifact.

use std::sync::Arc;

use depot::{AttemptOutcome, ContentLocation, Coordinate, Reachability, Resolver};

use crate::fixture::{repository_set, ScriptedAdapter};

#[tokio::test]
async fn test_first_repository_wins() {
    let primary = Arc::new(ScriptedAdapter::serving("primary", &["lib:core:1.0"]));
    let fallback = Arc::new(ScriptedAdapter::serving("fallback", &["lib:core:1.0"]));
    let set = repository_set(&[("primary", primary.clone()), ("fallback", fallback.clone())]);
    let resolver = Resolver::new(&set).unwrap();

    let artifact = resolver.resolve_str("lib:core:1.0").await.unwrap();
    assert_eq!(artifact.repository, "primary");
    assert_eq!(primary.queries(), 1);
    assert_eq!(fallback.queries(), 0);
}

#[tokio::test]
async fn test_lower_priority_better_match_is_ignored() {
    let primary = Arc::new(ScriptedAdapter::serving("primary", &["lib:core:1.1.0"]));
    let fallback = Arc::new(ScriptedAdapter::serving(
        "fallback",
        &["lib:core:1.1.0", "lib:core:1.9.0"],
    ));
    let set = repository_set(&[("primary", primary), ("fallback", fallback.clone())]);
    let resolver = Resolver::new(&set).unwrap();

    let artifact = resolver.resolve_str("lib:core:[1.0,2.0)").await.unwrap();
    assert_eq!(artifact.repository, "primary");
    assert_eq!(artifact.version.as_str(), "1.1.0");
    assert_eq!(fallback.queries(), 0);
}

#[tokio::test]
async fn test_range_selects_highest_version() {
    let repo = Arc::new(ScriptedAdapter::serving(
        "central",
        &["lib:core:1.1.0", "lib:core:1.5.0", "lib:core:2.0.0"],
    ));
    let set = repository_set(&[("central", repo)]);
    let resolver = Resolver::new(&set).unwrap();

    let artifact = resolver.resolve_str("lib:core:[1.0,2.0)").await.unwrap();
    assert_eq!(artifact.version.as_str(), "1.5.0");
    assert_eq!(
        artifact.location,
        ContentLocation::Url("mem://central/lib:core/1.5.0/0".into())
    );
}

#[tokio::test]
async fn test_dynamic_version_selects_highest_prefix_match() {
    let repo = Arc::new(ScriptedAdapter::serving(
        "central",
        &["org.jetbrains.kotlin:kotlin-gradle-plugin:2.0.9", "org.jetbrains.kotlin:kotlin-gradle-plugin:2.0.20", "org.jetbrains.kotlin:kotlin-gradle-plugin:2.1.0"],
    ));
    let set = repository_set(&[("central", repo)]);
    let resolver = Resolver::new(&set).unwrap();

    let artifact = resolver
        .resolve_str("org.jetbrains.kotlin:kotlin-gradle-plugin:2.0.+")
        .await
        .unwrap();
    assert_eq!(artifact.version.as_str(), "2.0.20");
}

#[tokio::test]
async fn test_unreachable_primary_falls_back() {
    let primary = Arc::new(ScriptedAdapter::unreachable("primary"));
    let fallback = Arc::new(ScriptedAdapter::serving("fallback", &["lib:core:1.2.0"]));
    let set = repository_set(&[("primary", primary), ("fallback", fallback)]);
    let resolver = Resolver::new(&set).unwrap();

    let artifact = resolver.resolve_str("lib:core:1.2.0").await.unwrap();
    assert_eq!(artifact.repository, "fallback");

    let trail: Vec<_> = artifact
        .attempts
        .iter()
        .map(|a| (a.repository.as_str(), &a.outcome))
        .collect();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].0, "primary");
    assert!(matches!(trail[0].1, AttemptOutcome::Unreachable(_)));
    assert_eq!(trail[1], ("fallback", &AttemptOutcome::Success));

    assert_eq!(resolver.reachability("primary"), Some(Reachability::Unreachable));
    assert_eq!(resolver.reachability("fallback"), Some(Reachability::Reachable));
}

#[tokio::test]
async fn test_unreachable_repository_skipped_for_rest_of_session() {
    let primary = Arc::new(ScriptedAdapter::unreachable("primary"));
    let fallback = Arc::new(ScriptedAdapter::serving(
        "fallback",
        &["lib:core:1.0", "lib:extra:1.0"],
    ));
    let set = repository_set(&[("primary", primary.clone()), ("fallback", fallback)]);
    let resolver = Resolver::new(&set).unwrap();

    resolver.resolve_str("lib:core:1.0").await.unwrap();
    let second = resolver.resolve_str("lib:extra:1.0").await.unwrap();

    assert_eq!(primary.queries(), 1);
    assert!(matches!(
        second.attempts[0].outcome,
        AttemptOutcome::Unreachable(_)
    ));

    resolver.reset_reachability();
    assert_eq!(resolver.reachability("primary"), Some(Reachability::Unknown));
    resolver.resolve_str("lib:core:1.0").await.unwrap();
    assert_eq!(primary.queries(), 2);
}

#[tokio::test]
async fn test_new_resolver_starts_with_unknown_reachability() {
    let primary = Arc::new(ScriptedAdapter::unreachable("primary"));
    let fallback = Arc::new(ScriptedAdapter::serving("fallback", &["lib:core:1.0"]));
    let set = repository_set(&[("primary", primary.clone()), ("fallback", fallback)]);

    let first = Resolver::new(&set).unwrap();
    first.resolve_str("lib:core:1.0").await.unwrap();

    let second = Resolver::new(&set).unwrap();
    assert_eq!(second.reachability("primary"), Some(Reachability::Unknown));
    second.resolve_str("lib:core:1.0").await.unwrap();
    assert_eq!(primary.queries(), 2);
}

#[tokio::test]
async fn test_equal_coordinates_share_normalized_form() {
    let repo = Arc::new(ScriptedAdapter::serving("central", &["lib:core:1.5.0"]));
    let set = repository_set(&[("central", repo)]);
    let resolver = Resolver::new(&set).unwrap();

    let spaced = Coordinate::parse("lib:core:[1.0, 2.0)").unwrap();
    let artifact = resolver.resolve(&spaced).await.unwrap();
    assert_eq!(artifact.coordinate.to_string(), "lib:core:[1.0,2.0)");
}
