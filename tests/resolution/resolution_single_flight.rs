//! Session caching: single-flight, idempotence, cancellation, invalidation.

use std::sync::Arc;
use std::time::Duration;

use depot::{Coordinate, EntryState, ResolutionSession, Resolver};

use crate::fixture::{repository_set, ScriptedAdapter};

fn session_over(adapters: &[(&str, Arc<ScriptedAdapter>)]) -> ResolutionSession {
    let set = repository_set(adapters);
    ResolutionSession::new(Resolver::new(&set).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_walk() {
    let primary = Arc::new(ScriptedAdapter::unreachable("primary").delayed(Duration::from_millis(20)));
    let fallback = Arc::new(
        ScriptedAdapter::serving("fallback", &["lib:core:1.2.0"]).delayed(Duration::from_millis(50)),
    );
    let session = session_over(&[("primary", primary.clone()), ("fallback", fallback.clone())]);
    let coord = Coordinate::parse("lib:core:1.2.0").unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let session = session.clone();
        let coord = coord.clone();
        handles.push(tokio::spawn(async move { session.resolve(&coord).await }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(primary.queries(), 1);
    assert_eq!(fallback.queries(), 1);
    for outcome in &outcomes[1..] {
        assert!(Arc::ptr_eq(&outcomes[0], outcome));
    }
    assert_eq!(outcomes[0].repository, "fallback");
}

#[tokio::test]
async fn test_repeat_resolution_is_identical() {
    let repo = Arc::new(ScriptedAdapter::serving("central", &["lib:core:1.1.0", "lib:core:1.5.0"]));
    let session = session_over(&[("central", repo.clone())]);
    let coord = Coordinate::parse("lib:core:[1.0,2.0)").unwrap();

    let first = session.resolve(&coord).await.unwrap();
    let second = session.resolve(&coord).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(first.as_ref()).unwrap(),
        serde_json::to_vec(second.as_ref()).unwrap()
    );
    assert_eq!(repo.queries(), 1);
    assert_eq!(session.status(&coord), EntryState::Resolved);
}

#[tokio::test]
async fn test_failures_are_cached_until_invalidated() {
    let a = Arc::new(ScriptedAdapter::serving("A", &[]));
    let session = session_over(&[("A", a.clone())]);
    let coord = Coordinate::parse("x:y:1.0").unwrap();

    let first = session.resolve(&coord).await.unwrap_err();
    let second = session.resolve(&coord).await.unwrap_err();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(a.queries(), 1);
    assert_eq!(session.status(&coord), EntryState::Failed);

    assert!(session.invalidate(&coord));
    assert!(!session.invalidate(&coord));
    session.resolve(&coord).await.unwrap_err();
    assert_eq!(a.queries(), 2);
}

#[tokio::test]
async fn test_abandoned_waiter_does_not_cancel_walk() {
    let repo = Arc::new(
        ScriptedAdapter::serving("central", &["lib:core:1.0"]).delayed(Duration::from_millis(100)),
    );
    let session = session_over(&[("central", repo.clone())]);
    let coord = Coordinate::parse("lib:core:1.0").unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(5), session.resolve(&coord)).await;
    assert!(abandoned.is_err());
    assert_eq!(session.status(&coord), EntryState::Resolving);

    let artifact = session.resolve(&coord).await.unwrap();
    assert_eq!(artifact.repository, "central");
    assert_eq!(repo.queries(), 1);
}

#[tokio::test]
async fn test_resolve_all_keeps_request_order() {
    let repo = Arc::new(ScriptedAdapter::serving(
        "central",
        &["a:one:1.0", "b:two:2.0", "c:three:3.0"],
    ));
    let session = session_over(&[("central", repo.clone())]);
    let coords: Vec<Coordinate> = ["c:three:3.0", "a:one:1.0", "missing:dep:1.0", "a:one:1.0"]
        .iter()
        .map(|c| Coordinate::parse(c).unwrap())
        .collect();

    let outcomes = session.resolve_all(&coords).await;
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[0].as_ref().unwrap().version.as_str(), "3.0");
    assert_eq!(outcomes[1].as_ref().unwrap().version.as_str(), "1.0");
    assert!(outcomes[2].is_err());
    assert!(Arc::ptr_eq(
        outcomes[1].as_ref().unwrap(),
        outcomes[3].as_ref().unwrap()
    ));
    assert_eq!(repo.queries(), 3);
    assert_eq!(session.len(), 3);
}

#[tokio::test]
async fn test_invalidate_all_clears_session() {
    let repo = Arc::new(ScriptedAdapter::serving("central", &["lib:core:1.0"]));
    let session = session_over(&[("central", repo.clone())]);
    let coord = Coordinate::parse("lib:core:1.0").unwrap();

    session.resolve(&coord).await.unwrap();
    assert!(session.cached(&coord).is_some());

    session.invalidate_all();
    assert!(session.is_empty());
    assert_eq!(session.status(&coord), EntryState::Idle);

    session.resolve(&coord).await.unwrap();
    assert_eq!(repo.queries(), 2);
}

#[tokio::test]
async fn test_invalidate_keeps_unreachable_repositories_skipped() {
    let primary = Arc::new(ScriptedAdapter::unreachable("primary"));
    let session = session_over(&[("primary", primary.clone())]);
    let coord = Coordinate::parse("lib:core:1.0").unwrap();

    session.resolve(&coord).await.unwrap_err();
    assert_eq!(primary.queries(), 1);

    session.invalidate(&coord);
    let failure = session.resolve(&coord).await.unwrap_err();
    assert_eq!(primary.queries(), 1);
    assert_eq!(failure.attempts[0].repository, "primary");

    session.resolver().reset_reachability();
    session.invalidate(&coord);
    session.resolve(&coord).await.unwrap_err();
    assert_eq!(primary.queries(), 2);
}
