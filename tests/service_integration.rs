//! Service integration tests: event loop, name lease, export and lifecycle
//! driven end to end over an in-memory bus.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{s, service_with, strs, DocsProvider, NameOp};
use pretty_assertions::assert_eq;
use search_provider::ipc::{Arg, CallFrame, Reply, ReplyBody};
use search_provider::provider::ResultMeta;
use search_provider::types::{error_names, ServiceIdentity, DEFAULT_BUS_NAME};
use search_provider::{Config, ExitReason};
use tokio::time::Instant;

fn ids(items: &[&str]) -> Reply {
    Reply::Return(ReplyBody::Identifiers(
        items.iter().map(|s| s.to_string()).collect(),
    ))
}

fn persistent() -> Config {
    let mut config = Config::default();
    config.service.persist = true;
    config
}

#[tokio::test]
async fn test_search_session_round_trip() {
    let provider = DocsProvider::new();
    let (service, mut bus) = service_with(provider.clone(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    let reply = bus.request("GetInitialResultSet", vec![strs(&["alpha"])]).await;
    assert_eq!(reply, ids(&["doc-1", "doc-2"]));

    let reply = bus
        .request(
            "GetSubsearchResultSet",
            vec![strs(&["doc-1", "doc-2"]), strs(&["alpha", "beta"])],
        )
        .await;
    assert_eq!(reply, ids(&["doc-1"]));

    let reply = bus.request("GetResultMetas", vec![strs(&["doc-1", "nope"])]).await;
    assert_eq!(
        reply,
        Reply::Return(ReplyBody::Metas(vec![
            ResultMeta::new("doc-1", "Alpha Beta notes").with_icon("text-x-generic"),
            ResultMeta::new("nope", "nope"),
        ]))
    );

    let reply = bus
        .request("ActivateResult", vec![s("doc-1"), strs(&["alpha"]), Arg::U32(42)])
        .await;
    assert_eq!(reply, Reply::Return(ReplyBody::Void));

    let reply = bus.request("LaunchSearch", vec![strs(&[]), Arg::U32(0)]).await;
    assert_eq!(reply, Reply::Return(ReplyBody::Void));

    handle.shutdown();
    assert_eq!(task.await.unwrap().unwrap(), ExitReason::Shutdown);

    assert_eq!(
        provider.calls(),
        vec![
            "initial alpha",
            "subsearch alpha beta",
            "metas doc-1,nope",
            "activate doc-1 [alpha] 42",
            "launch [] 0",
        ]
    );
    assert!(bus.drain_replies().is_empty(), "no extra replies");
}

#[tokio::test]
async fn test_malformed_call_gets_invalid_args_and_skips_handler() {
    let provider = DocsProvider::new();
    let (service, mut bus) = service_with(provider.clone(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    // Missing the timestamp.
    let reply = bus.request("ActivateResult", vec![s("doc-1"), strs(&["alpha"])]).await;
    assert_eq!(reply.error_name(), Some(error_names::INVALID_ARGS));

    // Right arity, wrong type.
    let reply = bus.request("GetInitialResultSet", vec![s("alpha")]).await;
    assert_eq!(reply.error_name(), Some(error_names::INVALID_ARGS));

    handle.shutdown();
    task.await.unwrap().unwrap();
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_method_and_wrong_path() {
    let (service, mut bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    let reply = bus.request("Frobnicate", vec![]).await;
    assert_eq!(reply.error_name(), Some(error_names::UNKNOWN_METHOD));

    let serial = bus.send_frame(CallFrame::new(
        "/org/example/Elsewhere",
        None,
        "LaunchSearch",
        vec![strs(&[]), Arg::U32(0)],
    ));
    let (target, reply) = bus.next_reply().await;
    assert_eq!(target, serial);
    assert_eq!(reply.error_name(), Some(error_names::UNKNOWN_OBJECT));

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_introspect_and_ping() {
    let (service, mut bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());
    let path = ServiceIdentity::default().object_path().to_string();

    bus.send_frame(CallFrame::new(
        path.as_str(),
        Some("org.freedesktop.DBus.Introspectable"),
        "Introspect",
        vec![],
    ));
    match bus.next_reply().await.1 {
        Reply::Return(ReplyBody::Xml(xml)) => {
            assert!(xml.contains("<method name=\"GetSubsearchResultSet\">"));
        }
        other => panic!("expected introspection XML, got {other:?}"),
    }

    bus.send_frame(CallFrame::new(
        path.as_str(),
        Some("org.freedesktop.DBus.Peer"),
        "Ping",
        vec![],
    ));
    assert_eq!(bus.next_reply().await.1, Reply::Return(ReplyBody::Void));

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_panicking_handler_still_gets_one_failed_reply() {
    let (service, mut bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    let reply = bus
        .request("ActivateResult", vec![s("boom"), strs(&[]), Arg::U32(1)])
        .await;
    assert_eq!(reply.error_name(), Some(error_names::FAILED));

    // The loop survives and keeps serving.
    let reply = bus.request("GetInitialResultSet", vec![strs(&["gamma"])]).await;
    assert_eq!(reply, ids(&["doc-3"]));

    handle.shutdown();
    task.await.unwrap().unwrap();
    assert!(bus.drain_replies().is_empty());
}

#[tokio::test]
async fn test_name_lost_unexports_the_object() {
    let (service, mut bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    let reply = bus.request("GetInitialResultSet", vec![strs(&["alpha"])]).await;
    assert!(!reply.is_error());

    bus.lose_name();
    let reply = bus.request("GetInitialResultSet", vec![strs(&["alpha"])]).await;
    assert_eq!(reply.error_name(), Some(error_names::UNKNOWN_OBJECT));

    handle.shutdown();
    task.await.unwrap().unwrap();

    // A lost name is not released.
    assert_eq!(bus.name_ops(), vec![NameOp::Request(DEFAULT_BUS_NAME.to_string())]);
}

#[tokio::test]
async fn test_refused_name_never_exports() {
    let provider = DocsProvider::new();
    let (service, mut bus) = service_with(provider.clone(), &Config::default(), false);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    let reply = bus.request("LaunchSearch", vec![strs(&["alpha"]), Arg::U32(3)]).await;
    assert_eq!(reply.error_name(), Some(error_names::UNKNOWN_OBJECT));

    handle.shutdown();
    task.await.unwrap().unwrap();
    assert!(provider.calls().is_empty());
    assert_eq!(bus.name_ops(), vec![NameOp::Request(DEFAULT_BUS_NAME.to_string())]);
}

#[tokio::test]
async fn test_shutdown_releases_owned_name() {
    let (service, bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    handle.shutdown();
    assert_eq!(task.await.unwrap().unwrap(), ExitReason::Shutdown);
    assert_eq!(
        bus.name_ops(),
        vec![
            NameOp::Request(DEFAULT_BUS_NAME.to_string()),
            NameOp::Release(DEFAULT_BUS_NAME.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_disconnect_stops_the_loop() {
    let (service, bus) = service_with(DocsProvider::new(), &persistent(), true);
    let task = tokio::spawn(service.run());

    let (_replies, _names) = bus.disconnect();
    assert_eq!(task.await.unwrap().unwrap(), ExitReason::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_exits_after_twelve_seconds() {
    let (service, bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let start = Instant::now();

    let reason = service.run().await.unwrap();
    assert_eq!(reason, ExitReason::IdleTimeout);
    assert!(start.elapsed() >= Duration::from_secs(12));
    assert!(start.elapsed() < Duration::from_secs(13));

    // Teardown gave the name back.
    assert_eq!(bus.name_ops().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_activity_restarts_the_idle_timer() {
    let (service, mut bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let start = Instant::now();
    let task = tokio::spawn(service.run());

    tokio::time::sleep(Duration::from_secs(10)).await;
    let reply = bus.request("GetInitialResultSet", vec![strs(&["alpha"])]).await;
    assert!(!reply.is_error());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!task.is_finished());

    assert_eq!(task.await.unwrap().unwrap(), ExitReason::IdleTimeout);
    assert!(start.elapsed() >= Duration::from_secs(22));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_calls_do_not_count_as_activity() {
    let (service, mut bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let start = Instant::now();
    let task = tokio::spawn(service.run());

    tokio::time::sleep(Duration::from_secs(10)).await;
    let reply = bus.request("ActivateResult", vec![s("doc-1")]).await;
    assert_eq!(reply.error_name(), Some(error_names::INVALID_ARGS));

    assert_eq!(task.await.unwrap().unwrap(), ExitReason::IdleTimeout);
    assert!(start.elapsed() < Duration::from_secs(13));
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_call_blocks_idle_exit() {
    let provider = DocsProvider::new();
    let (service, mut bus) = service_with(provider.clone(), &Config::default(), true);
    let task = tokio::spawn(service.run());

    let serial = bus.call("GetInitialResultSet", vec![strs(&["slow"])]);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!task.is_finished());

    provider.release_slow();
    let (target, reply) = bus.next_reply().await;
    assert_eq!(target, serial);
    assert_eq!(reply, ids(&[]));

    let finished = Instant::now();
    assert_eq!(task.await.unwrap().unwrap(), ExitReason::IdleTimeout);
    assert!(finished.elapsed() >= Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn test_persist_keeps_service_alive_until_shutdown() {
    let (service, mut bus) = service_with(DocsProvider::new(), &persistent(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
    assert!(!task.is_finished());

    // Calls still work while held.
    let reply = bus.request("GetInitialResultSet", vec![strs(&["report"])]).await;
    assert_eq!(reply, ids(&["doc-2"]));

    handle.shutdown();
    assert_eq!(task.await.unwrap().unwrap(), ExitReason::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_persist_hold_survives_stray_release() {
    let (service, _bus) = service_with(DocsProvider::new(), &persistent(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    handle.release();
    handle.release();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!task.is_finished(), "persistent service must not time out");

    // Ordinary holds still stack on top of the persistent one.
    handle.hold();
    handle.release();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!task.is_finished());

    handle.shutdown();
    assert_eq!(task.await.unwrap().unwrap(), ExitReason::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_outstanding_calls_are_answered_independently() {
    let provider = DocsProvider::new();
    let (service, mut bus) = service_with(provider.clone(), &Config::default(), true);
    let task = tokio::spawn(service.run());

    let slow = bus.call("GetInitialResultSet", vec![strs(&["slow"])]);
    let fast = bus.call("GetInitialResultSet", vec![strs(&["gamma"])]);
    let malformed = bus.call("ActivateResult", vec![s("doc-1")]);

    // Both answers arrive while the slow call is still parked.
    let mut answered = HashMap::new();
    for _ in 0..2 {
        let (target, reply) = bus.next_reply().await;
        assert!(answered.insert(target, reply).is_none(), "duplicate reply");
    }
    assert_eq!(answered[&fast], ids(&["doc-3"]));
    assert_eq!(
        answered[&malformed].error_name(),
        Some(error_names::INVALID_ARGS)
    );
    assert!(!answered.contains_key(&slow));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!task.is_finished(), "parked call keeps the service alive");
    assert!(bus.drain_replies().is_empty());

    provider.release_slow();
    let (target, reply) = bus.next_reply().await;
    assert_eq!(target, slow);
    assert_eq!(reply, ids(&[]));

    assert_eq!(task.await.unwrap().unwrap(), ExitReason::IdleTimeout);
    assert!(bus.drain_replies().is_empty());
    assert!(!provider.calls().iter().any(|c| c.starts_with("activate")));
}

#[tokio::test(start_paused = true)]
async fn test_hold_and_release_through_handle() {
    let (service, _bus) = service_with(DocsProvider::new(), &Config::default(), true);
    let handle = service.handle();
    let task = tokio::spawn(service.run());

    handle.hold();
    handle.hold();
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(!task.is_finished());

    handle.release();
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(!task.is_finished(), "one hold is still outstanding");

    handle.release();
    let released = Instant::now();
    assert_eq!(task.await.unwrap().unwrap(), ExitReason::IdleTimeout);
    assert!(released.elapsed() >= Duration::from_secs(12));
}
