use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kmodel_core::{MapResult, TypedNode};
use kmodel_response::{
    pending, spawn_blocking_call, Completion, Headers, Payload, RawReply, RegistryTranslator, Response, ResponseError,
    ResponseState, TaskError, Translate,
};
use kmodel_schema::release_1_19;
use serde_json::{json, Value};

/// Counts how often payloads are translated.
#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

impl Translate for Counting {
    fn translate(&self, payload: &Value, translate_keys: bool) -> MapResult<TypedNode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        RegistryTranslator::new(release_1_19().expect("catalog")).translate(payload, translate_keys)
    }
}

fn pod() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "p", "namespace": "default"},
        "spec": {"containers": [{"name": "c", "image": "busybox"}]}
    })
}

fn headers() -> Headers {
    let mut h = Headers::new();
    h.insert("content-type".into(), "application/json".into());
    h
}

#[test]
fn typed_codes_decide_translation() {
    let counting = Arc::new(Counting::default());
    let ok = Response::immediate(RawReply::new(pod(), 200, headers()), [200, 201], counting.clone()).unwrap();
    assert!(matches!(ok.payload(), Some(Payload::Typed(n)) if n.type_name() == "Pod"));
    assert_eq!(ok.headers(), Some(&headers()));

    let status = json!({"kind": "Status", "apiVersion": "v1", "status": "Failure", "code": 404});
    let missing = Response::immediate(RawReply::new(status.clone(), 404, headers()), [200, 201], counting.clone()).unwrap();
    assert_eq!(missing.payload(), Some(&Payload::Raw(status)));
    assert_eq!(missing.code(), Some(404));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn deferred_get_times_out_then_translates_once() {
    let counting = Arc::new(Counting::default());
    let (tx, task) = pending();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        tx.reply(RawReply::new(pod(), 200, headers()));
    });
    let r = Response::deferred(task, [200, 201], counting.clone());
    assert_eq!(r.state(), ResponseState::DeferredPending);
    assert!(r.code().is_none());
    assert!(matches!(r.successful(), Err(ResponseError::NotReady)));

    let err = r.get(Some(Duration::from_millis(10))).unwrap_err();
    assert!(matches!(err, ResponseError::TimeoutExceeded(_)), "err={err}");
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);

    let first = r.get(Some(Duration::from_millis(100))).unwrap();
    assert_eq!(first.code, 200);
    assert_eq!(first.payload.as_ref().and_then(Payload::as_typed).map(|n| n.type_name()), Some("Pod"));
    assert_eq!(r.state(), ResponseState::DeferredConsumed);

    let again = r.get(None).unwrap();
    assert!(std::ptr::eq(first, again));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    assert!(r.successful().unwrap());
    worker.join().unwrap();
}

#[test]
fn concurrent_gets_share_one_translation() {
    let counting = Arc::new(Counting::default());
    let (tx, task) = pending();
    let r = Arc::new(Response::deferred(task, [200], counting.clone()));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let r = Arc::clone(&r);
            thread::spawn(move || r.get(Some(Duration::from_secs(5))).map(|reply| reply.code).ok())
        })
        .collect();
    thread::sleep(Duration::from_millis(20));
    tx.reply(RawReply::new(pod(), 200, Headers::new()));
    for h in readers {
        assert_eq!(h.join().unwrap(), Some(200));
    }
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn each_get_keeps_its_own_timeout() {
    let (tx, task) = pending();
    let r = Arc::new(Response::deferred(task, [200], Arc::new(Counting::default())));
    let patient = {
        let r = Arc::clone(&r);
        thread::spawn(move || r.get(None).map(|reply| reply.code).ok())
    };
    thread::sleep(Duration::from_millis(20));

    let hasty = {
        let r = Arc::clone(&r);
        thread::spawn(move || {
            let started = Instant::now();
            let timed_out = matches!(r.get(Some(Duration::from_millis(10))), Err(ResponseError::TimeoutExceeded(_)));
            (timed_out, started.elapsed())
        })
    };
    let (timed_out, elapsed) = hasty.join().unwrap();
    assert!(timed_out);
    assert!(elapsed < Duration::from_millis(300), "elapsed={elapsed:?}");

    thread::sleep(Duration::from_millis(400).saturating_sub(elapsed));
    tx.reply(RawReply::new(pod(), 200, Headers::new()));
    assert_eq!(patient.join().unwrap(), Some(200));
    assert_eq!(r.state(), ResponseState::DeferredConsumed);
}

#[test]
fn wait_returns_after_its_timeout() {
    let (tx, task) = pending();
    let r = Response::deferred(task, [200], Arc::new(Counting::default()));
    let started = Instant::now();
    r.wait(Some(Duration::from_millis(10)));
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(r.state(), ResponseState::DeferredPending);
    assert!(!r.ready());

    tx.reply(RawReply::new(None, 204, Headers::new()));
    r.wait(Some(Duration::from_secs(5)));
    assert_eq!(r.state(), ResponseState::DeferredReady);
    assert!(r.code().is_none());
}

#[test]
fn non_reply_completions_are_rejected() {
    let (tx, task) = pending();
    tx.send(Completion::Other(json!("a bare string")));
    let r = Response::deferred(task, [200], Arc::new(Counting::default()));
    assert_eq!(r.state(), ResponseState::DeferredReady);
    let err = r.get(None).unwrap_err();
    assert!(matches!(err, ResponseError::UnexpectedReplyShape(ref s) if s.contains("a bare string")), "err={err}");
}

#[test]
fn task_failures_pass_through() {
    let (tx, task) = pending();
    tx.fail(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"));
    let r = Response::deferred(task, [200], Arc::new(Counting::default()));
    assert!(!r.successful().unwrap());
    match r.get(None).unwrap_err() {
        ResponseError::Task(TaskError::Failed(e)) => assert_eq!(e.to_string(), "connection refused"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn untranslated_responses_match_host_names() {
    let payload = json!({"api_version": "v1", "kind": "Namespace", "metadata": {"name": "dev"}});
    let r = Response::builder(Arc::new(Counting::default()))
        .typed_codes([200])
        .translate_keys(false)
        .immediate(RawReply::new(payload, 200, Headers::new()))
        .unwrap();
    assert_eq!(r.typed().map(|n| n.type_name()), Some("Namespace"));
}

#[test]
fn blocking_pool_calls_feed_a_response() {
    let rt = tokio::runtime::Builder::new_multi_thread().worker_threads(1).enable_all().build().unwrap();
    let task = spawn_blocking_call(rt.handle(), || {
        thread::sleep(Duration::from_millis(10));
        Ok::<_, io::Error>(RawReply::new(pod(), 201, headers()))
    });
    let r = Response::deferred(task, [200, 201], Arc::new(Counting::default()));
    let reply = r.get(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(reply.code, 201);
    assert!(r.typed().is_some());

    let failing = spawn_blocking_call(rt.handle(), || Err::<RawReply, _>(io::Error::new(io::ErrorKind::Other, "boom")));
    let r = Response::deferred(failing, [200], Arc::new(Counting::default()));
    assert!(matches!(r.get(Some(Duration::from_secs(5))), Err(ResponseError::Task(TaskError::Failed(_)))));
}
