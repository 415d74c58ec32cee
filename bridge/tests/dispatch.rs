use std::sync::Arc;

use bridgekit_bridge::{
    Bridge, BridgeContext, BridgeError, CallbackRegistry, ChannelCallback, EventEmitter, MainLoop,
    DROPPED_REPLY, Outcome, Plugin, SharedCallback, main_thread, parse_params,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize)]
struct EchoParams {
    text: String,
}

struct Echo;

impl Plugin for Echo {
    fn name(&self) -> &str {
        "Echo"
    }

    fn execute(
        &self,
        ctx: &BridgeContext,
        method: &str,
        params: &str,
        callback: &SharedCallback,
    ) -> bool {
        match method {
            "echo" => {
                let reply = ctx.reply(callback);
                match parse_params::<EchoParams>(params) {
                    Ok(params) => reply.success(json!(params.text)),
                    Err(err) => reply.error(err.to_string()),
                }
                true
            }
            "twice" => {
                callback.on_success(json!(1));
                callback.on_success(json!(2));
                true
            }
            "explode" => panic!("boom"),
            "later" => {
                let reply = ctx.reply(callback);
                ctx.spawn(async move { reply.success(json!("async")) });
                true
            }
            "lost" => {
                let reply = ctx.reply(callback);
                ctx.spawn(async move {
                    let _held = reply;
                    panic!("backend went away");
                });
                true
            }
            "forgotten" => {
                let _reply = ctx.reply(callback);
                true
            }
            "fail" => {
                ctx.reply(callback)
                    .fail(&BridgeError::Timeout("too slow".into()));
                true
            }
            _ => false,
        }
    }
}

struct Recorder(std::sync::Mutex<Vec<(String, Value)>>);

impl EventEmitter for Recorder {
    fn emit(&self, event: &str, payload: Value) {
        self.0.lock().unwrap().push((event.to_owned(), payload));
    }
}

fn bridge() -> (Bridge, MainLoop) {
    let (main, main_loop) = main_thread();
    let ctx = BridgeContext::new(
        Arc::new(CallbackRegistry::new()),
        main,
        tokio::runtime::Handle::current(),
    );
    let mut bridge = Bridge::new(ctx);
    bridge.register(Arc::new(Echo));
    (bridge, main_loop)
}

#[tokio::test]
async fn unknown_methods_are_not_handled() {
    let (bridge, main_loop) = bridge();
    let (callback, results) = ChannelCallback::pair();

    assert!(!bridge.dispatch("Echo", "nope", "{}", callback.clone()));
    assert!(!bridge.dispatch("Missing", "echo", "{}", callback));
    main_loop.run_pending();
    assert!(results.try_recv().is_err());
}

#[tokio::test]
async fn params_are_parsed_and_errors_reported() {
    let (bridge, main_loop) = bridge();
    let (ok, ok_rx) = ChannelCallback::pair();
    let (bad, bad_rx) = ChannelCallback::pair();

    assert!(bridge.dispatch("Echo", "echo", r#"{"text":"hi"}"#, ok));
    assert!(bridge.dispatch("Echo", "echo", "not json", bad));
    main_loop.run_pending();

    assert_eq!(ok_rx.try_recv().ok(), Some(Outcome::Success(json!("hi"))));
    assert!(bad_rx.try_recv().unwrap().error().unwrap().starts_with("invalid params"));
}

#[tokio::test]
async fn second_terminal_call_is_dropped() {
    let (bridge, _main_loop) = bridge();
    let (callback, results) = ChannelCallback::pair();

    assert!(bridge.dispatch("Echo", "twice", "", callback));
    assert_eq!(results.try_recv().ok(), Some(Outcome::Success(json!(1))));
    assert!(results.try_recv().is_err());
}

#[tokio::test]
async fn panics_become_errors() {
    let (bridge, _main_loop) = bridge();
    let (callback, results) = ChannelCallback::pair();

    assert!(bridge.dispatch("Echo", "explode", "{}", callback));
    let message = results.try_recv().unwrap();
    assert!(message.error().unwrap().contains("boom"));
}

#[tokio::test]
async fn background_replies_arrive_on_main_loop() {
    let (bridge, main_loop) = bridge();
    let (callback, results) = ChannelCallback::pair();

    assert!(bridge.dispatch_any("later", "{}", callback));
    assert!(main_loop.tick().await);
    assert_eq!(results.try_recv().ok(), Some(Outcome::Success(json!("async"))));
}

#[tokio::test]
async fn panicking_background_task_still_answers() {
    let (bridge, main_loop) = bridge();
    let (callback, results) = ChannelCallback::pair();

    assert!(bridge.dispatch("Echo", "lost", "{}", callback));
    let answered = tokio::time::timeout(std::time::Duration::from_secs(5), main_loop.tick()).await;
    assert_eq!(answered.ok(), Some(true));
    assert_eq!(results.try_recv().ok(), Some(Outcome::Error(DROPPED_REPLY.into())));
}

#[tokio::test]
async fn unanswered_reply_rejects_the_request() {
    let (bridge, main_loop) = bridge();
    let (callback, results) = ChannelCallback::pair();

    assert!(bridge.dispatch("Echo", "forgotten", "{}", callback));
    main_loop.run_pending();
    assert_eq!(results.try_recv().ok(), Some(Outcome::Error(DROPPED_REPLY.into())));
    assert!(results.try_recv().is_err());
}

#[tokio::test]
async fn failures_carry_the_envelope() {
    let (bridge, main_loop) = bridge();
    let (callback, results) = ChannelCallback::pair();

    bridge.dispatch("Echo", "fail", "{}", callback);
    main_loop.run_pending();

    let message = results.try_recv().unwrap();
    let envelope: Value = serde_json::from_str(message.error().unwrap()).unwrap();
    assert_eq!(envelope["code"], 10012);
}

#[tokio::test]
async fn events_are_marshalled_and_shutdown_clears_registry() {
    let (main, main_loop) = main_thread();
    let recorder = Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));
    let ctx = BridgeContext::new(
        Arc::new(CallbackRegistry::new()),
        main,
        tokio::runtime::Handle::current(),
    )
    .with_emitter(recorder.clone());
    let bridge = Bridge::new(ctx.clone());

    ctx.emit("onPing", json!({"n": 1}));
    assert!(recorder.0.lock().unwrap().is_empty());
    main_loop.run_pending();
    assert_eq!(
        *recorder.0.lock().unwrap(),
        vec![("onPing".to_owned(), json!({"n": 1}))]
    );

    ctx.registry().register("pending", None);
    bridge.shutdown();
    assert!(ctx.registry().is_empty());
}
