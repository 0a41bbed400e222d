//! Execution sandbox realm
//!
//! One realm = one dedicated worker thread owning a fresh JavaScript
//! engine context. The realm is the less-trusted party: its only way of
//! reaching the host is the outward relay channel, and every envelope it
//! emits carries the transport-level handle minted at spawn time.
//!
//! Realms are replaced wholesale on every render cycle. Dropping a
//! `Realm` closes the job channel and joins the worker, which discards
//! the engine context, its globals and any instrumentation state. There
//! is no finer-grained teardown.

use crate::bridge::protocol::{Envelope, RelayMessage, SOURCE_GLOBAL, SOURCE_INLINE};
use crate::config::PreviewConfig;
use crate::types::{PreviewError, Result};
use boa_engine::native_function::{NativeFunction, NativeFunctionPointer};
use boa_engine::{js_string, Context, JsResult, JsValue, Source};
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Mutex, OnceLock};
use std::thread::JoinHandle;
use std::time::Duration;

/// Opaque transport-level identity of one realm instance.
///
/// Deliberately not serializable: the bridge compares this handle, never a
/// payload field, when filtering messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RealmHandle(uuid::Uuid);

impl RealmHandle {
    pub(crate) fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for RealmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Engine limits copied out of the host config at spawn time.
#[derive(Clone, Copy, Debug)]
struct RealmLimits {
    loop_iteration_limit: u64,
    recursion_limit: usize,
}

enum RealmJob {
    Load {
        harness: String,
        script: String,
        ack: std::sync::mpsc::Sender<std::result::Result<(), String>>,
    },
    Eval {
        code: String,
    },
}

/// Native relay functions are plain function pointers, so the per-context
/// sender is looked up through a registry keyed by context address.
type RelayEntry = (RealmHandle, Sender<Envelope>);

static RELAY_REGISTRY: OnceLock<Mutex<HashMap<usize, RelayEntry>>> = OnceLock::new();

fn relay_registry() -> &'static Mutex<HashMap<usize, RelayEntry>> {
    RELAY_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// `__preview_post(json)`: the single outward channel. The sandbox never
/// learns the host's identity; information flows low-trust to high-trust
/// only.
fn relay_post_native(
    _this: &JsValue,
    args: &[JsValue],
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let payload = match args.first() {
        Some(value) => value.to_string(ctx)?.to_std_string_escaped(),
        None => return Ok(JsValue::undefined()),
    };
    let key = ctx as *const Context as usize;
    if let Ok(registry) = relay_registry().lock() {
        if let Some((handle, relay)) = registry.get(&key) {
            match serde_json::from_str::<RelayMessage>(&payload) {
                Ok(message) => {
                    let _ = relay.send(Envelope {
                        sender: *handle,
                        message,
                    });
                }
                // Harness bug, not user code: drop with a warning.
                Err(err) => log::warn!("dropping malformed relay payload: {err}"),
            }
        }
    }
    Ok(JsValue::undefined())
}

/// Best-effort extraction of "line N, col M" from an engine error message.
fn parse_position(message: &str) -> (Option<u32>, Option<u32>) {
    fn number_after(text: &str, tag: &str) -> Option<u32> {
        let at = text.find(tag)? + tag.len();
        let digits: String = text[at..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
    (
        number_after(message, "line "),
        number_after(message, "col "),
    )
}

fn send_error(
    relay: &Sender<Envelope>,
    handle: RealmHandle,
    message: String,
    source: &str,
    line: Option<u32>,
    column: Option<u32>,
) {
    let _ = relay.send(Envelope {
        sender: handle,
        message: RelayMessage::Error {
            message,
            source: source.to_string(),
            line,
            column,
            detail: None,
        },
    });
}

fn drain_jobs_and_sweep(ctx: &mut Context) {
    let _ = ctx.run_jobs();
    let _ = ctx.eval(Source::from_bytes(b"__preview_flush_rejections();"));
}

fn run_load(
    ctx: &mut Context,
    handle: RealmHandle,
    relay: &Sender<Envelope>,
    harness: &str,
    script: &str,
) -> std::result::Result<(), String> {
    // Instrumentation must be in place before any user code runs; a
    // failure here fails the whole render closed.
    if let Err(err) = ctx.eval(Source::from_bytes(harness.as_bytes())) {
        return Err(format!("instrumentation setup failed: {err}"));
    }
    if let Err(err) = ctx.eval(Source::from_bytes(script.as_bytes())) {
        // The guard catches runtime throws, so reaching this branch means
        // the script never parsed. Forward it like an inline throw.
        let text = err.to_string();
        let (line, column) = parse_position(&text);
        send_error(relay, handle, text, SOURCE_INLINE, line, column);
    }
    drain_jobs_and_sweep(ctx);
    Ok(())
}

fn run_eval(ctx: &mut Context, handle: RealmHandle, relay: &Sender<Envelope>, code: &str) {
    if let Err(err) = ctx.eval(Source::from_bytes(code.as_bytes())) {
        // No position lifting here: runtime messages may quote
        // user-controlled text ("see line 7"). Only engine parse errors
        // during load carry trustworthy positions.
        send_error(relay, handle, err.to_string(), SOURCE_GLOBAL, None, None);
    }
    drain_jobs_and_sweep(ctx);
}

fn worker_main(
    handle: RealmHandle,
    limits: RealmLimits,
    relay: Sender<Envelope>,
    jobs: crossbeam_channel::Receiver<RealmJob>,
    ready: std::sync::mpsc::Sender<std::result::Result<(), String>>,
) {
    let mut ctx = Context::default();
    if limits.loop_iteration_limit > 0 {
        ctx.runtime_limits_mut()
            .set_loop_iteration_limit(limits.loop_iteration_limit);
    }
    if limits.recursion_limit < usize::MAX {
        ctx.runtime_limits_mut()
            .set_recursion_limit(limits.recursion_limit);
    }

    let key = &ctx as *const Context as usize;
    match relay_registry().lock() {
        Ok(mut registry) => {
            registry.insert(key, (handle, relay.clone()));
        }
        Err(_) => {
            let _ = ready.send(Err("relay registry poisoned".to_string()));
            return;
        }
    }

    let post = NativeFunction::from_fn_ptr(relay_post_native as NativeFunctionPointer);
    if let Err(err) = ctx.register_global_builtin_callable(js_string!("__preview_post"), 1, post) {
        if let Ok(mut registry) = relay_registry().lock() {
            registry.remove(&key);
        }
        let _ = ready.send(Err(format!("relay function registration failed: {err}")));
        return;
    }

    let _ = ready.send(Ok(()));
    log::debug!("realm {handle} initialized");

    while let Ok(job) = jobs.recv() {
        match job {
            RealmJob::Load {
                harness,
                script,
                ack,
            } => {
                let outcome = run_load(&mut ctx, handle, &relay, &harness, &script);
                let _ = ack.send(outcome);
            }
            RealmJob::Eval { code } => {
                run_eval(&mut ctx, handle, &relay, &code);
            }
        }
    }

    if let Ok(mut registry) = relay_registry().lock() {
        registry.remove(&key);
    }
    log::debug!("realm {handle} discarded");
}

/// Handle-owning side of one execution realm.
pub struct Realm {
    handle: RealmHandle,
    jobs: Option<crossbeam_channel::Sender<RealmJob>>,
    worker: Option<JoinHandle<()>>,
    /// Set when the worker blew its load deadline; `Drop` must not wait
    /// for a worker that is still inside user code.
    detached: bool,
}

impl Realm {
    /// Spawn a fresh realm. Fails closed when the engine context cannot be
    /// initialized; the render must not show a stale or partial document.
    pub fn spawn(config: &PreviewConfig, relay: Sender<Envelope>) -> Result<Self> {
        let handle = RealmHandle::new();
        let limits = RealmLimits {
            loop_iteration_limit: config.loop_iteration_limit,
            recursion_limit: config.recursion_limit,
        };
        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let worker = std::thread::Builder::new()
            .name(format!("preview-realm-{handle}"))
            .spawn(move || worker_main(handle, limits, relay, jobs_rx, ready_tx))
            .map_err(|err| PreviewError::Setup(format!("spawn realm worker: {err}")))?;

        match ready_rx.recv_timeout(Duration::from_millis(config.load_timeout_ms)) {
            Ok(Ok(())) => Ok(Self {
                handle,
                jobs: Some(jobs_tx),
                worker: Some(worker),
                detached: false,
            }),
            Ok(Err(reason)) => {
                drop(jobs_tx);
                let _ = worker.join();
                Err(PreviewError::Setup(reason))
            }
            Err(_) => {
                // Worker is stuck or gone; closing the job channel lets it
                // exit on its own if it ever comes back.
                drop(jobs_tx);
                log::warn!("abandoning realm {handle} worker that did not initialize in time");
                Err(PreviewError::Setup(
                    "realm worker did not initialize in time".to_string(),
                ))
            }
        }
    }

    pub fn handle(&self) -> RealmHandle {
        self.handle
    }

    /// Load one synthesized document's script content: instrumentation
    /// harness first, then the guarded user script. Synchronous from the
    /// host's perspective, bounded by `timeout`: when the deadline expires
    /// the realm is marked detached, so dropping it will not wait for the
    /// worker to leave user code.
    pub fn load(&mut self, harness: String, script: String, timeout: Duration) -> Result<()> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| PreviewError::Realm("realm is shut down".to_string()))?;
        let (ack_tx, ack_rx) = std::sync::mpsc::channel();
        jobs.send(RealmJob::Load {
            harness,
            script,
            ack: ack_tx,
        })
        .map_err(|_| PreviewError::Realm("realm worker is gone".to_string()))?;

        match ack_rx.recv_timeout(timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(PreviewError::Setup(reason)),
            Err(RecvTimeoutError::Timeout) => {
                self.detached = true;
                Err(PreviewError::RenderTimeout(timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PreviewError::Realm(
                "realm worker exited during load".to_string(),
            )),
        }
    }

    /// Run code inside the realm after document load, the analogue of an
    /// event or timer callback firing later. Fire-and-forget: uncaught
    /// errors come back over the relay channel with source `global`.
    pub fn eval(&self, code: &str) {
        let Some(jobs) = self.jobs.as_ref() else {
            log::warn!("eval on shut-down realm {} ignored", self.handle);
            return;
        };
        if jobs
            .send(RealmJob::Eval {
                code: code.to_string(),
            })
            .is_err()
        {
            log::warn!("eval on dead realm {} ignored", self.handle);
        }
    }
}

impl Drop for Realm {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop; joining discards
        // the engine context and everything in it.
        self.jobs.take();
        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.detached {
            // The worker is still inside user code past its deadline.
            // Joining would block the host for as long as the script
            // runs; the worker exits on its own once the eval returns.
            log::warn!("abandoning unresponsive realm {} worker", self.handle);
            return;
        }
        let _ = worker.join();
    }
}
