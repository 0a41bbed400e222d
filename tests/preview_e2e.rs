//! End-to-end tests for the preview render lifecycle
//!
//! These exercise the public surface only: render, pump, console state,
//! banner state and the retry affordance.

use previewbox::{ConsoleKind, PreviewConfig, PreviewHost, PreviewSource};
use std::time::{Duration, Instant};

fn host_with(config: PreviewConfig) -> PreviewHost {
    let _ = env_logger::builder().is_test(true).try_init();
    PreviewHost::new(config).expect("config is valid")
}

fn host() -> PreviewHost {
    host_with(PreviewConfig::default())
}

fn script_source(script: &str) -> PreviewSource {
    PreviewSource {
        script: script.to_string(),
        ..PreviewSource::default()
    }
}

/// Pump until at least `want` records arrived or a deadline passes.
fn pump_until(host: &mut PreviewHost, want: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        host.pump();
        if host.console().records().len() >= want {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for records");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn render_never_fails_open_for_arbitrary_source() {
    let mut host = host();
    let sources = [
        PreviewSource::default(),
        script_source("}{ this is not javascript"),
        PreviewSource {
            markup: "<script>".to_string(),
            stylesheet: "}{".to_string(),
            script: "\0".to_string(),
        },
    ];
    for source in &sources {
        host.render(source);
        host.pump();
        // Either a visible surface or an explicit setup error; never both
        // absent, never a crash.
        assert!(host.surface().is_some() || host.setup_error().is_some());
    }
}

#[test]
fn console_log_joins_arguments_with_single_space() {
    let mut host = host();
    host.render(&script_source("console.log('a', 'b')"));
    host.pump();
    let records = host.console().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ConsoleKind::Log);
    assert_eq!(records[0].text, "a b");
    assert!(!host.banner().is_set());
}

#[test]
fn sync_throw_is_dual_reported() {
    let mut host = host();
    host.render(&script_source("throw new Error('x')"));
    host.pump();
    let records = host.console().records();
    assert!(records.iter().any(|r| r.kind == ConsoleKind::Error));
    let error = records.iter().find(|r| r.kind == ConsoleKind::Error).unwrap();
    assert!(error.text.contains('x'), "console detail: {}", error.text);
    let banner = host.banner().message().expect("banner set");
    assert!(banner.contains('x'), "banner: {banner}");
    // The render itself is not rolled back.
    assert!(host.surface().is_some());
}

#[test]
fn clear_console_leaves_banner_untouched() {
    let mut host = host();
    host.render(&script_source("throw new Error('x')"));
    host.pump();
    assert!(host.banner().is_set());
    host.clear_console();
    assert!(host.console().records().is_empty());
    assert!(host.banner().is_set());
    assert!(host.surface().is_some());
}

#[test]
fn rerender_drops_messages_from_the_replaced_realm() {
    let mut host = host();
    host.render(&script_source("console.log('one')"));
    // Deliberately no pump: the first realm's message stays in flight
    // across the realm swap.
    host.render(&script_source("console.log('two')"));
    host.pump();
    let texts: Vec<_> = host
        .console()
        .records()
        .iter()
        .map(|r| r.text.as_str())
        .collect();
    assert_eq!(texts, ["two"]);
}

#[test]
fn error_console_auto_expands() {
    let mut host = host();
    host.render(&script_source("console.log('fine')"));
    host.pump();
    assert!(!host.console().expanded());
    host.render(&script_source("throw new Error('x')"));
    host.pump();
    assert!(host.console().expanded());
}

#[test]
fn happy_path_end_to_end() {
    let mut host = host();
    host.render(&PreviewSource {
        markup: "<h1>Hi</h1>".to_string(),
        stylesheet: "h1{color:red}".to_string(),
        script: "console.log('ready')".to_string(),
    });
    host.pump();

    assert!(!host.banner().is_set());
    assert!(host.setup_error().is_none());
    let records = host.console().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ConsoleKind::Log);
    assert_eq!(records[0].text, "ready");
    let surface = host.surface().expect("surface visible");
    assert!(surface.contains("<h1>Hi</h1>"));
    assert!(surface.contains("h1{color:red}"));
}

#[test]
fn undefined_call_reports_line_and_keeps_markup() {
    let mut host = host();
    host.render(&PreviewSource {
        markup: "<p>still here</p>".to_string(),
        stylesheet: String::new(),
        script: "undefinedFn()".to_string(),
    });
    host.pump();

    let records = host.console().records();
    let error = records
        .iter()
        .find(|r| r.kind == ConsoleKind::Error)
        .expect("error record");
    assert!(error.text.contains("Line"), "no line reference: {}", error.text);
    assert!(host.banner().is_set());
    // Markup and styles already applied stay visible.
    let surface = host.surface().expect("surface visible");
    assert!(surface.contains("<p>still here</p>"));
}

#[test]
fn unhandled_rejection_is_distinguishable_from_sync_throw() {
    let mut host = host();
    host.render(&script_source("Promise.reject('boom')"));
    host.pump();

    let records = host.console().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ConsoleKind::Error);
    assert!(records[0].text.contains("boom"));
    assert!(
        records[0].text.contains("promise rejection"),
        "rejections carry their own label: {}",
        records[0].text
    );
    assert!(!records[0].text.starts_with("Line"));
    assert!(host.banner().is_set());
}

#[test]
fn handled_rejection_is_not_reported() {
    let mut host = host();
    host.render(&script_source(
        "Promise.reject('handled').catch(function (e) { console.log('caught', e) })",
    ));
    pump_until(&mut host, 1);
    let records = host.console().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ConsoleKind::Log);
    assert_eq!(records[0].text, "caught handled");
    assert!(!host.banner().is_set());
}

#[test]
fn post_load_activity_reports_with_global_source() {
    let mut host = host();
    host.render(&script_source("console.log('loaded')"));
    host.pump();
    assert_eq!(host.console().records().len(), 1);

    // The analogue of a timer or event callback firing after load.
    host.realm().expect("live realm").eval("console.log('later'); nope()");
    pump_until(&mut host, 3);

    let records = host.console().records();
    assert_eq!(records[1].text, "later");
    assert_eq!(records[2].kind, ConsoleKind::Error);
    assert!(host.banner().is_set());
}

#[test]
fn load_timeout_fails_closed_and_recovers_on_rerender() {
    let mut host = host_with(PreviewConfig {
        load_timeout_ms: 200,
        loop_iteration_limit: 0,
        ..PreviewConfig::default()
    });

    let started = Instant::now();
    host.render(&script_source("while (true) {}"));
    // Bounded by the load timeout, not by the runaway script.
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "render did not return within the load deadline"
    );
    assert!(host.setup_error().is_some());
    assert!(host.surface().is_none());

    // Retrying the unchanged source fails the same way.
    host.retry();
    assert!(host.setup_error().is_some());
    assert!(host.surface().is_none());

    // A corrected source recovers fully.
    host.render(&script_source("console.log('recovered')"));
    host.pump();
    assert!(host.setup_error().is_none());
    assert!(!host.banner().is_set());
    assert!(host.surface().is_some());
    let records = host.console().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "recovered");
}

#[test]
fn successful_rerender_clears_a_previous_banner() {
    let mut host = host();
    host.render(&script_source("throw new Error('x')"));
    host.pump();
    assert!(host.banner().is_set());
    host.render(&script_source("console.log('fixed')"));
    host.pump();
    assert!(!host.banner().is_set());
}

#[test]
fn object_arguments_are_serialized_lossily() {
    let mut host = host();
    host.render(&script_source("console.log({a: 1}, 'tail')"));
    host.pump();
    let records = host.console().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "{\"a\":1} tail");
}
