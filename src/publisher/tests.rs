//! Worker lifecycle and delivery tests for the publisher.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use crate::aggregator::OutputAggregator;
use crate::config::Settings;
use crate::encoder::EncodingError;
use crate::log_event::LogEvent;
use crate::reporter::ErrorReporter;
use crate::test_utils::{CollectingReporter, ScriptedTransport};
use crate::writer::{DeliveryError, ElasticWriter, Transport};

use super::{ElasticPublisher, PublishError};

const WAIT: Duration = Duration::from_secs(5);

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[allow(clippy::ptr_arg)]
fn line_encoder(event: &String) -> Result<String, EncodingError> {
    Ok(format!("{event}\n"))
}

#[allow(clippy::ptr_arg)]
fn picky_encoder(event: &String) -> Result<String, EncodingError> {
    match event.as_str() {
        "bad" => Err(EncodingError::Rejected(event.clone())),
        "raw" => Ok(event.clone()),
        other => Ok(format!("{other}\n")),
    }
}

#[fixture]
fn settings() -> Settings {
    Settings {
        url: "http://127.0.0.1:9/_bulk".into(),
        sleep_time: Duration::from_millis(10),
        shutdown_timeout: WAIT,
        ..Settings::default()
    }
}

struct Fixture {
    publisher: ElasticPublisher<String>,
    transport: ScriptedTransport,
    reporter: CollectingReporter,
}

fn build_with<T, F>(settings: &Settings, transport: T, encoder: F) -> (ElasticPublisher<String>, CollectingReporter)
where
    T: Transport + 'static,
    F: Fn(&String) -> Result<String, EncodingError> + Send + 'static,
{
    let reporter = CollectingReporter::new();
    let shared: Arc<dyn ErrorReporter> = Arc::new(reporter.clone());
    let writer =
        ElasticWriter::with_transport(settings.max_queue_size, transport, Arc::clone(&shared));
    let aggregator = OutputAggregator::new(Arc::clone(&shared)).with_writer(writer);
    let publisher = ElasticPublisher::with_aggregator(settings, aggregator, encoder, shared);
    (publisher, reporter)
}

fn build(settings: &Settings, transport: ScriptedTransport) -> Fixture {
    let (publisher, reporter) = build_with(settings, transport.clone(), line_encoder);
    Fixture {
        publisher,
        transport,
        reporter,
    }
}

fn add_all(publisher: &ElasticPublisher<String>, events: &[&str]) {
    for event in events {
        publisher.add_event((*event).to_owned()).expect("publisher open");
    }
}

#[rstest]
fn delivers_events_and_goes_idle(settings: Settings) {
    let f = build(&settings, ScriptedTransport::ok());
    f.publisher.start().expect("start worker");
    add_all(&f.publisher, &["a", "b", "c"]);

    assert!(wait_until(WAIT, || f.transport.delivered() == "a\nb\nc\n"));
    assert!(wait_until(WAIT, || !f.publisher.has_pending_data()));
    assert!(!f.publisher.is_working());

    let snapshot = f.publisher.snapshot();
    assert_eq!(snapshot.enqueued, 3);
    assert_eq!(snapshot.encoded, 3);
    assert_eq!(snapshot.queued, 0);
    assert_eq!(snapshot.buffers.len(), 1);
    assert_eq!(snapshot.buffers[0].send_len, 0);
}

#[rstest]
fn events_queued_before_start_are_delivered(settings: Settings) {
    let f = build(&settings, ScriptedTransport::ok());
    add_all(&f.publisher, &["early"]);
    assert!(f.publisher.has_pending_data());

    f.publisher.start().expect("start worker");

    assert!(wait_until(WAIT, || f.transport.delivered() == "early\n"));
}

#[rstest]
fn recovers_without_loss_after_failures(mut settings: Settings) {
    settings.max_retries = 1_000;
    let f = build(&settings, ScriptedTransport::new(503));
    f.publisher.start().expect("start worker");
    let events: Vec<String> = (0..20).map(|i| format!("event-{i}")).collect();
    for event in &events {
        f.publisher.add_event(event.clone()).expect("publisher open");
    }
    assert!(wait_until(WAIT, || f.transport.request_count() >= 3));
    assert!(f.publisher.has_pending_data());

    f.transport.set_fallback(200);

    let expected: String = events.iter().map(|e| format!("{e}\n")).collect();
    assert!(wait_until(WAIT, || !f.publisher.has_pending_data()));
    assert_eq!(f.transport.delivered(), expected);
    assert!(f.publisher.snapshot().failed_flushes >= 3);
}

#[rstest]
fn parks_after_max_retries_until_new_events(mut settings: Settings) {
    settings.max_retries = 2;
    let f = build(&settings, ScriptedTransport::new(503));
    f.publisher.start().expect("start worker");
    add_all(&f.publisher, &["a"]);

    assert!(wait_until(WAIT, || f.transport.request_count() == 3));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(f.transport.request_count(), 3);
    assert!(f.publisher.has_pending_data());

    f.transport.set_fallback(200);
    add_all(&f.publisher, &["b"]);

    assert!(wait_until(WAIT, || f.transport.delivered() == "a\nb\n"));
}

#[rstest]
fn encoding_failures_are_isolated(settings: Settings) {
    let transport = ScriptedTransport::ok();
    let (publisher, reporter) = build_with(&settings, transport.clone(), picky_encoder);
    publisher.start().expect("start worker");
    add_all(&publisher, &["a", "bad", "raw", "c"]);

    assert!(wait_until(WAIT, || transport.delivered() == "a\nc\n"));
    assert!(wait_until(WAIT, || publisher.snapshot().encode_failures == 2));
    assert_eq!(reporter.count_warnings("Failed to encode event"), 2);
    assert_eq!(reporter.count_warnings("not newline-terminated"), 1);
}

#[rstest]
fn stop_flushes_queued_events(mut settings: Settings) {
    settings.sleep_time = Duration::from_secs(10);
    let f = build(&settings, ScriptedTransport::ok());
    f.publisher.start().expect("start worker");
    add_all(&f.publisher, &["x", "y", "z"]);

    let started = Instant::now();
    f.publisher.stop();

    assert!(started.elapsed() < WAIT);
    assert_eq!(f.transport.delivered(), "x\ny\nz\n");
    assert!(!f.publisher.has_pending_data());
}

#[rstest]
fn stop_discards_undeliverable_data_with_warning(settings: Settings) {
    let f = build(&settings, ScriptedTransport::new(503));
    f.publisher.start().expect("start worker");
    add_all(&f.publisher, &["lost"]);

    f.publisher.stop();

    assert_eq!(f.reporter.count_warnings("Discarding 5 bytes"), 1);
    assert!(!f.publisher.has_pending_data());
}

struct SlowTransport(Duration);

impl Transport for SlowTransport {
    fn post(&self, _body: &str) -> Result<(), DeliveryError> {
        thread::sleep(self.0);
        Ok(())
    }
}

#[rstest]
fn stop_gives_up_on_a_stuck_worker(mut settings: Settings) {
    settings.shutdown_timeout = Duration::from_millis(100);
    let (publisher, reporter) =
        build_with(&settings, SlowTransport(Duration::from_millis(1_500)), line_encoder);
    publisher.start().expect("start worker");
    add_all(&publisher, &["slow"]);
    assert!(wait_until(WAIT, || publisher.is_working()));

    let started = Instant::now();
    publisher.stop();

    assert!(started.elapsed() < Duration::from_millis(1_000));
    assert_eq!(reporter.count_warnings("did not finish"), 1);
}

#[rstest]
fn lifecycle_calls_are_idempotent(settings: Settings) {
    let f = build(&settings, ScriptedTransport::ok());
    f.publisher.start().expect("first start");
    f.publisher.start().expect("second start is a no-op");
    f.publisher.stop();
    f.publisher.stop();

    let err = f
        .publisher
        .add_event("late".to_owned())
        .expect_err("stopped publisher rejects events");
    assert!(matches!(err, PublishError::Closed));
    assert!(matches!(f.publisher.start(), Err(PublishError::Closed)));
    assert_eq!(f.publisher.snapshot().rejected, 1);
    assert_eq!(f.reporter.count_warnings("dropped 1 events"), 1);
}

#[rstest]
fn stop_before_start_reports_queued_events(settings: Settings) {
    let f = build(&settings, ScriptedTransport::ok());
    add_all(&f.publisher, &["a", "b"]);

    f.publisher.stop();

    assert_eq!(f.reporter.count_warnings("discarding 2 queued events"), 1);
    assert_eq!(f.transport.request_count(), 0);
}

#[rstest]
fn dropping_the_publisher_flushes(settings: Settings) {
    let f = build(&settings, ScriptedTransport::ok());
    f.publisher.start().expect("start worker");
    add_all(&f.publisher, &["bye"]);

    let Fixture {
        publisher,
        transport,
        ..
    } = f;
    drop(publisher);

    assert_eq!(transport.delivered(), "bye\n");
}

#[rstest]
fn keeps_up_with_a_flooding_producer(mut settings: Settings) {
    settings.max_queue_size = 5 * 1024 * 1024;
    let f = build(&settings, ScriptedTransport::ok());
    f.publisher.start().expect("start worker");
    let publisher = &f.publisher;

    let produced = thread::scope(|scope| {
        scope
            .spawn(|| {
                let started = Instant::now();
                let mut count = 0usize;
                while started.elapsed() < Duration::from_millis(300) {
                    publisher
                        .add_event(format!("_____{count}++++OuIpju4ZK7RRHLJ5VgihDFXf5yLvq8NV"))
                        .expect("publisher open");
                    count += 1;
                    if count % 300 == 0 {
                        thread::sleep(Duration::from_millis(10));
                    }
                }
                count
            })
            .join()
            .expect("producer thread")
    });

    assert!(wait_until(WAIT, || !publisher.has_pending_data()));
    for body in f.transport.bodies() {
        assert!(body.len() <= settings.max_queue_size);
        assert!(body.ends_with('\n'));
    }
    let delivered = f.transport.delivered();
    let indices: Vec<usize> = delivered
        .lines()
        .map(|line| {
            let digits = &line["_____".len()..line.find("++++").expect("marker")];
            digits.parse().expect("index")
        })
        .collect();
    assert_eq!(indices, (0..produced).collect::<Vec<_>>());
}

#[test]
fn log_event_publisher_rejects_bad_index_pattern() {
    let settings = Settings {
        url: "http://127.0.0.1:9/_bulk".into(),
        index: "logs-%date{%Y".into(),
        ..Settings::default()
    };
    assert!(ElasticPublisher::<LogEvent>::from_settings(&settings).is_err());
}
