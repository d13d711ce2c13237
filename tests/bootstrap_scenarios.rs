use ansibbs::bbs::connect::{connect_entry, BootstrapOptions};
use ansibbs::bbs::events::{SystemEvent, SystemEvents, TermEvent};
use ansibbs::bbs::negotiate::{HomeOrigin, SizeSource};
use ansibbs::bbs::session::BootstrapStage;
use tokio::time::Instant;
mod common;
use common::{cpr, find, harness, reply_after, within, written, Harness, RecordingMenu};

fn position(out: &[u8], needle: &[u8]) -> usize {
    find(out, needle).unwrap_or_else(|| panic!("missing {:?}", String::from_utf8_lossy(needle)))
}

// Home report (0,0) at 100ms, size report (43,132) at 300ms.
#[tokio::test(start_paused = true)]
async fn zero_based_terminal_with_size_report() {
    let Harness { tx, client, mut session } = harness();
    let bus = SystemEvents::default();
    let mut announcements = bus.subscribe();
    let mut menu = RecordingMenu::default();
    let opts = BootstrapOptions::default();
    let start = Instant::now();

    reply_after(&tx, 100, cpr(0, 0));
    reply_after(&tx, 300, cpr(43, 132));
    let outcome = connect_entry(&mut session, &opts, &bus, &mut menu)
        .await
        .expect("bootstrap");

    assert_eq!(outcome.cpr_offset, 1);
    assert_eq!((outcome.term_height, outcome.term_width), (43, 132));
    assert_eq!(outcome.home, Some(HomeOrigin::ZeroBased));
    assert_eq!(outcome.size, Some(SizeSource::Detected));
    assert!(!outcome.degraded);
    assert_eq!(session.stage, BootstrapStage::Menu);
    assert_eq!(session.events.listener_count(), 0);

    match announcements.try_recv().expect("TermDetected published") {
        SystemEvent::TermDetected(d) => {
            assert_eq!(d.session_id, session.id);
            assert_eq!((d.term_height, d.term_width, d.cpr_offset), (43, 132, 1));
            assert!(!d.degraded);
        }
    }

    // Negotiation finished at 300ms; handoff follows 500ms later.
    assert_eq!(menu.visits.len(), 1);
    let (name, at) = &menu.visits[0];
    assert_eq!(name, "matrix");
    assert!(within(at.duration_since(start), 800), "handoff at {:?}", at.duration_since(start));

    let out = written(session, client).await;
    let da = position(&out, b"\x1b[0c");
    let home = position(&out, b"\x1b[H\x1b[6n");
    let size = position(&out, b"\x1b[999;999H\x1b[255n");
    let prime = position(&out, b"\x1b[0m\x1b[2J");
    let banner = position(&out, b"Copyright");
    assert!(da < home && home < size && size < prime && prime < banner);
    assert!(find(&out, b"Copyright").is_some());
}

// Nothing ever answers.
#[tokio::test(start_paused = true)]
async fn silent_terminal_falls_back_to_80x25() {
    let Harness { tx: _tx, client: _client, mut session } = harness();
    let bus = SystemEvents::default();
    let mut announcements = bus.subscribe();
    let mut menu = RecordingMenu::default();
    let start = Instant::now();

    let outcome = connect_entry(&mut session, &BootstrapOptions::default(), &bus, &mut menu)
        .await
        .expect("bootstrap still completes");

    assert_eq!(outcome.cpr_offset, 0);
    assert_eq!((outcome.term_height, outcome.term_width), (25, 80));
    assert_eq!(outcome.home, None);
    assert_eq!(outcome.size, None);
    assert!(outcome.degraded);
    assert_eq!(session.events.listener_count(), 0);

    match announcements.try_recv().expect("TermDetected published") {
        SystemEvent::TermDetected(d) => assert!(d.degraded),
    }
    let (_, at) = &menu.visits[0];
    // 3000 + 2000 of deadlines, then the 500ms handoff
    assert!(within(at.duration_since(start), 5500), "handoff at {:?}", at.duration_since(start));
}

#[tokio::test(start_paused = true)]
async fn pre_known_size_skips_size_query() {
    let Harness { tx, client, mut session } = harness();
    session.term.term_height = 30;
    session.term.term_width = 100;
    let bus = SystemEvents::default();
    let mut menu = RecordingMenu::default();

    reply_after(&tx, 10, cpr(1, 1));
    let outcome = connect_entry(&mut session, &BootstrapOptions::default(), &bus, &mut menu)
        .await
        .unwrap();
    assert_eq!(outcome.size, Some(SizeSource::AlreadyKnown));
    assert_eq!((outcome.term_height, outcome.term_width), (30, 100));
    assert!(!outcome.degraded);

    let out = written(session, client).await;
    assert!(find(&out, b"\x1b[255n").is_none());
    assert!(find(&out, b"999;999").is_none());
}

// Home reply and NAWS land in the same read, so the NAWS size is still queued
// when the size stage starts.
#[tokio::test(start_paused = true)]
async fn naws_queued_behind_home_reply_skips_size_query() {
    let Harness { tx, client, mut session } = harness();
    let bus = SystemEvents::default();
    let mut menu = RecordingMenu::default();
    let start = Instant::now();
    let feeder = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let _ = feeder.send(cpr(1, 1));
        let _ = feeder.send(TermEvent::WindowSize { width: 120, height: 40 });
    });

    let outcome = connect_entry(&mut session, &BootstrapOptions::default(), &bus, &mut menu)
        .await
        .unwrap();
    assert_eq!(outcome.size, Some(SizeSource::AlreadyKnown));
    assert_eq!((outcome.term_height, outcome.term_width), (40, 120));
    assert!(!outcome.degraded);
    let (_, at) = &menu.visits[0];
    assert!(within(at.duration_since(start), 600), "handoff at {:?}", at.duration_since(start));

    drop(tx);
    let out = written(session, client).await;
    assert!(find(&out, b"999;999").is_none());
    assert!(find(&out, b"\x1b[255n").is_none());
}

#[tokio::test(start_paused = true)]
async fn rejected_size_report_falls_back() {
    for bad in [cpr(5, 80), cpr(25, 999)] {
        let Harness { tx, client: _client, mut session } = harness();
        let bus = SystemEvents::default();
        let mut menu = RecordingMenu::default();
        reply_after(&tx, 10, cpr(1, 1));
        reply_after(&tx, 50, bad);
        let outcome = connect_entry(&mut session, &BootstrapOptions::default(), &bus, &mut menu)
            .await
            .unwrap();
        assert_eq!((outcome.term_height, outcome.term_width), (25, 80));
        assert!(outcome.degraded);
        assert_eq!(outcome.home, Some(HomeOrigin::OneBased));
    }
}

#[tokio::test(start_paused = true)]
async fn naws_during_failed_size_query_prevents_fallback() {
    let Harness { tx, client: _client, mut session } = harness();
    let bus = SystemEvents::default();
    let mut menu = RecordingMenu::default();
    reply_after(&tx, 10, cpr(1, 1));
    // Lands during the size query, which then times out with no report.
    reply_after(&tx, 500, TermEvent::WindowSize { width: 132, height: 60 });
    let outcome = connect_entry(&mut session, &BootstrapOptions::default(), &bus, &mut menu)
        .await
        .unwrap();
    assert_eq!((outcome.term_height, outcome.term_width), (60, 132));
    assert!(!outcome.degraded);
    assert_eq!(outcome.size, None);
}

#[tokio::test(start_paused = true)]
async fn custom_fallback_and_entry_menu() {
    let Harness { tx: _tx, client: _client, mut session } = harness();
    let bus = SystemEvents::default();
    let mut menu = RecordingMenu::default();
    let opts = BootstrapOptions {
        fallback_width: 40,
        fallback_height: 20,
        entry_menu: "login".into(),
        ..BootstrapOptions::default()
    };
    let outcome = connect_entry(&mut session, &opts, &bus, &mut menu).await.unwrap();
    assert_eq!((outcome.term_height, outcome.term_width), (20, 40));
    assert_eq!(menu.visits[0].0, "login");
}

#[tokio::test(start_paused = true)]
async fn disconnect_mid_query_ends_bootstrap() {
    let Harness { tx, client: _client, mut session } = harness();
    let bus = SystemEvents::default();
    let mut menu = RecordingMenu::default();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        drop(tx);
    });
    let start = Instant::now();
    let result = connect_entry(&mut session, &BootstrapOptions::default(), &bus, &mut menu).await;
    assert!(result.is_err());
    assert!(start.elapsed() < std::time::Duration::from_millis(200));
    assert!(menu.visits.is_empty());
    assert_eq!(session.events.listener_count(), 0);
}
