//! End-to-end planning: event stream in, transcode description out.

use barnraiser::{plan_all, plan_session};
use barnconf::{CompositionConfig, LayoutKind};
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use roundup::{Aggregator, Event, EventData, EventKind, Session};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn event(kind: EventKind, conn: &str, at: &str, data: EventData) -> Event {
    Event {
        kind,
        application_id: "app".into(),
        channel_id: "chan".into(),
        client_id: format!("client-{conn}"),
        connection_id: conn.into(),
        device_id: format!("dev-{conn}"),
        user_id: format!("user-{conn}"),
        timestamp: ts(at),
        data,
    }
}

fn stop_data(conn: &str) -> EventData {
    EventData {
        audio_file: Some(format!("/rec/{conn}.mka").into()),
        video_file: Some(format!("/rec/{conn}.mkv").into()),
        ..Default::default()
    }
}

fn sessions_from(events: &[Event]) -> Vec<Session> {
    let mut agg = Aggregator::new();
    for e in events {
        agg.route(e);
    }
    agg.into_sessions()
}

fn dry_config() -> CompositionConfig {
    CompositionConfig {
        layout: LayoutKind::Hgrid,
        dry_run: true,
        ..Default::default()
    }
}

#[test]
fn planning_is_deterministic_across_event_order() {
    let a_start = event(EventKind::Start, "conn-a", "2024-03-01T10:00:00Z", EventData::default());
    let a_stop = event(EventKind::Stop, "conn-a", "2024-03-01T10:02:00Z", stop_data("conn-a"));
    let b_start = event(EventKind::Start, "conn-b", "2024-03-01T10:01:00Z", EventData::default());
    let b_stop = event(EventKind::Stop, "conn-b", "2024-03-01T10:03:00Z", stop_data("conn-b"));

    // Same per-connection order, different interleaving.
    let first = sessions_from(&[a_start.clone(), b_start.clone(), a_stop.clone(), b_stop.clone()]);
    let second = sessions_from(&[b_start, a_start, a_stop, b_stop]);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, second[0].id);

    let config = dry_config();
    let plan_one = plan_session(&first[0], &config, None).unwrap();
    let plan_two = plan_session(&second[0], &config, None).unwrap();

    assert_eq!(plan_one.session_id, plan_two.session_id);
    assert_eq!(plan_one.job.filtergraph, plan_two.job.filtergraph);
    assert_eq!(plan_one.job.to_args(), plan_two.job.to_args());
    assert_eq!(plan_one.manifest, plan_two.manifest);
}

#[test]
fn video_delay_shifts_the_video_window() {
    for (delay, expected_stop) in [
        (-1.0, "2024-03-01T10:01:00Z"),
        (1.0, "2024-03-01T10:01:01Z"),
    ] {
        let sessions = sessions_from(&[
            event(EventKind::Start, "conn-a", "2024-03-01T10:00:00Z", EventData::default()),
            event(
                EventKind::Stop,
                "conn-a",
                "2024-03-01T10:01:00Z",
                EventData {
                    video_delay: Some(delay),
                    ..stop_data("conn-a")
                },
            ),
        ]);
        let plan = plan_session(&sessions[0], &dry_config(), None).unwrap();

        // The session interval covers the shifted video track, and the
        // chunk partition covers the session interval.
        assert_eq!(plan.timeline.stop, ts(expected_stop), "delay {delay}");
        assert_eq!(plan.timeline.chunks.last().unwrap().stop, plan.timeline.stop);
    }
}

#[test]
fn disjoint_busy_periods_seal_separate_sessions() {
    let sessions = sessions_from(&[
        event(EventKind::Start, "conn-a", "2024-03-01T10:00:00Z", EventData::default()),
        event(EventKind::Stop, "conn-a", "2024-03-01T10:01:00Z", stop_data("conn-a")),
        event(EventKind::Start, "conn-b", "2024-03-01T11:00:00Z", EventData::default()),
        event(EventKind::Stop, "conn-b", "2024-03-01T11:01:00Z", stop_data("conn-b")),
    ]);
    assert_eq!(sessions.len(), 2);
    assert_ne!(sessions[0].id, sessions[1].id);

    let outcome = plan_all(&sessions, &dry_config(), None);
    assert_eq!(outcome.plans.len(), 2);
    assert!(outcome.failures.is_empty());
    assert_ne!(outcome.plans[0].job.output, outcome.plans[1].job.output);
}

#[test]
fn four_participants_tile_two_by_two() {
    let mut events = Vec::new();
    for conn in ["conn-a", "conn-b", "conn-c", "conn-d"] {
        events.push(event(EventKind::Start, conn, "2024-03-01T10:00:00Z", EventData::default()));
    }
    for conn in ["conn-a", "conn-b", "conn-c", "conn-d"] {
        events.push(event(EventKind::Stop, conn, "2024-03-01T10:01:00Z", stop_data(conn)));
    }
    let sessions = sessions_from(&events);

    let config = CompositionConfig {
        layout: LayoutKind::Hgrid,
        width: 1000,
        height: 1000,
        dry_run: true,
        ..Default::default()
    };
    let plan = plan_session(&sessions[0], &config, None).unwrap();

    let layout = &plan.timeline.chunks[0].layout;
    assert_eq!(layout.views.len(), 4);
    for view in layout.views.values() {
        assert!((view.frame.width() as i64 - 500).abs() <= 1);
        assert!((view.frame.height() as i64 - 500).abs() <= 1);
    }
}

#[test]
fn sixty_five_sources_mix_through_three_stages() {
    let mut events = Vec::new();
    for i in 0..65 {
        events.push(event(
            EventKind::Start,
            &format!("conn-{i:02}"),
            "2024-03-01T10:00:00Z",
            EventData::default(),
        ));
    }
    for i in 0..65 {
        events.push(event(
            EventKind::Stop,
            &format!("conn-{i:02}"),
            "2024-03-01T10:01:00Z",
            EventData {
                audio_file: Some(format!("/rec/conn-{i:02}.mka").into()),
                ..Default::default()
            },
        ));
    }
    let sessions = sessions_from(&events);
    let plan = plan_session(&sessions[0], &dry_config(), None).unwrap();

    let mixes = plan
        .job
        .filtergraph
        .matches("amix=inputs=")
        .count();
    assert_eq!(mixes, 3);
    assert!(plan.job.filtergraph.contains("amix=inputs=32:"));
    assert!(plan.job.filtergraph.contains("amix=inputs=3:"));
    assert!(plan.job.audio_map.is_some());
}

#[test]
fn chunks_partition_the_session_exactly() {
    let sessions = sessions_from(&[
        event(EventKind::Start, "conn-a", "2024-03-01T10:00:00Z", EventData::default()),
        event(EventKind::Start, "conn-b", "2024-03-01T10:00:30Z", EventData::default()),
        event(EventKind::Stop, "conn-a", "2024-03-01T10:01:00Z", stop_data("conn-a")),
        event(EventKind::Stop, "conn-b", "2024-03-01T10:02:00Z", stop_data("conn-b")),
    ]);
    let plan = plan_session(&sessions[0], &dry_config(), None).unwrap();

    let timeline = &plan.timeline;
    assert_eq!(timeline.chunks.first().unwrap().start, timeline.start);
    assert_eq!(timeline.chunks.last().unwrap().stop, timeline.stop);
    for pair in timeline.chunks.windows(2) {
        assert_eq!(pair[0].stop, pair[1].start);
    }
}

#[test]
fn one_bad_session_does_not_block_the_batch() {
    // The script refuses more than one participant, so the two-party
    // session fails while the solo session still plans.
    let script = r#"
        function layout(inputs, output)
            if #inputs > 1 then
                error("refusing to place more than one participant")
            end
            return {
                { origin = { x = 0, y = 0 },
                  size = { width = output.size.width, height = output.size.height } },
            }
        end
    "#;

    let sessions = sessions_from(&[
        event(EventKind::Start, "conn-a", "2024-03-01T10:00:00Z", EventData::default()),
        event(EventKind::Stop, "conn-a", "2024-03-01T10:01:00Z", stop_data("conn-a")),
        event(EventKind::Start, "conn-b", "2024-03-01T11:00:00Z", EventData::default()),
        event(EventKind::Start, "conn-c", "2024-03-01T11:00:00Z", EventData::default()),
        event(EventKind::Stop, "conn-b", "2024-03-01T11:01:00Z", stop_data("conn-b")),
        event(EventKind::Stop, "conn-c", "2024-03-01T11:01:00Z", stop_data("conn-c")),
    ]);
    assert_eq!(sessions.len(), 2);

    let config = CompositionConfig {
        layout: LayoutKind::Script,
        dry_run: true,
        ..Default::default()
    };
    let outcome = plan_all(&sessions, &config, Some(script));

    assert_eq!(outcome.plans.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].session_id, sessions[1].id);
    assert!(format!("{:#}", outcome.failures[0].error).contains("more than one participant"));
}

#[test]
fn script_layout_without_source_is_rejected() {
    let sessions = sessions_from(&[
        event(EventKind::Start, "conn-a", "2024-03-01T10:00:00Z", EventData::default()),
        event(EventKind::Stop, "conn-a", "2024-03-01T10:01:00Z", stop_data("conn-a")),
    ]);
    let config = CompositionConfig {
        layout: LayoutKind::Script,
        dry_run: true,
        ..Default::default()
    };
    let err = plan_session(&sessions[0], &config, None).unwrap_err();
    assert!(err.to_string().contains("no script source"));
}
