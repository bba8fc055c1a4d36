mod common;

use common::*;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use quartui::backend::{DataSource, OpenOptions};
use quartui::views::PageView;
use quartui::{App, AppEvent, ChartSelection};
use std::fs;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tempfile::TempDir;

fn open(app: &mut App, path: &Path, selection: ChartSelection) {
    send(
        app,
        AppEvent::Open(DataSource::new(path, OpenOptions::new()), selection),
    );
}

/// Opens the sample file charted as latency by hour and waits for the first result.
fn opened_app() -> (TempDir, App, Receiver<AppEvent>) {
    let dir = TempDir::new().unwrap();
    let path = create_sample_csv(dir.path());
    let (mut app, rx) = create_app(dir.path());
    open(&mut app, &path, ChartSelection::default());
    assert!(drive(&mut app, &rx, |a| quartiles_ready(a, 0)));
    render(&mut app);
    (dir, app, rx)
}

fn quartiles(app: &App, index: usize) -> &quartui::views::QuartilesView {
    match &app.pages()[index].view {
        PageView::Quartiles(v) => v,
        other => panic!("page {} is a {} page", index, other.name()),
    }
}

#[test]
fn test_open_charts_first_numeric_column_by_first_column() {
    let (dir, mut app, _rx) = opened_app();
    assert_eq!(app.pages().len(), 1);
    assert_eq!(app.pages()[0].title, "requests.csv");

    let view = quartiles(&app, 0);
    assert_eq!(view.x_axis().description.name, "hour");
    assert_eq!(view.q_column().name, "latency");
    assert_eq!(view.x_axis().bucket_count, 20);
    assert_eq!(view.data().unwrap().data.len(), 20);
    assert_eq!(view.row_count(), ROWS as u64);

    let root = DataSource::new(dir.path().join("requests.csv"), OpenOptions::new()).root_id();
    assert_eq!(app.tables()[&root].row_count, ROWS as u64);

    let text = screen_text(&render(&mut app));
    assert!(text.contains("latency by hour"));
    assert!(text.contains("requests.csv"));
}

#[test]
fn test_open_unknown_column_crashes() {
    let dir = TempDir::new().unwrap();
    let path = create_sample_csv(dir.path());
    let (mut app, _rx) = create_app(dir.path());
    let selection = ChartSelection {
        x_column: Some("nope".to_string()),
        ..Default::default()
    };
    let follow = app.event(AppEvent::Open(
        DataSource::new(&path, OpenOptions::new()),
        selection,
    ));
    match follow {
        Some(AppEvent::Crash(msg)) => assert!(msg.contains("nope"), "got: {}", msg),
        other => panic!("expected a crash, got {:?}", other),
    }
}

#[test]
fn test_bucket_dialog_recomputes_on_same_page() {
    let (_dir, mut app, rx) = opened_app();
    press(&mut app, KeyCode::Char('b'));
    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Backspace);
    type_text(&mut app, "6");
    press(&mut app, KeyCode::Enter);

    assert!(drive(&mut app, &rx, |a| {
        quartiles_ready(a, 0) && quartiles(a, 0).x_axis().bucket_count == 6
    }));
    assert_eq!(app.pages().len(), 1);
    assert_eq!(quartiles(&app, 0).data().unwrap().data.len(), 6);
}

#[test]
fn test_bucket_change_supersedes_running_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = create_sample_csv(dir.path());
    let (mut app, rx) = create_app(dir.path());
    open(&mut app, &path, ChartSelection::default());
    assert!(drive(&mut app, &rx, |a| !a.pages().is_empty()));
    assert!(!quartiles_ready(&app, 0));
    assert!(app.pending_count() > 0);

    press(&mut app, KeyCode::Char('b'));
    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Backspace);
    type_text(&mut app, "5");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.pending_count(), 1);

    assert!(drive(&mut app, &rx, |a| {
        quartiles_ready(a, 0) && quartiles(a, 0).x_axis().bucket_count == 5
    }));
    while let Ok(event) = rx.recv_timeout(Duration::from_millis(200)) {
        send(&mut app, event);
    }
    assert_eq!(app.pages().len(), 1);
    assert_eq!(quartiles(&app, 0).x_axis().bucket_count, 5);
    assert_eq!(quartiles(&app, 0).data().unwrap().data.len(), 5);
}

#[test]
fn test_bucket_dialog_empty_input_keeps_chart() {
    let (_dir, mut app, _rx) = opened_app();
    press(&mut app, KeyCode::Char('b'));
    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Backspace);
    press(&mut app, KeyCode::Enter);

    assert_eq!(app.pending_count(), 0);
    assert_eq!(quartiles(&app, 0).x_axis().bucket_count, 20);
}

#[test]
fn test_drag_selection_opens_filtered_chart() {
    let (_dir, mut app, rx) = opened_app();
    let chart = quartiles(&app, 0).surface().chart_area();
    drag(
        &mut app,
        (chart.x, chart.y),
        (chart.x + chart.width - 1, chart.y + chart.height - 1),
    );

    assert!(drive(&mut app, &rx, |a| {
        a.pages().len() == 2 && quartiles_ready(a, 1)
    }));
    assert_eq!(app.pages()[1].title, "requests.csv filtered");
    let filtered = quartiles(&app, 1).remote_object_id().clone();
    assert!(filtered.starts_with("filter:"));
    // Every bucket is selected, so only rows without a latency drop out.
    let with_latency = (0..ROWS).filter(|i| i % 17 != 0).count() as u64;
    assert_eq!(app.tables()[&filtered].row_count, with_latency);
}

#[test]
fn test_zero_width_drag_does_nothing() {
    let (_dir, mut app, _rx) = opened_app();
    let chart = quartiles(&app, 0).surface().chart_area();
    let x = chart.x + 5;
    drag(&mut app, (x, chart.y), (x, chart.y + chart.height - 1));

    assert_eq!(app.pending_count(), 0);
    assert_eq!(app.pages().len(), 1);
}

#[test]
fn test_combine_with_marked_page() {
    let (_dir, mut app, rx) = opened_app();
    press(&mut app, KeyCode::Char('m'));
    let chart = quartiles(&app, 0).surface().chart_area();
    drag(
        &mut app,
        (chart.x, chart.y + chart.height / 2),
        (chart.x + chart.width / 2, chart.y + chart.height - 1),
    );
    assert!(drive(&mut app, &rx, |a| {
        a.pages().len() == 2 && quartiles_ready(a, 1)
    }));

    press(&mut app, KeyCode::Char('c'));
    assert!(app.error_message().is_none());
    press(&mut app, KeyCode::Enter);
    assert!(drive(&mut app, &rx, |a| {
        a.pages().len() == 3 && quartiles_ready(a, 2)
    }));

    assert_eq!(
        app.pages()[2].title,
        "requests.csv filtered Union requests.csv"
    );
    let combined = quartiles(&app, 2).remote_object_id().clone();
    assert!(combined.starts_with("combine:"));
    assert_eq!(app.tables()[&combined].row_count, ROWS as u64);
}

#[test]
fn test_combine_without_marked_page_is_an_error() {
    let (_dir, mut app, _rx) = opened_app();
    press(&mut app, KeyCode::Char('c'));
    let msg = app.error_message().unwrap();
    assert!(msg.contains("Mark another page"), "got: {}", msg);

    press(&mut app, KeyCode::Esc);
    assert!(app.error_message().is_none());
}

#[test]
fn test_table_page_lists_sorted_rows() {
    let (_dir, mut app, rx) = opened_app();
    press(&mut app, KeyCode::Char('t'));
    assert_eq!(app.pages().len(), 2);
    assert!(drive(&mut app, &rx, |a| {
        idle(a) && matches!(&a.pages()[1].view, PageView::Table(v) if v.rows().is_some())
    }));

    let PageView::Table(table) = &app.pages()[1].view else {
        panic!("expected a table page");
    };
    let rows = table.rows().unwrap();
    assert_eq!(rows.rows.len(), 100);
    assert_eq!(rows.row_count, ROWS as u64);
    assert_eq!(rows.rows[0][0], "0");
    assert_eq!(table.selected(), Some(0));

    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    let PageView::Table(table) = &app.pages()[1].view else {
        panic!("expected a table page");
    };
    assert_eq!(table.selected(), Some(2));
    assert!(screen_text(&render(&mut app)).contains("Sorted by hour, latency"));
}

#[test]
fn test_histogram_and_heatmap_pages() {
    let (_dir, mut app, rx) = opened_app();
    press(&mut app, KeyCode::Char('1'));
    assert!(drive(&mut app, &rx, |a| {
        idle(a)
            && a.pages().len() == 2
            && matches!(&a.pages()[1].view, PageView::Histogram(v) if v.data().is_some())
    }));
    let PageView::Histogram(histogram) = &app.pages()[1].view else {
        panic!("expected a histogram page");
    };
    let data = histogram.data().unwrap();
    assert_eq!(data.total(), ROWS as u64);

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.current_page().unwrap().id, app.pages()[0].id);
    press(&mut app, KeyCode::Char('h'));
    assert!(drive(&mut app, &rx, |a| {
        idle(a)
            && a.pages().len() == 3
            && matches!(&a.pages()[2].view, PageView::Heatmap(v) if v.data().is_some())
    }));
    let PageView::Heatmap(heatmap) = &app.pages()[2].view else {
        panic!("expected a heatmap page");
    };
    assert!(heatmap.is_heatmap());
    render(&mut app);
}

#[test]
fn test_export_csv_writes_quartile_rows() {
    let (dir, mut app, _rx) = opened_app();
    press(&mut app, KeyCode::Char('e'));
    let msg = app.success_message().unwrap().to_string();
    assert!(msg.contains("quantiles2d.csv"), "got: {}", msg);

    let text = fs::read_to_string(dir.path().join("exports").join("quantiles2d.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with(",,\"hour "));
    let labels: Vec<&str> = lines.iter().map(|l| l.split(',').next().unwrap()).collect();
    assert_eq!(labels, ["", "min", "q1", "median", "q3", "max", "missing"]);
    // one leading label, one blank column, then one cell per bucket
    assert_eq!(lines[1].split(',').count(), 22);

    press(&mut app, KeyCode::Enter);
    assert!(app.success_message().is_none());
}

#[test]
fn test_string_x_axis_export_labels() {
    let dir = TempDir::new().unwrap();
    let path = create_sample_csv(dir.path());
    let (mut app, rx) = create_app(dir.path());
    let selection = ChartSelection {
        x_column: Some("city".to_string()),
        ..Default::default()
    };
    open(&mut app, &path, selection);
    assert!(drive(&mut app, &rx, |a| quartiles_ready(a, 0)));
    assert_eq!(quartiles(&app, 0).x_axis().bucket_count, 3);

    press(&mut app, KeyCode::Char('e'));
    let text = fs::read_to_string(dir.path().join("exports").join("quantiles2d.csv")).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.contains("city"), "header: {}", header);
    assert!(header.contains("lima"), "header: {}", header);
}

#[test]
fn test_snapshot_round_trip_restores_page() {
    let (dir, mut app, _rx) = opened_app();
    press(&mut app, KeyCode::Char('s'));
    assert!(app.success_message().unwrap().contains("snapshot"));

    let snapshots = dir.path().join("cache").join("snapshots");
    let saved = fs::read_dir(&snapshots)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();

    let (mut restored, rx) = create_app(dir.path());
    send(
        &mut restored,
        AppEvent::Restore(saved, OpenOptions::new()),
    );
    assert!(drive(&mut restored, &rx, |a| quartiles_ready(a, 0)));
    let view = quartiles(&restored, 0);
    assert_eq!(view.title(), "requests.csv");
    assert_eq!(view.x_axis().description.name, "hour");
    assert_eq!(view.q_column().name, "latency");
    assert_eq!(view.x_axis().bucket_count, 20);
}

#[test]
fn test_invalid_snapshot_shows_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{"rowCount": 3}"#).unwrap();
    let (mut app, _rx) = create_app(dir.path());
    send(&mut app, AppEvent::Restore(path, OpenOptions::new()));

    assert!(app.pages().is_empty());
    let msg = app.error_message().unwrap();
    assert!(msg.contains("Invalid snapshot"), "got: {}", msg);
}

#[test]
fn test_closing_page_drops_its_requests() {
    let (_dir, mut app, rx) = opened_app();
    press(&mut app, KeyCode::Char('r'));
    assert_eq!(app.pending_count(), 1);
    press(&mut app, KeyCode::Char('w'));
    assert_eq!(app.pending_count(), 0);
    assert!(app.pages().is_empty());

    while let Ok(event) = rx.recv_timeout(Duration::from_millis(200)) {
        send(&mut app, event);
    }
    assert!(app.pages().is_empty());
    assert!(screen_text(&render(&mut app)).contains("No pages open"));
}

#[test]
fn test_trellis_reports_unsupported() {
    let (_dir, mut app, _rx) = opened_app();
    press(&mut app, KeyCode::Char('g'));
    assert!(app.error_message().unwrap().contains("Trellis"));
}

#[test]
fn test_quit_and_ctrl_c_exit() {
    let dir = TempDir::new().unwrap();
    let (mut app, _rx) = create_app(dir.path());
    let quit = app.event(AppEvent::Key(KeyEvent::new(
        KeyCode::Char('q'),
        KeyModifiers::NONE,
    )));
    assert!(matches!(quit, Some(AppEvent::Exit)));
    let ctrl_c = app.event(AppEvent::Key(KeyEvent::new(
        KeyCode::Char('c'),
        KeyModifiers::CONTROL,
    )));
    assert!(matches!(ctrl_c, Some(AppEvent::Exit)));
}
