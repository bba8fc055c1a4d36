#![allow(dead_code)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use polars::prelude::*;
use quartui::backend::LocalBackend;
use quartui::views::PageView;
use quartui::{App, AppConfig, AppEvent, CacheManager, Theme};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ROWS: usize = 240;
pub const SCREEN: Rect = Rect {
    x: 0,
    y: 0,
    width: 80,
    height: 24,
};

/// `hour` (0-23), `latency` with a missing value every 17 rows, and `city` (3 values).
pub fn create_sample_csv(dir: &Path) -> PathBuf {
    let path = dir.join("requests.csv");
    let cities = ["oslo", "lima", "pune"];
    let mut df = df! (
        "hour" => (0..ROWS).map(|i| (i % 24) as i64).collect::<Vec<i64>>(),
        "latency" => (0..ROWS)
            .map(|i| (i % 17 != 0).then(|| (i * 7 % 100) as f64 / 10.0 + (i % 24) as f64))
            .collect::<Vec<Option<f64>>>(),
        "city" => (0..ROWS).map(|i| cities[i % 3].to_string()).collect::<Vec<String>>()
    )
    .unwrap();
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

/// App over a fresh local backend; cache and exports stay inside `dir`.
pub fn create_app(dir: &Path) -> (App, Receiver<AppEvent>) {
    let mut config = AppConfig::default();
    config.export.directory = Some(dir.join("exports"));
    config.performance.shard_rows = 64;
    let (tx, rx) = channel();
    let backend = Arc::new(LocalBackend::new(config.performance.shard_rows));
    let app = App::new(tx, backend, config, Theme::default())
        .with_cache(CacheManager::with_dir(dir.join("cache")));
    (app, rx)
}

/// Feeds backend messages to the app until `done` holds or a timeout passes.
pub fn drive(app: &mut App, rx: &Receiver<AppEvent>, mut done: impl FnMut(&App) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(30);
    while Instant::now() < deadline {
        if done(app) {
            return true;
        }
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => send(app, event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    done(app)
}

/// Handles `event` and whatever follow-up it returns; a crash fails the test.
pub fn send(app: &mut App, event: AppEvent) {
    let mut next = app.event(event);
    while let Some(event) = next.take() {
        match event {
            AppEvent::Crash(msg) => panic!("app crashed: {}", msg),
            AppEvent::Exit => return,
            other => next = app.event(other),
        }
    }
}

pub fn press(app: &mut App, code: KeyCode) {
    send(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
}

pub fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

pub fn mouse(app: &mut App, kind: MouseEventKind, column: u16, row: u16) {
    send(
        app,
        AppEvent::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }),
    );
}

/// Drags with the left button from one screen cell to another.
pub fn drag(app: &mut App, from: (u16, u16), to: (u16, u16)) {
    mouse(app, MouseEventKind::Down(MouseButton::Left), from.0, from.1);
    mouse(app, MouseEventKind::Drag(MouseButton::Left), to.0, to.1);
    mouse(app, MouseEventKind::Up(MouseButton::Left), to.0, to.1);
}

/// Draws one frame, which also lays out the current page.
pub fn render(app: &mut App) -> Buffer {
    let mut buf = Buffer::empty(SCREEN);
    Widget::render(&mut *app, SCREEN, &mut buf);
    buf
}

pub fn screen_text(buf: &Buffer) -> String {
    buf.content().iter().map(|c| c.symbol()).collect()
}

/// Page `index` is a quartile chart with data and nothing is left running.
pub fn quartiles_ready(app: &App, index: usize) -> bool {
    app.pending_count() == 0
        && matches!(
            app.pages().get(index).map(|p| &p.view),
            Some(PageView::Quartiles(v)) if v.data().is_some() && v.elapsed().is_some()
        )
}

pub fn idle(app: &App) -> bool {
    app.pending_count() == 0
}
