use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Tabs};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

pub mod axis;
pub mod backend;
pub mod cache;
pub mod chart_export;
pub mod config;
pub mod dispatch;
pub mod error_display;
pub mod export;
pub mod format;
pub mod pipeline;
pub mod quantiles;
pub mod receiver;
pub mod render;
pub mod schema;
pub mod snapshot;
pub mod views;
pub mod widgets;

pub use cache::CacheManager;
pub use config::{AppConfig, ConfigManager, Theme};
pub use quartui_cli::Args;

use axis::DataRange;
use backend::{
    CombineOperation, ComputeBackend, ComputeMessage, ComputeRequest, DataSource, OpenOptions,
    RemoteObjectId, RequestHandle, RequestId, StreamEvent, TableInfo,
};
use dispatch::{ChartDispatcher, ChartKind, ChartOptions, DispatchContext, DispatchPlan};
use error_display::user_message_from_report;
use export::DirectorySaver;
use receiver::{Outcome, Receiver};
use render::layout::app_layout;
use render::overlays::{render_error_modal, render_success_modal};
use schema::{ColumnDescription, TableSchema};
use snapshot::QuantileVectorSerialization;
use views::{HeatmapView, HistogramView, PageView, QuartilesView, TableView, ViewAction};
use widgets::bucket_dialog::{BucketDialog, BucketDialogEvent};
use widgets::combine_menu::{CombineMenu, CombineMenuEvent};
use widgets::controls::{Controls, PAGE_CONTROLS, QUARTILE_CONTROLS};
use widgets::debug::DebugState;

/// Application name used for cache directory and other app-specific paths
pub const APP_NAME: &str = "quartui";

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16), // resized (width, height)
    /// Stream message from the compute backend.
    Compute(ComputeMessage),
    Open(DataSource, ChartSelection),
    /// Rebuild a quartile page from a snapshot file.
    Restore(PathBuf, OpenOptions),
    Exit,
    Crash(String),
}

impl From<&Args> for OpenOptions {
    fn from(args: &Args) -> Self {
        let mut opts = OpenOptions::new();
        if let Some(format) = args.format {
            opts = opts.with_format(format);
        }
        if let Some(delimiter) = args.delimiter {
            opts = opts.with_delimiter(delimiter);
        }
        if let Some(no_header) = args.no_header {
            opts = opts.with_has_header(!no_header);
        }
        opts
    }
}

/// Columns and bucket count of the first chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSelection {
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub buckets: Option<usize>,
}

impl From<&Args> for ChartSelection {
    fn from(args: &Args) -> Self {
        Self {
            x_column: args.x_column.clone(),
            y_column: args.y_column.clone(),
            buckets: args.buckets,
        }
    }
}

impl ChartSelection {
    /// X defaults to the first column, the quantile column to the first other numeric column.
    pub fn columns(&self, schema: &TableSchema) -> Result<(ColumnDescription, ColumnDescription)> {
        let find = |name: &str| {
            schema
                .find(name)
                .cloned()
                .ok_or_else(|| eyre!("Column not found: {}", name))
        };
        let x = match &self.x_column {
            Some(name) => find(name)?,
            None => schema
                .columns()
                .first()
                .cloned()
                .ok_or_else(|| eyre!("The table has no columns"))?,
        };
        let q = match &self.y_column {
            Some(name) => find(name)?,
            None => schema
                .columns()
                .iter()
                .find(|c| c.kind.is_numeric() && c.name != x.name)
                .cloned()
                .ok_or_else(|| eyre!("No numeric column to compute quartiles of"))?,
        };
        Ok((x, q))
    }
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

/// Confirmation after an export or snapshot.
#[derive(Default)]
pub struct SuccessModal {
    pub active: bool,
    pub message: String,
}

impl SuccessModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

pub type PageId = u64;

pub struct Page {
    pub id: PageId,
    pub title: String,
    pub view: PageView,
}

/// An outstanding request and what to do with its messages.
struct Pending {
    /// Page whose content the request produces; starting another request for it drops this one.
    page: Option<PageId>,
    target: RemoteObjectId,
    receiver: Receiver,
    _handle: RequestHandle,
}

pub struct App {
    events: Sender<AppEvent>,
    backend: Arc<dyn ComputeBackend>,
    config: AppConfig,
    theme: Theme,
    dispatcher: ChartDispatcher,
    cache: CacheManager,
    pages: Vec<Page>,
    current: usize,
    next_page_id: PageId,
    tables: HashMap<RemoteObjectId, TableInfo>,
    pending: HashMap<RequestId, Pending>,
    /// Page picked with `m` as the other operand of a combine.
    marked: Option<PageId>,
    bucket_dialog: BucketDialog,
    combine_menu: CombineMenu,
    error_modal: ErrorModal,
    success_modal: SuccessModal,
    debug: DebugState,
    throbber_frame: u8,
}

impl App {
    pub fn new(
        events: Sender<AppEvent>,
        backend: Arc<dyn ComputeBackend>,
        config: AppConfig,
        theme: Theme,
    ) -> App {
        let cache = CacheManager::new(APP_NAME).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not initialize cache manager");
            CacheManager::with_dir(std::env::temp_dir().join(APP_NAME))
        });
        let dispatcher =
            ChartDispatcher::new(config.chart.default_buckets, config.chart.max_buckets);
        let debug = DebugState {
            enabled: config.debug.enabled,
            ..Default::default()
        };

        App {
            events,
            backend,
            dispatcher,
            cache,
            pages: Vec::new(),
            current: 0,
            next_page_id: 1,
            tables: HashMap::new(),
            pending: HashMap::new(),
            marked: None,
            bucket_dialog: BucketDialog::new(&theme),
            combine_menu: CombineMenu::default(),
            error_modal: ErrorModal::new(),
            success_modal: SuccessModal::new(),
            debug,
            throbber_frame: 0,
            config,
            theme,
        }
    }

    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = cache;
        self
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current)
    }

    pub fn tables(&self) -> &HashMap<RemoteObjectId, TableInfo> {
        &self.tables
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_modal
            .active
            .then_some(self.error_modal.message.as_str())
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_modal
            .active
            .then_some(self.success_modal.message.as_str())
    }

    fn current_page_id(&self) -> Option<PageId> {
        self.pages.get(self.current).map(|p| p.id)
    }

    fn modal_active(&self) -> bool {
        self.error_modal.active
            || self.success_modal.active
            || self.bucket_dialog.active
            || self.combine_menu.active
    }

    pub fn event(&mut self, event: AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(&key),
            AppEvent::Mouse(mouse) => {
                self.mouse(&mouse);
                None
            }
            AppEvent::Compute(message) => {
                self.compute(message);
                None
            }
            AppEvent::Open(source, selection) => match self.open(&source, &selection) {
                Ok(()) => None,
                Err(e) => Some(AppEvent::Crash(user_message_from_report(
                    &e,
                    Some(&source.path),
                ))),
            },
            AppEvent::Restore(path, options) => {
                if let Err(e) = self.restore(&path, &options) {
                    tracing::warn!(path = %path.display(), error = %e, "restore failed");
                    self.error_modal.show(e.to_string());
                }
                None
            }
            // Views lay themselves out again on the next frame.
            AppEvent::Resize(..) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn open(&mut self, source: &DataSource, selection: &ChartSelection) -> Result<()> {
        let info = self.backend.load(source)?;
        let (x, q) = selection.columns(&info.schema)?;
        let title = source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| info.id.clone());
        let ctx = DispatchContext::new(
            title,
            vec![x, q],
            vec![selection.buckets.unwrap_or(0)],
            ChartOptions::new(ChartKind::QuartileVector),
        );
        let target = info.id.clone();
        self.tables.insert(target.clone(), info);
        self.perform(ViewAction::DataRanges { target, ctx }, None);
        Ok(())
    }

    fn restore(&mut self, path: &Path, options: &OpenOptions) -> Result<()> {
        let snapshot = QuantileVectorSerialization::load(path)?;
        let view = QuartilesView::reconstruct(&snapshot)
            .ok_or_else(|| eyre!("Invalid snapshot: {}", path.display()))?
            .with_tooltip_width(self.config.chart.tooltip_width);
        let target = view.remote_object_id().clone();
        if !self.tables.contains_key(&target) {
            let file = target
                .strip_prefix("file:")
                .ok_or_else(|| eyre!("Snapshot table {} is not a file", target))?;
            let info = self
                .backend
                .load(&DataSource::new(file, options.clone()))
                .map_err(|e| eyre!(user_message_from_report(&e, Some(Path::new(file)))))?;
            self.tables.insert(info.id.clone(), info);
        }
        tracing::info!(path = %path.display(), table = %target, "restoring snapshot");
        let action = view.refresh();
        let page = self.push_page(view.title().to_string(), PageView::Quartiles(view));
        self.perform(action, Some(page));
        Ok(())
    }

    fn submit(
        &mut self,
        target: &RemoteObjectId,
        request: ComputeRequest,
        receiver: Receiver,
        page: Option<PageId>,
    ) {
        if let Some(page) = page {
            self.pending.retain(|_, p| p.page != Some(page));
        }
        tracing::debug!(
            table = %target,
            request = request.name(),
            receiver = receiver.name(),
            ?page,
            "submit"
        );
        let handle = self.backend.submit(target, request, self.events.clone());
        self.pending.insert(
            handle.id(),
            Pending {
                page,
                target: target.clone(),
                receiver,
                _handle: handle,
            },
        );
    }

    /// Starts the work a view asked for; `origin` is the page it came from.
    fn perform(&mut self, action: ViewAction, origin: Option<PageId>) {
        match action {
            ViewAction::DataRanges { target, ctx } => {
                let page = if ctx.options.reuse_page { origin } else { None };
                let request = ComputeRequest::DataRanges {
                    columns: ctx.columns.clone(),
                    string_samples: self.config.chart.string_samples,
                };
                self.submit(&target, request, Receiver::data_ranges(ctx), page);
            }
            ViewAction::Filter {
                target,
                filter,
                ctx,
            } => {
                self.submit(
                    &target,
                    ComputeRequest::Filter(filter),
                    Receiver::new_object(ctx),
                    None,
                );
            }
            ViewAction::ShowTable {
                target,
                schema,
                order,
                title,
            } => {
                let view = TableView::new(target.clone(), schema, order.clone(), title.clone());
                let page = self.push_page(title, PageView::Table(view));
                let request = ComputeRequest::NextK {
                    order,
                    start: 0,
                    count: self.config.performance.table_page_rows,
                };
                self.submit(&target, request, Receiver::NextK, Some(page));
            }
        }
    }

    fn push_page(&mut self, title: String, view: PageView) -> PageId {
        let id = self.next_page_id;
        self.next_page_id += 1;
        self.pages.push(Page { id, title, view });
        self.current = self.pages.len() - 1;
        id
    }

    /// Puts `view` on page `reuse` when it still exists, otherwise on a new page.
    fn place_page(&mut self, reuse: Option<PageId>, title: String, view: PageView) -> PageId {
        if let Some(id) = reuse {
            if let Some(page) = self.pages.iter_mut().find(|p| p.id == id) {
                if let PageView::Quartiles(old) = &mut page.view {
                    old.mark_replaced();
                }
                tracing::debug!(page = id, view = view.name(), "replacing page");
                page.title = title;
                page.view = view;
                return id;
            }
        }
        self.push_page(title, view)
    }

    fn page_view_mut(&mut self, page: Option<PageId>) -> Option<&mut PageView> {
        let id = page?;
        self.pages
            .iter_mut()
            .find(|p| p.id == id)
            .map(|p| &mut p.view)
    }

    fn compute(&mut self, message: ComputeMessage) {
        self.debug.num_compute_messages += 1;
        let Some(mut entry) = self.pending.remove(&message.request) else {
            tracing::trace!(request = message.request, "stale message");
            return;
        };
        let partial = matches!(message.event, StreamEvent::Partial { .. });
        let outcome = match entry.receiver.on_event(message.event) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(request = message.request, error = %e, "request failed");
                self.error_modal.show(e.to_string());
                return;
            }
        };
        let target = entry.target.clone();
        let page = entry.page;
        if let Outcome::Issue(request) = outcome {
            self.submit(&target, request, entry.receiver, page);
            return;
        }
        if partial {
            self.pending.insert(message.request, entry);
        }
        if let Err(e) = self.apply(outcome, &target, page) {
            tracing::warn!(error = %e, "could not apply result");
            self.error_modal.show(e.to_string());
        }
    }

    fn apply(&mut self, outcome: Outcome, target: &RemoteObjectId, page: Option<PageId>) -> Result<()> {
        match outcome {
            Outcome::Nothing | Outcome::Issue(_) => {}
            Outcome::Ranges { ctx, ranges } => self.open_chart(target, ctx, &ranges, page)?,
            Outcome::UpdateQuartiles(qv) => {
                if let Some(PageView::Quartiles(view)) = self.page_view_mut(page) {
                    view.update_view(qv);
                }
            }
            Outcome::UpdateHistogram(h) => {
                if let Some(PageView::Histogram(view)) = self.page_view_mut(page) {
                    view.update(h);
                }
            }
            Outcome::UpdateHistogram2D(h) => {
                if let Some(PageView::Heatmap(view)) = self.page_view_mut(page) {
                    view.update(h);
                }
            }
            Outcome::Completed(elapsed) => {
                tracing::debug!(?page, ms = elapsed.as_millis() as u64, "completed");
                match self.page_view_mut(page) {
                    Some(PageView::Quartiles(view)) => view.update_completed(elapsed),
                    Some(PageView::Histogram(view)) => view.update_completed(elapsed),
                    Some(PageView::Heatmap(view)) => view.update_completed(elapsed),
                    _ => {}
                }
            }
            Outcome::NewObject { info, ctx } => {
                let target = info.id.clone();
                tracing::info!(table = %target, rows = info.row_count, "new table");
                self.tables.insert(target.clone(), info);
                self.perform(ViewAction::DataRanges { target, ctx }, page);
            }
            Outcome::Rows(rows) => {
                if let Some(PageView::Table(view)) = self.page_view_mut(page) {
                    view.update(rows);
                }
            }
        }
        Ok(())
    }

    fn open_chart(
        &mut self,
        target: &RemoteObjectId,
        ctx: DispatchContext,
        ranges: &[DataRange],
        page: Option<PageId>,
    ) -> Result<()> {
        let info = self
            .tables
            .get(target)
            .cloned()
            .ok_or_else(|| eyre!("Unknown table: {}", target))?;
        let plan = self.dispatcher.dispatch(&ctx, ranges)?;
        let reuse = if ctx.options.reuse_page { page } else { None };
        match plan {
            DispatchPlan::Histogram { axis, request } => {
                let view = HistogramView::new(target.clone(), info.schema, axis, ctx.title.clone());
                let id = self.place_page(reuse, ctx.title, PageView::Histogram(view));
                self.submit(target, request, Receiver::histogram(), Some(id));
            }
            DispatchPlan::Histogram2D {
                x,
                y,
                heatmap,
                request,
            } => {
                let view =
                    HeatmapView::new(target.clone(), info.schema, x, y, heatmap, ctx.title.clone());
                let id = self.place_page(reuse, ctx.title, PageView::Heatmap(view));
                self.submit(target, request, Receiver::histogram_2d(), Some(id));
            }
            DispatchPlan::Quartiles(pipeline) => {
                let request = pipeline.first_request()?;
                let view = QuartilesView::new(
                    target.clone(),
                    info.row_count,
                    info.schema,
                    pipeline.axis().clone(),
                    pipeline.quantiles_column().clone(),
                    ctx.title.clone(),
                )
                .with_tooltip_width(self.config.chart.tooltip_width);
                let id = self.place_page(reuse, ctx.title, PageView::Quartiles(view));
                self.submit(target, request, Receiver::Quartiles(pipeline), Some(id));
            }
        }
        Ok(())
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        self.debug.on_key(event);

        if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppEvent::Exit);
        }
        if self.error_modal.active {
            if matches!(event.code, KeyCode::Enter | KeyCode::Esc) {
                self.error_modal.hide();
            }
            return None;
        }
        if self.success_modal.active {
            if matches!(event.code, KeyCode::Enter | KeyCode::Esc) {
                self.success_modal.hide();
            }
            return None;
        }
        if self.bucket_dialog.active {
            if let BucketDialogEvent::Submit(count) = self.bucket_dialog.handle_key(event) {
                let origin = self.current_page_id();
                let action = match self.pages.get(self.current).map(|p| &p.view) {
                    Some(PageView::Quartiles(view)) => view.change_buckets(count),
                    _ => None,
                };
                if let Some(action) = action {
                    self.debug.set_action("change_buckets");
                    self.perform(action, origin);
                }
            }
            return None;
        }
        if self.combine_menu.active {
            if let CombineMenuEvent::Select(operation) = self.combine_menu.handle_key(event) {
                self.combine(operation);
            }
            return None;
        }

        match event.code {
            KeyCode::Char('q') => return Some(AppEvent::Exit),
            KeyCode::Tab => self.cycle(1),
            KeyCode::BackTab => self.cycle(-1),
            KeyCode::Char('w') => self.close_current(),
            code => match self.pages.get(self.current).map(|p| p.view.name()) {
                Some("quartiles") => self.quartile_key(code),
                Some("table") => self.table_key(code),
                _ => {}
            },
        }
        None
    }

    fn quartile_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('m') => {
                self.marked = self.current_page_id();
                self.debug.set_action("mark");
                return;
            }
            KeyCode::Char('c') => {
                self.open_combine_menu();
                return;
            }
            _ => {}
        }

        let Some(page) = self.pages.get_mut(self.current) else {
            return;
        };
        let page_id = page.id;
        let PageView::Quartiles(view) = &mut page.view else {
            return;
        };
        let export_dir = self.config.export.directory();
        let result: Result<Option<ViewAction>> = match code {
            KeyCode::Char('b') => {
                self.bucket_dialog
                    .open(view.x_axis().bucket_count, self.config.chart.max_buckets);
                Ok(None)
            }
            KeyCode::Char('e') => view.export(&DirectorySaver::new(&export_dir)).map(|path| {
                self.success_modal
                    .show(format!("Saved {}", path.display()));
                None
            }),
            KeyCode::Char('p') => view.export_png(&export_dir).map(|path| {
                self.success_modal
                    .show(format!("Saved {}", path.display()));
                None
            }),
            KeyCode::Char('s') => view
                .serialize()
                .and_then(|snapshot| snapshot.save(&self.cache.snapshot_dir()))
                .map(|path| {
                    self.success_modal
                        .show(format!("Saved snapshot to {}", path.display()));
                    None
                }),
            KeyCode::Char('g') => {
                let column = view.q_column().name.clone();
                view.show_trellis(&column).map(|_| None)
            }
            KeyCode::Char('1') => Ok(Some(view.do_histogram())),
            KeyCode::Char('2') => Ok(Some(view.do_2d_histogram())),
            KeyCode::Char('h') => Ok(Some(view.do_heatmap())),
            KeyCode::Char('t') => Ok(Some(view.show_table())),
            KeyCode::Char('r') => Ok(Some(view.refresh())),
            _ => Ok(None),
        };
        match result {
            Ok(Some(action)) => {
                self.debug.set_action(format!("{:?}", code));
                self.perform(action, Some(page_id));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "action failed");
                self.error_modal.show(e.to_string());
            }
        }
    }

    fn table_key(&mut self, code: KeyCode) {
        let delta = match code {
            KeyCode::Up | KeyCode::Char('k') => -1,
            KeyCode::Down | KeyCode::Char('j') => 1,
            KeyCode::PageUp => -20,
            KeyCode::PageDown => 20,
            _ => return,
        };
        if let Some(PageView::Table(view)) = self.pages.get_mut(self.current).map(|p| &mut p.view) {
            view.scroll(delta);
        }
    }

    fn marked_page(&self) -> Option<&Page> {
        let id = self.marked?;
        self.pages.iter().find(|p| p.id == id)
    }

    fn open_combine_menu(&mut self) {
        let current = self.current_page_id();
        match self.marked_page() {
            Some(marked) if Some(marked.id) != current => {
                let title = marked.title.clone();
                self.combine_menu.open(title);
            }
            _ => self
                .error_modal
                .show("Mark another page with m before combining".to_string()),
        }
    }

    fn combine(&mut self, operation: CombineOperation) {
        let Some((other, other_title)) = self
            .marked_page()
            .map(|p| (p.view.remote_object_id().clone(), p.title.clone()))
        else {
            self.error_modal
                .show("The marked page was closed".to_string());
            return;
        };
        let Some(page) = self.pages.get(self.current) else {
            return;
        };
        let PageView::Quartiles(view) = &page.view else {
            return;
        };
        let title = format!("{} {} {}", page.title, operation.as_str(), other_title);
        let ctx = view.combine_renderer(title);
        let target = view.remote_object_id().clone();
        self.debug.set_action(format!("combine {}", operation.as_str()));
        self.submit(
            &target,
            ComputeRequest::Combine { other, operation },
            Receiver::new_object(ctx),
            None,
        );
    }

    fn cycle(&mut self, delta: i64) {
        let len = self.pages.len() as i64;
        if len == 0 {
            return;
        }
        self.current = (self.current as i64 + delta).rem_euclid(len) as usize;
    }

    fn close_current(&mut self) {
        if self.current >= self.pages.len() {
            return;
        }
        let page = self.pages.remove(self.current);
        self.pending.retain(|_, p| p.page != Some(page.id));
        if self.marked == Some(page.id) {
            self.marked = None;
        }
        if self.current >= self.pages.len() && self.current > 0 {
            self.current -= 1;
        }
    }

    fn mouse(&mut self, event: &MouseEvent) {
        self.debug.on_mouse(event);
        if self.modal_active() {
            return;
        }
        let Some(page) = self.pages.get_mut(self.current) else {
            return;
        };
        let page_id = page.id;
        let (column, row) = (event.column, event.row);
        let action = match &mut page.view {
            PageView::Quartiles(view) => match event.kind {
                MouseEventKind::Moved => {
                    view.on_mouse_move(column, row);
                    None
                }
                MouseEventKind::Down(MouseButton::Left) => {
                    view.drag_start(column, row);
                    None
                }
                MouseEventKind::Drag(MouseButton::Left) => {
                    view.drag_move(column, row);
                    view.on_mouse_move(column, row);
                    None
                }
                MouseEventKind::Up(MouseButton::Left) => view.drag_end(column, row),
                _ => None,
            },
            PageView::Table(view) => {
                match event.kind {
                    MouseEventKind::ScrollUp => view.scroll(-1),
                    MouseEventKind::ScrollDown => view.scroll(1),
                    _ => {}
                }
                None
            }
            _ => None,
        };
        if let Some(action) = action {
            self.debug.set_action("selection");
            self.perform(action, Some(page_id));
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;
        self.debug.pending_requests = self.pending.len();
        let busy = self.is_busy();
        if busy {
            self.throbber_frame = self.throbber_frame.wrapping_add(1);
        }

        Block::default()
            .style(Style::default().bg(self.theme.get("background")))
            .render(area, buf);
        let layout = app_layout(area, self.debug.enabled);

        let titles: Vec<Line> = self
            .pages
            .iter()
            .map(|p| {
                let mark = if Some(p.id) == self.marked { "*" } else { "" };
                Line::from(format!("{}{}", mark, p.title))
            })
            .collect();
        Tabs::new(titles)
            .select(self.current)
            .style(Style::default().fg(self.theme.get("text_secondary")))
            .highlight_style(
                Style::default()
                    .fg(self.theme.get("tab_active"))
                    .add_modifier(Modifier::BOLD),
            )
            .render(layout.tabs, buf);

        match self.pages.get_mut(self.current) {
            Some(page) => page.view.render(layout.page, buf, &self.theme),
            None => Paragraph::new("No pages open")
                .centered()
                .render(layout.page, buf),
        }

        let (hints, row_count): (&[(&'static str, &'static str)], Option<u64>) =
            match self.pages.get(self.current) {
                Some(page) => (
                    if matches!(page.view, PageView::Quartiles(_)) {
                        QUARTILE_CONTROLS.as_slice()
                    } else {
                        PAGE_CONTROLS.as_slice()
                    },
                    self.tables
                        .get(page.view.remote_object_id())
                        .map(|t| t.row_count),
                ),
                None => (PAGE_CONTROLS.as_slice(), None),
            };
        let controls = Controls::new()
            .with_theme(&self.theme)
            .with_controls(hints)
            .with_row_count(row_count)
            .with_busy(busy, self.throbber_frame)
            .with_dimmed(self.modal_active());
        (&controls).render(layout.control_bar, buf);

        if let Some(debug_area) = layout.debug {
            (&self.debug).render(debug_area, buf);
        }

        if self.bucket_dialog.active {
            self.bucket_dialog.render(area, buf, &self.theme);
        }
        if self.combine_menu.active {
            self.combine_menu.render(area, buf, &self.theme);
        }
        if self.success_modal.active {
            render_success_modal(area, buf, &self.success_modal, &self.theme);
        }
        if self.error_modal.active {
            render_error_modal(area, buf, &self.error_modal, &self.theme);
        }
    }
}
