//! Orchestrates the two panes: window store, fetch dispatch, rendering, highlighting.
//!
//! Each pane is an independent state machine (`Idle` -> `Loading` -> `Idle`/`Failed`).
//! Every dispatch takes a fresh per-pane ticket; when a response arrives only the
//! latest ticket of its pane may touch the DOM or the store, so stacked shifts on one
//! pane resolve as last-request-wins no matter which response lands last.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use stats_feed::{FetchSequencer, FetchTicket, StatsRequest, StatsResult, StatsSource};
use topn_core::{Pane, ShiftRequest, ShiftToken, TimeWindow, TimeWindowStore, WindowSource};

use crate::config::PanelConfig;
use crate::dialog::CustomRangeDialog;
use crate::dom::{Boundary, FormField, HoverCallback, PanelDom, RowHandle};
use crate::error::PanelError;
use crate::highlight::HighlightCoordinator;
use crate::render::PaneRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneStatus {
    Idle,
    Loading { seq: u64 },
    /// The latest fetch failed; the pane shows an inline error.
    Failed,
}

/// How a dispatched fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Rendered { ticket: FetchTicket, has_stats: bool },
    /// A newer request for the same pane was issued; the response was dropped.
    Superseded(FetchTicket),
    Failed { ticket: FetchTicket, error: PanelError },
}

/// A dispatched fetch. Driving it (await or `spawn_local`) completes the request and
/// applies the response to its pane.
pub struct PaneFetch {
    ticket: FetchTicket,
    future: Pin<Box<dyn Future<Output = FetchOutcome>>>,
}

impl PaneFetch {
    pub fn ticket(&self) -> FetchTicket {
        self.ticket
    }
}

impl Future for PaneFetch {
    type Output = FetchOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

struct PanelInner<D> {
    dom: D,
    config: PanelConfig,
    store: TimeWindowStore,
    sequencer: FetchSequencer,
    status: [PaneStatus; 2],
    renderer: PaneRenderer,
    highlight: HighlightCoordinator,
    dialog: CustomRangeDialog,
}

impl<D: PanelDom> PanelInner<D> {
    fn read_window(dom: &D, pane: Pane) -> Result<TimeWindow, PanelError> {
        let source = WindowSource::Pane(pane);
        let start = dom.field_value(FormField::Window(source, Boundary::Start))?;
        let stop = dom.field_value(FormField::Window(source, Boundary::Stop))?;
        Ok(TimeWindow::new(start, stop))
    }

    fn parse_field<T: std::str::FromStr>(&self, field: FormField) -> Result<T, PanelError> {
        let raw = self.dom.field_value(field)?;
        raw.trim().parse().map_err(|_| PanelError::InvalidField {
            field: field.dom_id(),
            value: raw,
        })
    }

    /// Picks up dates edited in the pane's own fields. Labels survive when the
    /// fields still hold the rendered window.
    fn sync_window(&mut self, pane: Pane) -> Result<(), PanelError> {
        let edited = Self::read_window(&self.dom, pane)?;
        let current = self.store.window(pane);
        if edited.start != current.start || edited.stop != current.stop {
            log::debug!("{} window edited to {}..{}", pane, edited.start, edited.stop);
            self.store.set_window(pane, edited);
        }
        Ok(())
    }

    /// Common dispatch preamble: loading state, ticket, request.
    fn prepare(
        &mut self,
        pane: Pane,
        source: WindowSource,
        shift: Option<ShiftToken>,
    ) -> Result<(FetchTicket, StatsRequest), PanelError> {
        let cluster_id = self.parse_field::<u64>(FormField::ClusterId)?;
        let n = self.parse_field::<u32>(FormField::TopN)?;
        if let WindowSource::Pane(own) = source {
            self.sync_window(own)?;
        }

        self.renderer.begin_loading(&mut self.dom, pane)?;
        self.highlight.clear(pane);

        let ticket = self.sequencer.issue(pane);
        self.status[pane.index()] = PaneStatus::Loading { seq: ticket.seq };

        let mut request = StatsRequest::new(cluster_id, n, pane).window(self.store.resolve(source));
        if let Some(token) = shift {
            request = request.shift(token);
        }
        log::debug!(
            "dispatching {} fetch #{} ({})",
            pane,
            ticket.seq,
            request.to_form_body()
        );
        Ok((ticket, request))
    }
}

fn hover_callback<D: PanelDom + 'static>(inner: &Rc<RefCell<PanelInner<D>>>) -> HoverCallback {
    let weak = Rc::downgrade(inner);
    Rc::new(move |row: &RowHandle, entering: bool| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let Ok(mut guard) = inner.try_borrow_mut() else {
            log::debug!("hover on {} ignored: panel busy", row.dom_id);
            return;
        };
        let PanelInner { dom, highlight, .. } = &mut *guard;
        if let Err(err) = highlight.on_row_hover(dom, row, entering) {
            log::warn!("highlight of {} failed: {}", row.dom_id, err);
        }
    })
}

fn complete<D: PanelDom + 'static>(
    inner: &Rc<RefCell<PanelInner<D>>>,
    ticket: FetchTicket,
    result: StatsResult,
) -> FetchOutcome {
    let on_hover = hover_callback(inner);
    let mut guard = inner.borrow_mut();
    let this = &mut *guard;
    let pane = ticket.pane;

    if !this.sequencer.is_latest(&ticket) {
        log::debug!(
            "dropping stale {} response #{} (latest #{:?})",
            pane,
            ticket.seq,
            this.sequencer.latest(pane)
        );
        return FetchOutcome::Superseded(ticket);
    }

    let rendered = result.map_err(PanelError::from).and_then(|response| {
        this.store.set_window(pane, response.window());
        let index = this
            .renderer
            .render(&mut this.dom, pane, &response, on_hover)?;
        this.highlight.set_index(pane, index);
        Ok(response.has_stats)
    });

    match rendered {
        Ok(has_stats) => {
            this.status[pane.index()] = PaneStatus::Idle;
            FetchOutcome::Rendered { ticket, has_stats }
        }
        Err(error) => {
            log::warn!("{} pane fetch #{} failed: {}", pane, ticket.seq, error);
            this.status[pane.index()] = PaneStatus::Failed;
            if let Err(dom_err) = this.renderer.show_failure(&mut this.dom, pane, &error.to_string()) {
                log::error!("could not show {} pane error: {}", pane, dom_err);
            }
            FetchOutcome::Failed { ticket, error }
        }
    }
}

/// Entry point for page actions. Cheap to clone; clones share state.
pub struct PanelController<D, S> {
    inner: Rc<RefCell<PanelInner<D>>>,
    source: Rc<S>,
}

impl<D, S> Clone for PanelController<D, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            source: Rc::clone(&self.source),
        }
    }
}

impl<D: PanelDom + 'static, S: StatsSource + 'static> PanelController<D, S> {
    /// Seeds both panes' windows from the server-rendered form fields.
    pub fn new(dom: D, source: S, config: PanelConfig) -> Result<Self, PanelError> {
        let left = PanelInner::read_window(&dom, Pane::Left)?;
        let right = PanelInner::read_window(&dom, Pane::Right)?;
        let inner = PanelInner {
            renderer: PaneRenderer::new(config.sparkline.clone()),
            dialog: CustomRangeDialog::new(config.dialog_title.clone(), config.required_message.clone()),
            highlight: HighlightCoordinator::new(),
            store: TimeWindowStore::new(left, right),
            sequencer: FetchSequencer::new(),
            status: [PaneStatus::Idle; 2],
            config,
            dom,
        };
        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
            source: Rc::new(source),
        })
    }

    /// Initial fetch of the left pane with the server-rendered default window.
    pub fn load_initial(&self) -> Result<PaneFetch, PanelError> {
        let prepared = self
            .inner
            .borrow_mut()
            .prepare(Pane::Left, WindowSource::Pane(Pane::Left), None)?;
        Ok(self.dispatch(prepared))
    }

    /// Move a pane's window. Never blocks or cancels the other pane.
    pub fn shift(&self, request: ShiftRequest) -> Result<PaneFetch, PanelError> {
        let prepared = self
            .inner
            .borrow_mut()
            .prepare(request.pane, request.source, Some(request.shift))?;
        Ok(self.dispatch(prepared))
    }

    /// Date-change control: clears the page's shift field, relabels the page for
    /// the left pane, then shifts.
    pub fn change_date(&self, pane: Pane, shift: impl Into<ShiftToken>) -> Result<PaneFetch, PanelError> {
        {
            let mut guard = self.inner.borrow_mut();
            let this = &mut *guard;
            this.dom.set_field_value(FormField::Shift, "")?;
            if pane == Pane::Left {
                this.dom.set_page_label(&this.config.custom_page_label)?;
            }
        }
        self.shift(ShiftRequest::relative(pane, shift))
    }

    pub fn open_custom_range(&self) -> Result<(), PanelError> {
        let mut guard = self.inner.borrow_mut();
        let this = &mut *guard;
        this.dialog.open(&mut this.dom)?;
        Ok(())
    }

    pub fn close_custom_range(&self) -> Result<(), PanelError> {
        let mut guard = self.inner.borrow_mut();
        let this = &mut *guard;
        this.dialog.close(&mut this.dom)?;
        Ok(())
    }

    /// Validate the dialog and shift the right pane to its window. The dialog is
    /// reset and closed only once the fetch is dispatched; on any error it stays open.
    pub fn submit_custom_range(&self) -> Result<PaneFetch, PanelError> {
        {
            let mut guard = self.inner.borrow_mut();
            let this = &mut *guard;
            let window = this.dialog.validate(&mut this.dom)?;
            this.store.set_custom(window);
        }
        let fetch = self.shift(ShiftRequest::custom())?;
        let mut guard = self.inner.borrow_mut();
        let this = &mut *guard;
        this.dialog.close(&mut this.dom)?;
        Ok(fetch)
    }

    /// Host-side hover entry point, for rows wired outside `PanelDom::bind_row_hover`.
    pub fn on_row_hover(&self, row: &RowHandle, entering: bool) -> Result<usize, PanelError> {
        let mut guard = self.inner.borrow_mut();
        let this = &mut *guard;
        Ok(this.highlight.on_row_hover(&mut this.dom, row, entering)?)
    }

    pub fn status(&self, pane: Pane) -> PaneStatus {
        self.inner.borrow().status[pane.index()]
    }

    pub fn window(&self, pane: Pane) -> TimeWindow {
        self.inner.borrow().store.window(pane).clone()
    }

    pub fn custom_range_open(&self) -> bool {
        self.inner.borrow().dialog.is_open()
    }

    pub fn with_dom<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.inner.borrow().dom)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn dispatch(&self, (ticket, request): (FetchTicket, StatsRequest)) -> PaneFetch {
        let response = self.source.fetch(request);
        let inner = Rc::clone(&self.inner);
        PaneFetch {
            ticket,
            future: Box::pin(async move {
                let result = response.await;
                complete(&inner, ticket, result)
            }),
        }
    }
}
