//! In-memory doubles for the DOM and the stats endpoint.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use futures::channel::oneshot;
use stats_feed::{FetchError, StatsFuture, StatsRequest, StatsResponse, StatsResult, StatsSource};
use topn_core::{Pane, Timestamp, WindowSource};

use crate::config::SparklineStyle;
use crate::dom::{Boundary, FormField, Highlight, HoverCallback, Metric, PaneRegion, PanelDom, RowHandle};
use crate::error::DomError;

#[derive(Default)]
pub struct FakeDom {
    pub fields: HashMap<String, String>,
    pub visible: HashSet<(Pane, PaneRegion)>,
    pub compare_visible: bool,
    pub rows: HashMap<(Pane, Metric), Vec<String>>,
    pub row_classes: HashMap<String, BTreeSet<&'static str>>,
    pub labels: HashMap<(Pane, Boundary), String>,
    pub csv: HashMap<(Pane, Metric), String>,
    pub sparkline_renders: Vec<Pane>,
    pub sort_calls: Vec<(Pane, Metric)>,
    pub hover: HashMap<Pane, (Vec<RowHandle>, HoverCallback)>,
    pub hover_binds: usize,
    pub errors: HashMap<Pane, String>,
    pub page_label: Option<String>,
    pub dialog_open: bool,
    pub dialog_title: Option<String>,
    pub dialog_resets: usize,
    pub messages: HashMap<String, String>,
    /// Page without the CSV export links.
    pub missing_csv: bool,
}

impl FakeDom {
    /// Page as served: left defaults filled in, right pane hidden, left loading.
    pub fn served() -> Self {
        let mut dom = FakeDom::default();
        for (id, value) in [
            ("cluster_id", "1"),
            ("n", "10"),
            ("shift", "today_prev_day"),
            ("left-start", "T0"),
            ("left-stop", "T1"),
            ("right-start", "T0"),
            ("right-stop", "T1"),
            ("custom-start", ""),
            ("custom-stop", ""),
        ] {
            dom.fields.insert(id.to_string(), value.to_string());
        }
        dom.visible.insert((Pane::Left, PaneRegion::Container));
        dom.visible.insert((Pane::Left, PaneRegion::Loading));
        dom
    }

    pub fn is_visible(&self, pane: Pane, region: PaneRegion) -> bool {
        self.visible.contains(&(pane, region))
    }

    pub fn field(&self, id: &str) -> &str {
        self.fields.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn row_ids(&self, pane: Pane, metric: Metric) -> Vec<String> {
        self.rows.get(&(pane, metric)).cloned().unwrap_or_default()
    }

    pub fn classes(&self, dom_id: &str) -> Vec<&'static str> {
        self.row_classes
            .get(dom_id)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Bound hover listener of a row. Call it outside any borrow of the dom,
    /// as the browser event loop would.
    pub fn hover_listener(&self, pane: Pane, dom_id: &str) -> Option<(RowHandle, HoverCallback)> {
        let (rows, callback) = self.hover.get(&pane)?;
        let row = rows.iter().find(|r| r.dom_id == dom_id)?;
        Some((row.clone(), callback.clone()))
    }
}

fn ids_in_markup(markup: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = markup;
    while let Some(pos) = rest.find("id=\"") {
        rest = &rest[pos + 4..];
        match rest.find('"') {
            Some(end) => {
                ids.push(rest[..end].to_string());
                rest = &rest[end..];
            }
            None => break,
        }
    }
    ids
}

impl PanelDom for FakeDom {
    fn set_region_visible(&mut self, pane: Pane, region: PaneRegion, visible: bool) -> Result<(), DomError> {
        if visible {
            self.visible.insert((pane, region));
        } else {
            self.visible.remove(&(pane, region));
        }
        Ok(())
    }

    fn set_compare_visible(&mut self, visible: bool) -> Result<(), DomError> {
        self.compare_visible = visible;
        Ok(())
    }

    fn clear_rows(&mut self, pane: Pane, metric: Metric) -> Result<(), DomError> {
        for id in self.rows.remove(&(pane, metric)).unwrap_or_default() {
            self.row_classes.remove(&id);
        }
        Ok(())
    }

    fn insert_rows(&mut self, pane: Pane, metric: Metric, markup: &str) -> Result<Vec<RowHandle>, DomError> {
        let prefix = RowHandle::id_prefix(pane, metric);
        let rows = self.rows.entry((pane, metric)).or_default();
        for id in ids_in_markup(markup) {
            if id.starts_with(&prefix) {
                self.row_classes.insert(id.clone(), BTreeSet::from(["default"]));
                rows.push(id);
            }
        }
        Ok(rows
            .iter()
            .map(|id| RowHandle::new(pane, metric, id.as_str()))
            .collect())
    }

    fn apply_sorting(&mut self, pane: Pane, metric: Metric) -> Result<(), DomError> {
        self.sort_calls.push((pane, metric));
        Ok(())
    }

    fn field_value(&self, field: FormField) -> Result<String, DomError> {
        let id = field.dom_id();
        self.fields.get(&id).cloned().ok_or(DomError::Missing(id))
    }

    fn set_field_value(&mut self, field: FormField, value: &str) -> Result<(), DomError> {
        self.fields.insert(field.dom_id(), value.to_string());
        Ok(())
    }

    fn set_window_label(&mut self, pane: Pane, boundary: Boundary, text: &str) -> Result<(), DomError> {
        self.labels.insert((pane, boundary), text.to_string());
        Ok(())
    }

    fn set_csv_href(&mut self, pane: Pane, metric: Metric, href: &str) -> Result<(), DomError> {
        if self.missing_csv {
            return Err(DomError::Missing(format!("#{}-{}-csv", pane, metric.as_str())));
        }
        self.csv.insert((pane, metric), href.to_string());
        Ok(())
    }

    fn render_sparklines(&mut self, pane: Pane, _style: &SparklineStyle) -> Result<(), DomError> {
        self.sparkline_renders.push(pane);
        Ok(())
    }

    fn bind_row_hover(&mut self, pane: Pane, rows: &[RowHandle], on_hover: HoverCallback) -> Result<(), DomError> {
        self.hover.insert(pane, (rows.to_vec(), on_hover));
        self.hover_binds += 1;
        Ok(())
    }

    fn unbind_row_hover(&mut self, pane: Pane) {
        self.hover.remove(&pane);
    }

    fn set_row_highlight(&mut self, row: &RowHandle, highlight: Highlight) -> Result<(), DomError> {
        let classes = self
            .row_classes
            .get_mut(&row.dom_id)
            .ok_or_else(|| DomError::Missing(row.dom_id.clone()))?;
        classes.remove(highlight.opposite().class());
        classes.insert(highlight.class());
        Ok(())
    }

    fn set_pane_error(&mut self, pane: Pane, message: Option<&str>) -> Result<(), DomError> {
        match message {
            Some(msg) => self.errors.insert(pane, msg.to_string()),
            None => self.errors.remove(&pane),
        };
        Ok(())
    }

    fn set_page_label(&mut self, text: &str) -> Result<(), DomError> {
        self.page_label = Some(text.to_string());
        Ok(())
    }

    fn open_dialog(&mut self, title: &str) -> Result<(), DomError> {
        self.dialog_open = true;
        self.dialog_title = Some(title.to_string());
        Ok(())
    }

    fn close_dialog(&mut self) -> Result<(), DomError> {
        self.dialog_open = false;
        Ok(())
    }

    fn reset_dialog(&mut self) -> Result<(), DomError> {
        self.dialog_resets += 1;
        for boundary in Boundary::ALL {
            self.fields
                .insert(FormField::Window(WindowSource::Custom, boundary).dom_id(), String::new());
        }
        Ok(())
    }

    fn set_field_message(&mut self, field: FormField, message: Option<&str>) -> Result<(), DomError> {
        match message {
            Some(msg) => self.messages.insert(field.dom_id(), msg.to_string()),
            None => self.messages.remove(&field.dom_id()),
        };
        Ok(())
    }
}

/// Stats endpoint whose responses are released by the test, in any order.
#[derive(Default)]
pub struct ScriptedSource {
    calls: RefCell<Vec<(StatsRequest, Option<oneshot::Sender<StatsResult>>)>>,
}

impl ScriptedSource {
    pub fn requests(&self) -> Vec<StatsRequest> {
        self.calls.borrow().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Resolve the `idx`-th dispatched request.
    pub fn respond(&self, idx: usize, result: StatsResult) {
        let sender = self.calls.borrow_mut()[idx].1.take();
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }
}

impl StatsSource for ScriptedSource {
    fn fetch(&self, request: StatsRequest) -> StatsFuture {
        let (tx, rx) = oneshot::channel();
        self.calls.borrow_mut().push((request, Some(tx)));
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::Transport("request dropped".to_string())))
        })
    }
}

/// Response for `pane` with one mean and one usage row per identifier.
pub fn response(pane: Pane, start: &str, stop: &str, ids: &[&str]) -> StatsResponse {
    let rows = |metric: &str| -> String {
        ids.iter()
            .map(|id| format!("<tr id=\"{}-tr-{}-{}\"><td>{}</td><td>1,2,3</td></tr>", pane, metric, id, id))
            .collect()
    };
    StatsResponse {
        mean: rows("mean"),
        usage: rows("usage"),
        start: Timestamp::new(start),
        stop: Timestamp::new(stop),
        start_label: format!("from {start}"),
        stop_label: format!("to {stop}"),
        has_stats: !ids.is_empty(),
        usage_csv_href: format!("/csv/{pane}/usage"),
        mean_csv_href: format!("/csv/{pane}/mean"),
    }
}
