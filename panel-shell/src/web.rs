//! Browser implementation of `PanelDom` and the JS-facing `TopNPanel` handle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use stats_feed::HttpStatsSource;
use topn_core::{Pane, ShiftRequest};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, EventTarget, HtmlFormElement};

use crate::config::{PanelConfig, SparklineStyle};
use crate::controller::{FetchOutcome, PaneFetch, PaneStatus, PanelController};
use crate::dom::{Boundary, FormField, Highlight, HoverCallback, Metric, PaneRegion, PanelDom, RowHandle};
use crate::error::{DomError, PanelError};
use crate::logging::init_logging;
use crate::sort::{sorted_order, SortKey};
use crate::sparkline::{parse_values, svg_markup};

const DIALOG_ID: &str = "custom_date";
const DIALOG_FORM_ID: &str = "form-custom_date";
const COMPARE_ID: &str = "compare_to";
const PAGE_LABEL_ID: &str = "page_label";

fn js_err(err: JsValue) -> DomError {
    DomError::Js(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Registered event listener, removed from its target on drop.
struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, DomError> {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(js_err)?;
        Ok(Self {
            target: target.clone(),
            event,
            closure,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

type SortState = Rc<RefCell<HashMap<String, SortKey>>>;

pub struct WebDom {
    document: Document,
    hover: [Vec<Listener>; 2],
    sort_listeners: HashMap<String, Vec<Listener>>,
    sort_state: SortState,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            hover: [Vec::new(), Vec::new()],
            sort_listeners: HashMap::new(),
            sort_state: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn from_window() -> Result<Self, DomError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| DomError::Missing("document".to_string()))?;
        Ok(Self::new(document))
    }

    fn by_id(&self, id: &str) -> Result<Element, DomError> {
        self.document
            .get_element_by_id(id)
            .ok_or_else(|| DomError::Missing(format!("#{id}")))
    }

    fn select_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
        select_all(&self.document, selector)
    }

    fn set_shown(elements: &[Element], visible: bool) -> Result<(), DomError> {
        let (remove, add) = if visible {
            ("hidden", "visible")
        } else {
            ("visible", "hidden")
        };
        for el in elements {
            let classes = el.class_list();
            classes.remove_1(remove).map_err(js_err)?;
            classes.add_1(add).map_err(js_err)?;
        }
        Ok(())
    }
}

fn select_all(document: &Document, selector: &str) -> Result<Vec<Element>, DomError> {
    let nodes = document.query_selector_all(selector).map_err(js_err)?;
    Ok((0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn row_selector(pane: Pane, metric: Metric) -> String {
    format!("tr[id^=\"{}\"]", RowHandle::id_prefix(pane, metric))
}

fn table_id(pane: Pane, metric: Metric) -> String {
    format!("{}-{}", pane.as_str(), metric.as_str())
}

fn cell_text(row: &Element, column: usize) -> String {
    row.children()
        .item(column as u32)
        .and_then(|cell| cell.text_content())
        .unwrap_or_default()
}

fn sort_rows(document: &Document, pane: Pane, metric: Metric, key: SortKey) -> Result<(), DomError> {
    let rows = select_all(document, &row_selector(pane, metric))?;
    let Some(parent) = rows.first().and_then(|r| r.parent_node()) else {
        return Ok(());
    };
    let cells: Vec<String> = rows.iter().map(|r| cell_text(r, key.column)).collect();
    for idx in sorted_order(&cells, key.direction) {
        parent.append_child(&rows[idx]).map_err(js_err)?;
    }
    Ok(())
}

impl PanelDom for WebDom {
    fn set_region_visible(&mut self, pane: Pane, region: PaneRegion, visible: bool) -> Result<(), DomError> {
        let p = pane.as_str();
        let selector = match region {
            PaneRegion::Container => format!("#{p}-side"),
            PaneRegion::Loading => format!(".{p}-loading-tr"),
            PaneRegion::Csv => format!(".{p}-csv"),
            PaneRegion::Date => format!(".{p}-date"),
        };
        let elements = self.select_all(&selector)?;
        Self::set_shown(&elements, visible)
    }

    fn set_compare_visible(&mut self, visible: bool) -> Result<(), DomError> {
        let elements: Vec<Element> = self.document.get_element_by_id(COMPARE_ID).into_iter().collect();
        Self::set_shown(&elements, visible)
    }

    fn clear_rows(&mut self, pane: Pane, metric: Metric) -> Result<(), DomError> {
        for row in self.select_all(&row_selector(pane, metric))? {
            row.remove();
        }
        Ok(())
    }

    fn insert_rows(&mut self, pane: Pane, metric: Metric, markup: &str) -> Result<Vec<RowHandle>, DomError> {
        let header = self.by_id(&format!("{}-tr", table_id(pane, metric)))?;
        if !markup.trim().is_empty() {
            header.insert_adjacent_html("afterend", markup).map_err(js_err)?;
        }
        Ok(self
            .select_all(&row_selector(pane, metric))?
            .into_iter()
            .map(|row| RowHandle::new(pane, metric, row.id()))
            .collect())
    }

    fn apply_sorting(&mut self, pane: Pane, metric: Metric) -> Result<(), DomError> {
        let id = table_id(pane, metric);
        let table = self.by_id(&id)?;
        let headers = table.query_selector_all("th").map_err(js_err)?;

        // Dropping the previous set unregisters it; listeners never stack.
        self.sort_listeners.remove(&id);
        let mut listeners = Vec::new();
        for column in 0..headers.length() {
            let Some(header) = headers.get(column) else {
                continue;
            };
            let document = self.document.clone();
            let state = Rc::clone(&self.sort_state);
            let table_key = id.clone();
            let column = column as usize;
            listeners.push(Listener::attach(&header, "click", move |_| {
                let key = SortKey::after_click(state.borrow().get(&table_key).copied(), column);
                state.borrow_mut().insert(table_key.clone(), key);
                if let Err(err) = sort_rows(&document, pane, metric, key) {
                    log::warn!("sorting {} failed: {}", table_key, err);
                }
            })?);
        }
        self.sort_listeners.insert(id.clone(), listeners);

        let active = self.sort_state.borrow().get(&id).copied();
        match active {
            Some(key) => sort_rows(&self.document, pane, metric, key),
            None => Ok(()),
        }
    }

    fn field_value(&self, field: FormField) -> Result<String, DomError> {
        let el = self.by_id(&field.dom_id())?;
        let value = js_sys::Reflect::get(&el, &JsValue::from_str("value")).map_err(js_err)?;
        Ok(value.as_string().unwrap_or_default())
    }

    fn set_field_value(&mut self, field: FormField, value: &str) -> Result<(), DomError> {
        let el = self.by_id(&field.dom_id())?;
        js_sys::Reflect::set(&el, &JsValue::from_str("value"), &JsValue::from_str(value))
            .map_err(js_err)?;
        Ok(())
    }

    fn set_window_label(&mut self, pane: Pane, boundary: Boundary, text: &str) -> Result<(), DomError> {
        let el = self.by_id(&format!("{}-{}-label", pane.as_str(), boundary.as_str()))?;
        el.set_text_content(Some(text));
        Ok(())
    }

    fn set_csv_href(&mut self, pane: Pane, metric: Metric, href: &str) -> Result<(), DomError> {
        let el = self.by_id(&format!("{}-csv", table_id(pane, metric)))?;
        el.set_attribute("href", href).map_err(js_err)
    }

    fn render_sparklines(&mut self, pane: Pane, style: &SparklineStyle) -> Result<(), DomError> {
        for cell in self.select_all(&format!(".{}-trend", pane.as_str()))? {
            let values = parse_values(&cell.text_content().unwrap_or_default());
            if values.is_empty() {
                continue;
            }
            cell.set_inner_html(&svg_markup(&values, style));
        }
        Ok(())
    }

    fn bind_row_hover(&mut self, pane: Pane, rows: &[RowHandle], on_hover: HoverCallback) -> Result<(), DomError> {
        self.unbind_row_hover(pane);
        let mut listeners = Vec::with_capacity(rows.len() * 2);
        for row in rows {
            let Some(el) = self.document.get_element_by_id(&row.dom_id) else {
                continue;
            };
            for (event, entering) in [("mouseover", true), ("mouseout", false)] {
                let (row, on_hover) = (row.clone(), Rc::clone(&on_hover));
                listeners.push(Listener::attach(&el, event, move |_| on_hover(&row, entering))?);
            }
        }
        self.hover[pane.index()] = listeners;
        Ok(())
    }

    fn unbind_row_hover(&mut self, pane: Pane) {
        self.hover[pane.index()].clear();
    }

    fn set_row_highlight(&mut self, row: &RowHandle, highlight: Highlight) -> Result<(), DomError> {
        let Some(el) = self.document.get_element_by_id(&row.dom_id) else {
            return Ok(());
        };
        let cells = el.children();
        for i in 0..cells.length() {
            let Some(cell) = cells.item(i) else {
                continue;
            };
            if !cell.tag_name().eq_ignore_ascii_case("td") {
                continue;
            }
            let classes = cell.class_list();
            classes.remove_1(highlight.opposite().class()).map_err(js_err)?;
            classes.add_1(highlight.class()).map_err(js_err)?;
        }
        Ok(())
    }

    fn set_pane_error(&mut self, pane: Pane, message: Option<&str>) -> Result<(), DomError> {
        let Some(el) = self.document.get_element_by_id(&format!("{}-error", pane.as_str())) else {
            if let Some(msg) = message {
                log::error!("{} pane: {}", pane, msg);
            }
            return Ok(());
        };
        el.set_text_content(message);
        Self::set_shown(&[el], message.is_some())
    }

    fn set_page_label(&mut self, text: &str) -> Result<(), DomError> {
        self.by_id(PAGE_LABEL_ID)?.set_text_content(Some(text));
        Ok(())
    }

    fn open_dialog(&mut self, title: &str) -> Result<(), DomError> {
        let dialog = self.by_id(DIALOG_ID)?;
        match dialog.previous_element_sibling() {
            Some(title_bar) => title_bar.set_text_content(Some(title)),
            None => dialog.set_attribute("title", title).map_err(js_err)?,
        }
        dialog.set_attribute("aria-hidden", "false").map_err(js_err)?;
        Self::set_shown(&[dialog], true)
    }

    fn close_dialog(&mut self) -> Result<(), DomError> {
        let dialog = self.by_id(DIALOG_ID)?;
        dialog.set_attribute("aria-hidden", "true").map_err(js_err)?;
        Self::set_shown(&[dialog], false)
    }

    fn reset_dialog(&mut self) -> Result<(), DomError> {
        let form = self
            .by_id(DIALOG_FORM_ID)?
            .dyn_into::<HtmlFormElement>()
            .map_err(|_| DomError::Js(format!("#{DIALOG_FORM_ID} is not a form")))?;
        form.reset();
        Ok(())
    }

    fn set_field_message(&mut self, field: FormField, message: Option<&str>) -> Result<(), DomError> {
        let el = self.by_id(&field.dom_id())?;
        match message {
            Some(msg) => {
                el.set_attribute("aria-invalid", "true").map_err(js_err)?;
                el.set_attribute("title", msg).map_err(js_err)
            }
            None => {
                el.remove_attribute("aria-invalid").map_err(js_err)?;
                el.remove_attribute("title").map_err(js_err)
            }
        }
    }
}

fn spawn(fetch: PaneFetch) {
    spawn_local(async move {
        match fetch.await {
            FetchOutcome::Rendered { ticket, has_stats } => {
                log::debug!("{} pane rendered #{} (has_stats={})", ticket.pane, ticket.seq, has_stats)
            }
            FetchOutcome::Superseded(ticket) => {
                log::debug!("{} pane response #{} superseded", ticket.pane, ticket.seq)
            }
            FetchOutcome::Failed { .. } => {}
        }
    });
}

fn parse_pane(side: &str) -> Result<Pane, JsValue> {
    side.parse::<Pane>().map_err(to_js)
}

/// Handle the page script keeps for the lifetime of the panel.
#[wasm_bindgen]
pub struct TopNPanel {
    controller: PanelController<WebDom, HttpStatsSource>,
}

#[wasm_bindgen]
impl TopNPanel {
    #[wasm_bindgen(constructor)]
    pub fn new(endpoint: Option<String>, log_level: Option<String>) -> Result<TopNPanel, JsValue> {
        console_error_panic_hook::set_once();
        let mut config = PanelConfig::default();
        if let Some(endpoint) = endpoint {
            config = config.with_endpoint(endpoint);
        }
        if let Some(level) = log_level {
            config = config.with_log_level_str(&level);
        }
        init_logging(config.log_level);

        let dom = WebDom::from_window().map_err(to_js)?;
        let source = HttpStatsSource::new(config.endpoint.clone());
        let controller = PanelController::new(dom, source, config).map_err(to_js)?;
        Ok(TopNPanel { controller })
    }

    /// Fetch the left pane for the server-rendered window.
    #[wasm_bindgen]
    pub fn start(&self) -> Result<(), JsValue> {
        spawn(self.controller.load_initial().map_err(to_js)?);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn shift(&self, side: &str, shift: &str) -> Result<(), JsValue> {
        let pane = parse_pane(side)?;
        spawn(
            self.controller
                .shift(ShiftRequest::relative(pane, shift))
                .map_err(to_js)?,
        );
        Ok(())
    }

    #[wasm_bindgen]
    pub fn change_date(&self, side: &str, shift: &str) -> Result<(), JsValue> {
        let pane = parse_pane(side)?;
        spawn(self.controller.change_date(pane, shift).map_err(to_js)?);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn open_custom_range(&self) -> Result<(), JsValue> {
        self.controller.open_custom_range().map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn close_custom_range(&self) -> Result<(), JsValue> {
        self.controller.close_custom_range().map_err(to_js)
    }

    /// Returns whether the dialog was accepted; the page keeps it open otherwise.
    #[wasm_bindgen]
    pub fn submit_custom_range(&self) -> bool {
        match self.controller.submit_custom_range() {
            Ok(fetch) => {
                spawn(fetch);
                true
            }
            Err(PanelError::Validation(err)) => {
                log::info!("custom range rejected: {}", err);
                false
            }
            Err(err) => {
                log::error!("custom range submit failed: {}", err);
                false
            }
        }
    }

    /// `idle`, `loading` or `failed`.
    #[wasm_bindgen]
    pub fn status(&self, side: &str) -> Result<String, JsValue> {
        let status = match self.controller.status(parse_pane(side)?) {
            PaneStatus::Idle => "idle",
            PaneStatus::Loading { .. } => "loading",
            PaneStatus::Failed => "failed",
        };
        Ok(status.to_string())
    }
}
