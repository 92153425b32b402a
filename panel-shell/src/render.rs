use std::collections::HashMap;

use stats_feed::StatsResponse;
use topn_core::{Pane, RowIdentifier, WindowSource};

use crate::config::SparklineStyle;
use crate::dom::{Boundary, FormField, HoverCallback, Metric, PaneRegion, PanelDom, RowHandle};
use crate::error::DomError;

/// Rows of one pane grouped by correlation key. Built once per render.
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    rows: HashMap<RowIdentifier, Vec<RowHandle>>,
}

impl RowIndex {
    pub fn build(rows: &[RowHandle]) -> Self {
        let mut index: HashMap<RowIdentifier, Vec<RowHandle>> = HashMap::new();
        for row in rows {
            if let Some(id) = &row.row_id {
                index.entry(id.clone()).or_default().push(row.clone());
            }
        }
        Self { rows: index }
    }

    pub fn get(&self, id: &RowIdentifier) -> &[RowHandle] {
        self.rows.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Applies fetch results to one pane's regions.
#[derive(Debug, Clone, Default)]
pub struct PaneRenderer {
    sparkline: SparklineStyle,
}

impl PaneRenderer {
    pub fn new(sparkline: SparklineStyle) -> Self {
        Self { sparkline }
    }

    /// Put a pane into its loading state ahead of a fetch.
    pub fn begin_loading<D: PanelDom + ?Sized>(&self, dom: &mut D, pane: Pane) -> Result<(), DomError> {
        if pane == Pane::Right {
            dom.set_region_visible(pane, PaneRegion::Container, true)?;
        }
        dom.set_region_visible(pane, PaneRegion::Csv, false)?;
        dom.set_region_visible(pane, PaneRegion::Date, false)?;
        dom.set_pane_error(pane, None)?;
        dom.unbind_row_hover(pane);
        for metric in Metric::ALL {
            dom.clear_rows(pane, metric)?;
        }
        dom.set_region_visible(pane, PaneRegion::Loading, true)
    }

    /// Render a response into `pane`, returning the index the highlight coordinator should use.
    pub fn render<D: PanelDom + ?Sized>(
        &self,
        dom: &mut D,
        pane: Pane,
        response: &StatsResponse,
        on_hover: HoverCallback,
    ) -> Result<RowIndex, DomError> {
        dom.set_region_visible(pane, PaneRegion::Loading, false)?;
        dom.set_pane_error(pane, None)?;

        let mut rows = Vec::new();
        for metric in Metric::ALL {
            let markup = match metric {
                Metric::Mean => &response.mean,
                Metric::Usage => &response.usage,
            };
            rows.extend(dom.insert_rows(pane, metric, markup)?);
            dom.apply_sorting(pane, metric)?;
        }

        for boundary in Boundary::ALL {
            let (value, label) = match boundary {
                Boundary::Start => (&response.start, &response.start_label),
                Boundary::Stop => (&response.stop, &response.stop_label),
            };
            dom.set_field_value(FormField::Window(WindowSource::Pane(pane), boundary), value.as_str())?;
            dom.set_window_label(pane, boundary, label)?;
        }
        dom.set_region_visible(pane, PaneRegion::Date, true)?;

        if !response.has_stats {
            dom.set_region_visible(pane, PaneRegion::Csv, false)?;
            dom.unbind_row_hover(pane);
            return Ok(RowIndex::default());
        }

        dom.set_region_visible(pane, PaneRegion::Csv, true)?;
        dom.set_compare_visible(true)?;
        dom.render_sparklines(pane, &self.sparkline)?;
        dom.set_csv_href(pane, Metric::Usage, &response.usage_csv_href)?;
        dom.set_csv_href(pane, Metric::Mean, &response.mean_csv_href)?;
        dom.bind_row_hover(pane, &rows, on_hover)?;
        Ok(RowIndex::build(&rows))
    }

    /// Failure branch: stop the spinner and say what went wrong.
    pub fn show_failure<D: PanelDom + ?Sized>(&self, dom: &mut D, pane: Pane, message: &str) -> Result<(), DomError> {
        dom.set_region_visible(pane, PaneRegion::Loading, false)?;
        dom.set_pane_error(pane, Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{response, FakeDom};
    use std::rc::Rc;

    fn noop() -> HoverCallback {
        Rc::new(|_: &RowHandle, _: bool| {})
    }

    #[test]
    fn stats_render_reveals_exports_and_binds_hover() {
        let mut dom = FakeDom::served();
        let renderer = PaneRenderer::default();
        let resp = response(Pane::Left, "T0", "T1", &["a", "b"]);
        let index = renderer.render(&mut dom, Pane::Left, &resp, noop()).unwrap();

        assert!(!dom.is_visible(Pane::Left, PaneRegion::Loading));
        assert!(dom.is_visible(Pane::Left, PaneRegion::Csv));
        assert!(dom.is_visible(Pane::Left, PaneRegion::Date));
        assert!(dom.compare_visible);
        assert_eq!(dom.row_ids(Pane::Left, Metric::Mean), vec!["left-tr-mean-a", "left-tr-mean-b"]);
        assert_eq!(dom.csv[&(Pane::Left, Metric::Usage)], "/csv/left/usage");
        assert_eq!(dom.labels[&(Pane::Left, Boundary::Stop)], "to T1");
        assert_eq!(dom.field("left-start"), "T0");
        assert_eq!(dom.sparkline_renders, vec![Pane::Left]);
        assert_eq!(dom.sort_calls, vec![(Pane::Left, Metric::Mean), (Pane::Left, Metric::Usage)]);
        assert_eq!(dom.hover[&Pane::Left].0.len(), 4);
        assert_eq!(index.len(), 2);
        let a = RowIdentifier::from_dom_id("a").unwrap();
        assert_eq!(index.get(&a).len(), 2);
    }

    #[test]
    fn empty_render_keeps_exports_hidden_regardless_of_prior_state() {
        let mut dom = FakeDom::served();
        let renderer = PaneRenderer::default();
        renderer
            .render(&mut dom, Pane::Right, &response(Pane::Right, "T0", "T1", &["a"]), noop())
            .unwrap();
        assert!(dom.is_visible(Pane::Right, PaneRegion::Csv));

        // Loading was never shown for this one; it must still end hidden.
        dom.set_region_visible(Pane::Right, PaneRegion::Loading, true).unwrap();
        let index = renderer
            .render(&mut dom, Pane::Right, &response(Pane::Right, "T2", "T3", &[]), noop())
            .unwrap();

        assert!(index.is_empty());
        assert!(!dom.is_visible(Pane::Right, PaneRegion::Csv));
        assert!(!dom.is_visible(Pane::Right, PaneRegion::Loading));
        assert!(dom.is_visible(Pane::Right, PaneRegion::Date));
        assert!(!dom.hover.contains_key(&Pane::Right));
        assert_eq!(dom.sparkline_renders, vec![Pane::Right]);
        assert_eq!(dom.field("right-stop"), "T3");
    }

    #[test]
    fn begin_loading_reveals_right_pane_and_clears_rows() {
        let mut dom = FakeDom::served();
        let renderer = PaneRenderer::default();
        renderer
            .render(&mut dom, Pane::Right, &response(Pane::Right, "T0", "T1", &["a"]), noop())
            .unwrap();
        dom.visible.remove(&(Pane::Right, PaneRegion::Container));

        renderer.begin_loading(&mut dom, Pane::Right).unwrap();
        assert!(dom.is_visible(Pane::Right, PaneRegion::Container));
        assert!(dom.is_visible(Pane::Right, PaneRegion::Loading));
        assert!(!dom.is_visible(Pane::Right, PaneRegion::Csv));
        assert!(!dom.is_visible(Pane::Right, PaneRegion::Date));
        assert!(dom.row_ids(Pane::Right, Metric::Usage).is_empty());
        assert!(!dom.hover.contains_key(&Pane::Right));
    }

    #[test]
    fn failure_hides_spinner_and_shows_error() {
        let mut dom = FakeDom::served();
        let renderer = PaneRenderer::default();
        renderer.begin_loading(&mut dom, Pane::Left).unwrap();
        renderer.show_failure(&mut dom, Pane::Left, "stats endpoint returned HTTP 500").unwrap();
        assert!(!dom.is_visible(Pane::Left, PaneRegion::Loading));
        assert_eq!(dom.errors[&Pane::Left], "stats endpoint returned HTTP 500");
    }
}
