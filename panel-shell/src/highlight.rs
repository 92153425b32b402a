use topn_core::Pane;

use crate::dom::{Highlight, PanelDom, RowHandle};
use crate::error::DomError;
use crate::render::RowIndex;

/// Mirrors a hovered row's highlight onto every row of both panes sharing its identifier.
/// Purely visual: never touches windows or fetches.
#[derive(Debug, Clone, Default)]
pub struct HighlightCoordinator {
    indices: [RowIndex; 2],
}

impl HighlightCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_index(&mut self, pane: Pane, index: RowIndex) {
        self.indices[pane.index()] = index;
    }

    pub fn clear(&mut self, pane: Pane) {
        self.indices[pane.index()] = RowIndex::default();
    }

    /// Returns how many rows changed. Rows without an identifier are a no-op.
    pub fn on_row_hover<D: PanelDom + ?Sized>(
        &self,
        dom: &mut D,
        row: &RowHandle,
        entering: bool,
    ) -> Result<usize, DomError> {
        let Some(id) = &row.row_id else {
            return Ok(0);
        };
        let highlight = if entering {
            Highlight::Hover
        } else {
            Highlight::Default
        };
        let mut touched = 0;
        for pane in Pane::ALL {
            for target in self.indices[pane.index()].get(id) {
                dom.set_row_highlight(target, highlight)?;
                touched += 1;
            }
        }
        Ok(touched)
    }
}
