use topn_core::{TimeWindow, WindowSource};

use crate::dom::{Boundary, FormField, PanelDom};
use crate::error::{DomError, PanelError, ValidationError};

/// Modal collecting an absolute start/stop pair for the right pane.
#[derive(Debug, Clone)]
pub struct CustomRangeDialog {
    title: String,
    required_message: String,
    open: bool,
}

impl CustomRangeDialog {
    pub fn new(title: impl Into<String>, required_message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            required_message: required_message.into(),
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open<D: PanelDom + ?Sized>(&mut self, dom: &mut D) -> Result<(), DomError> {
        dom.open_dialog(&self.title)?;
        self.open = true;
        Ok(())
    }

    /// Closing by any path resets the form.
    pub fn close<D: PanelDom + ?Sized>(&mut self, dom: &mut D) -> Result<(), DomError> {
        dom.close_dialog()?;
        self.open = false;
        self.reset(dom)
    }

    pub fn reset<D: PanelDom + ?Sized>(&self, dom: &mut D) -> Result<(), DomError> {
        dom.reset_dialog()?;
        for field in Self::fields() {
            dom.set_field_message(field, None)?;
        }
        Ok(())
    }

    /// Both boundaries are required. Messages are written next to every empty field.
    pub fn validate<D: PanelDom + ?Sized>(&self, dom: &mut D) -> Result<TimeWindow, PanelError> {
        let mut values = Vec::with_capacity(2);
        let mut missing = Vec::new();
        for field in Self::fields() {
            let value = dom.field_value(field)?;
            if value.trim().is_empty() {
                dom.set_field_message(field, Some(&self.required_message))?;
                missing.push(field);
            } else {
                dom.set_field_message(field, None)?;
            }
            values.push(value.trim().to_string());
        }
        if !missing.is_empty() {
            return Err(ValidationError::Required(missing).into());
        }
        let stop = values.pop().unwrap_or_default();
        let start = values.pop().unwrap_or_default();
        Ok(TimeWindow::new(start, stop))
    }

    fn fields() -> [FormField; 2] {
        Boundary::ALL.map(|b| FormField::Window(WindowSource::Custom, b))
    }
}
