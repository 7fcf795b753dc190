//! Form controller – owns the form, the image slots and the current view,
//! and sequences preview, reset and export.
//!
//! ```text
//! Idle --preview--> Previewed --begin_export--> Exporting
//!  ^                    ^                           |
//!  |                    +-------finish_export-------+
//!  +------------------reset (from any state)
//! ```
//!
//! A reset bumps an epoch counter so that an export started before it
//! cannot move the controller out of Idle when it completes.

use chrono::NaiveDate;

use crate::error::{ExportError, ImageLoadError, ValidationError};
use crate::export::{export_filename, PdfExporter, PdfFile};
use crate::images::{FileReader, ImageInput, ImageSlots, SlotKind, UploadTicket};
use crate::layout::Rasterizer;
use crate::model::PayslipForm;
use crate::pdf::PdfEncoder;
use crate::salary::calculate_salary;
use crate::template::{placeholder, render_payslip, RenderedPayslip};

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing previewed; the placeholder is shown.
    Idle,
    /// A payslip is shown and may be exported.
    Previewed,
    /// An export is running; further exports are refused.
    Exporting,
}

/// User-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    InvalidForm,
    NoPreview,
    ExportFailed,
    ImageLoadFailed,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::InvalidForm => "Please fill in all required fields",
            Notice::NoPreview => "Please generate a payslip preview first",
            Notice::ExportFailed => "Error generating PDF. Please try again.",
            Notice::ImageLoadFailed => "Could not load the selected image",
        }
    }
}

/// Receives user-facing notices.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        log::warn!("{}", notice.message());
    }
}

/// An export handed out by [`FormController::begin_export`].
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub view: RenderedPayslip,
    pub filename: String,
    epoch: u64,
}

pub struct FormController<N: Notifier = LogNotifier> {
    form: PayslipForm,
    images: ImageSlots,
    state: ViewState,
    view: RenderedPayslip,
    epoch: u64,
    notifier: N,
}

impl FormController<LogNotifier> {
    pub fn new(today: NaiveDate) -> Self {
        Self::with_notifier(today, LogNotifier)
    }
}

impl<N: Notifier> FormController<N> {
    pub fn with_notifier(today: NaiveDate, notifier: N) -> Self {
        Self {
            form: PayslipForm::with_defaults(today),
            images: ImageSlots::default(),
            state: ViewState::Idle,
            view: placeholder(),
            epoch: 0,
            notifier,
        }
    }

    pub fn form(&self) -> &PayslipForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PayslipForm {
        &mut self.form
    }

    pub fn images(&self) -> &ImageSlots {
        &self.images
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// The current view: the placeholder until the first preview.
    pub fn view(&self) -> &RenderedPayslip {
        &self.view
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    // -- Preview / reset ----------------------------------------------------

    /// Validate the form and render it. On failure nothing changes.
    pub fn preview(&mut self) -> Result<&RenderedPayslip, ValidationError> {
        let input = match self.form.to_input(self.images.to_payslip_images()) {
            Ok(input) => input,
            Err(e) => {
                log::warn!("Preview refused: {e}");
                self.notifier.notify(Notice::InvalidForm);
                return Err(e);
            }
        };
        let totals = calculate_salary(&input);
        self.view = render_payslip(&input, &totals);
        if self.state == ViewState::Idle {
            self.state = ViewState::Previewed;
        }
        log::debug!(
            "Previewed payslip for {} (net {:.2}), state {:?}",
            input.employee_id,
            totals.net_salary,
            self.state
        );
        Ok(&self.view)
    }

    /// Clear everything back to a fresh form dated `today`.
    pub fn reset(&mut self, today: NaiveDate) {
        self.form = PayslipForm::with_defaults(today);
        self.images.reset();
        self.view = placeholder();
        self.state = ViewState::Idle;
        self.epoch += 1;
        log::debug!("Form reset (epoch {})", self.epoch);
    }

    // -- Images -------------------------------------------------------------

    /// Use a URL for `kind`. Blank input is ignored.
    pub fn set_image_url(&mut self, kind: SlotKind, url: &str) -> bool {
        self.images.set_url(kind, url)
    }

    /// Start a file upload for `kind`; pass the ticket to [`apply_upload`].
    ///
    /// [`apply_upload`]: FormController::apply_upload
    pub fn begin_image_upload(&mut self, kind: SlotKind) -> UploadTicket {
        self.images.begin_upload(kind)
    }

    /// Apply a finished upload. Stale uploads are dropped and failures leave
    /// the slot unchanged. Returns whether the slot changed.
    pub fn apply_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<String, ImageLoadError>,
    ) -> bool {
        match result {
            Ok(data_uri) => self.images.complete_upload(ticket, data_uri),
            Err(e) => {
                log::warn!("{:?} upload failed: {e}", ticket.kind());
                self.notifier.notify(Notice::ImageLoadFailed);
                false
            }
        }
    }

    /// Resolve a file or URL choice into the slot for `kind`.
    pub async fn resolve_image<F: FileReader>(
        &mut self,
        kind: SlotKind,
        input: ImageInput,
        reader: &F,
    ) -> bool {
        match input {
            ImageInput::Url(url) => self.set_image_url(kind, &url),
            ImageInput::File(path) => {
                let ticket = self.begin_image_upload(kind);
                let result = reader.read_as_data_uri(&path).await;
                self.apply_upload(ticket, result)
            }
        }
    }

    // -- Export -------------------------------------------------------------

    /// Claim the export slot. Requires a preview and no export in flight.
    pub fn begin_export(&mut self, today: NaiveDate) -> Result<ExportJob, ExportError> {
        match self.state {
            ViewState::Idle => {
                self.notifier.notify(Notice::NoPreview);
                Err(ExportError::NothingToExport)
            }
            ViewState::Exporting => {
                log::debug!("Export refused: another export is in flight");
                Err(ExportError::InFlight)
            }
            ViewState::Previewed => {
                self.state = ViewState::Exporting;
                let filename =
                    export_filename(&self.form.employee_name, &self.form.payslip_month, today);
                log::debug!("Export started: {filename}");
                Ok(ExportJob {
                    view: self.view.clone(),
                    filename,
                    epoch: self.epoch,
                })
            }
        }
    }

    /// Release the export slot and report failures.
    pub fn finish_export(
        &mut self,
        job: ExportJob,
        result: Result<PdfFile, ExportError>,
    ) -> Result<PdfFile, ExportError> {
        if job.epoch == self.epoch && self.state == ViewState::Exporting {
            self.state = ViewState::Previewed;
        }
        match &result {
            Ok(file) => log::info!("Exported {} ({} bytes)", file.filename, file.bytes.len()),
            Err(e) => {
                log::warn!("Export of {} failed: {e}", job.filename);
                self.notifier.notify(Notice::ExportFailed);
            }
        }
        result
    }

    /// Run a whole export with `exporter`.
    pub async fn export<R: Rasterizer, E: PdfEncoder>(
        &mut self,
        exporter: &PdfExporter<R, E>,
        today: NaiveDate,
    ) -> Result<PdfFile, ExportError> {
        let job = self.begin_export(today)?;
        let result = exporter.export(&job.view, &job.filename).await;
        self.finish_export(job, result)
    }
}
