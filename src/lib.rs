//! # payslip-forge – salary slips as HTML and single-page PDFs
//!
//! The stages are:
//!
//! 1. **Form** – raw field values, validated into a payslip input ([`model`])
//! 2. **Calculate** – earnings, deductions, gross and net ([`salary`])
//! 3. **Render** – an escaped markup tree of the payslip ([`template`], [`markup`])
//! 4. **Capture** – style and lay the view out with Taffy into a scaled
//!    display list ([`style`], [`layout`], [`surface`])
//! 5. **Export** – fit the capture onto one page and encode it via printpdf
//!    ([`export`], [`pdf`])
//!
//! [`controller::FormController`] ties the stages to the preview / reset /
//! export lifecycle.

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod fonts;
pub mod format;
pub mod images;
pub mod layout;
pub mod markup;
pub mod model;
pub mod pdf;
pub mod salary;
pub mod style;
pub mod surface;
pub mod template;

// Re-exports for convenience
pub use config::PayslipConfig;
pub use controller::{FormController, LogNotifier, Notice, Notifier, ViewState};
pub use error::{Error, ExportError, ImageLoadError, Result, ValidationError};
pub use export::{DocumentSettings, PdfExporter, PdfFile};
pub use images::{FsFileReader, ImageInput, SlotKind};
pub use layout::{CaptureOptions, LayoutRasterizer, Rasterizer};
pub use model::{PayslipForm, PayslipInput};
pub use pdf::{PdfEncoder, PrintPdfEncoder};
pub use salary::{calculate_salary, SalaryTotals};
pub use template::{render_payslip, RenderedPayslip};
