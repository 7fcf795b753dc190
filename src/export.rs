//! Export – captures the rendered view, fits it onto one page and hands it
//! to the PDF encoder.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::format::month_key;
use crate::layout::{CaptureOptions, Rasterizer};
use crate::pdf::PdfEncoder;
use crate::template::RenderedPayslip;

// ---------------------------------------------------------------------------
// Document settings
// ---------------------------------------------------------------------------

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Unit for page geometry and image placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Pt,
    In,
}

impl Unit {
    /// PDF points per unit.
    pub fn points(self) -> f32 {
        match self {
            Unit::Mm => 72.0 / 25.4,
            Unit::Pt => 1.0,
            Unit::In => 72.0,
        }
    }
}

/// Paper size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    #[default]
    #[serde(alias = "a4")]
    A4,
    #[serde(alias = "a5")]
    A5,
    #[serde(alias = "letter")]
    Letter,
    #[serde(alias = "legal")]
    Legal,
}

impl PageFormat {
    /// Portrait (width, height) in millimetres.
    pub fn size_mm(self) -> (f32, f32) {
        match self {
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::A5 => (148.0, 210.0),
            PageFormat::Letter => (215.9, 279.4),
            PageFormat::Legal => (215.9, 355.6),
        }
    }
}

/// Settings for the PDF document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub orientation: Orientation,
    pub unit: Unit,
    pub format: PageFormat,
}

impl DocumentSettings {
    fn size(&self) -> (f32, f32) {
        let (w_mm, h_mm) = self.format.size_mm();
        let per_mm = Unit::Mm.points() / self.unit.points();
        (w_mm * per_mm, h_mm * per_mm)
    }

    /// Effective page width in the document unit, after orientation.
    pub fn page_width(&self) -> f32 {
        let (w, h) = self.size();
        match self.orientation {
            Orientation::Portrait => w,
            Orientation::Landscape => h,
        }
    }

    /// Effective page height in the document unit, after orientation.
    pub fn page_height(&self) -> f32 {
        let (w, h) = self.size();
        match self.orientation {
            Orientation::Portrait => h,
            Orientation::Landscape => w,
        }
    }
}

// ---------------------------------------------------------------------------
// Placement and naming
// ---------------------------------------------------------------------------

/// Where the captured image lands on the page, in the document unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale a `surface_width` × `surface_height` image to the page width; if it
/// is then taller than the page, shrink both sides to the page height and
/// centre it horizontally. The image always starts at the top.
pub fn fit_to_page(
    surface_width: f32,
    surface_height: f32,
    page_width: f32,
    page_height: f32,
) -> Placement {
    let mut width = page_width;
    let mut height = surface_height * page_width / surface_width;
    if height > page_height {
        let ratio = page_height / height;
        width *= ratio;
        height = page_height;
    }
    Placement {
        x: (page_width - width) / 2.0,
        y: 0.0,
        width,
        height,
    }
}

/// `{employeeName}_{payslipMonth}_payslip.pdf`, with `payslip` and the
/// current month standing in for blank values.
pub fn export_filename(employee_name: &str, payslip_month: &str, today: NaiveDate) -> String {
    let name = match employee_name.trim() {
        "" => "payslip".to_string(),
        name => name.to_string(),
    };
    let month = match payslip_month.trim() {
        "" => month_key(today),
        month => month.to_string(),
    };
    sanitize_filename(&format!("{name}_{month}_payslip.pdf"))
}

/// Replace path separators and control characters with `_`.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// An encoded PDF and the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl PdfFile {
    /// Write into `dir` through a temporary file and a rename, so a partial
    /// file never appears under the final name.
    pub async fn write_atomically(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let target = dir.join(&self.filename);
        let tmp = dir.join(format!(".{}.tmp", self.filename));
        if let Err(e) = tokio::fs::write(&tmp, &self.bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        tokio::fs::rename(&tmp, &target).await?;
        Ok(target)
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// Capture-then-encode pipeline.
pub struct PdfExporter<R, E> {
    rasterizer: R,
    capture: CaptureOptions,
    document: DocumentSettings,
    title: String,
    encoder: PhantomData<E>,
}

impl<R: Rasterizer, E: PdfEncoder> PdfExporter<R, E> {
    pub fn new(
        rasterizer: R,
        capture: CaptureOptions,
        document: DocumentSettings,
        title: impl Into<String>,
    ) -> Self {
        Self {
            rasterizer,
            capture,
            document,
            title: title.into(),
            encoder: PhantomData,
        }
    }

    pub fn document(&self) -> &DocumentSettings {
        &self.document
    }

    /// Capture `view` and encode it as a one-page PDF named `filename`.
    pub async fn export(
        &self,
        view: &RenderedPayslip,
        filename: &str,
    ) -> Result<PdfFile, ExportError> {
        let surface = self.rasterizer.capture(view, &self.capture).await?;

        let placement = fit_to_page(
            surface.width,
            surface.height,
            self.document.page_width(),
            self.document.page_height(),
        );
        log::debug!(
            "Placing {}x{} px surface at ({:.2}, {:.2}) size {:.2}x{:.2}",
            surface.width,
            surface.height,
            placement.x,
            placement.y,
            placement.width,
            placement.height
        );

        let mut encoder = E::create(&self.document, &self.title);
        encoder.add_image(
            &surface,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
        )?;
        encoder.save(filename)
    }
}
