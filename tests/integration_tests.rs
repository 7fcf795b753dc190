//! Integration tests for the payslip pipeline.
//!
//! These tests validate:
//! - Salary totals and which breakdown rows appear
//! - Free text is rendered inert
//! - Preview / reset / export lifecycle of the controller
//! - End-to-end PDF output through the real Taffy and printpdf collaborators

use std::path::PathBuf;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use payslip_forge::format::format_currency;
use payslip_forge::images::{encode_data_uri, FileReader};
use payslip_forge::markup::{text_content, visit_elements, Node, Tag};
use payslip_forge::model::{ImageRef, DEFAULT_LOGO};
use payslip_forge::surface::Surface;
use payslip_forge::{
    calculate_salary, CaptureOptions, DocumentSettings, ExportError, FormController,
    FsFileReader, ImageInput, LayoutRasterizer, PayslipForm, PdfExporter, PrintPdfEncoder,
    Rasterizer, RenderedPayslip, SlotKind, ViewState,
};

// =====================================================================
// Helpers
// =====================================================================

// 1×1 transparent PNG
const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
}

fn scenario_form() -> PayslipForm {
    PayslipForm {
        company_name: "Acme Technologies Pvt Ltd".into(),
        company_address: "4th Floor, 12 MG Road, Bengaluru".into(),
        payslip_month: "2025-03".into(),
        employee_name: "Asha Rao".into(),
        employee_id: "EMP-042".into(),
        pay_period: "01 Mar 2025 - 31 Mar 2025".into(),
        total_paid_days: "30".into(),
        lop_days: "1".into(),
        payment_date: "2025-03-31".into(),
        basic_salary: "30000".into(),
        hra: "10000".into(),
        allowances: "0".into(),
        special_allowance: "0".into(),
        pf: "3600".into(),
        tax: "0".into(),
        professional_tax: "200".into(),
        other_deductions: "0".into(),
    }
}

fn controller_with(form: PayslipForm) -> FormController {
    let mut controller = FormController::new(today());
    *controller.form_mut() = form;
    controller
}

fn offline_capture() -> CaptureOptions {
    CaptureOptions {
        use_cors: false,
        ..CaptureOptions::default()
    }
}

fn exporter() -> PdfExporter<LayoutRasterizer, PrintPdfEncoder> {
    PdfExporter::new(
        LayoutRasterizer,
        offline_capture(),
        DocumentSettings::default(),
        "Payslip",
    )
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

/// Labels of the body rows of a table, totals excluded.
fn row_labels(view: &RenderedPayslip, table_class: &str) -> Vec<String> {
    let mut labels = Vec::new();
    visit_elements(view.nodes(), &mut |e| {
        if e.tag == Tag::Table && e.has_class(table_class) {
            visit_elements(&e.children, &mut |row| {
                if row.tag != Tag::Tr || row.has_class("total-row") {
                    return;
                }
                if let Some(first) = row.children.first() {
                    if matches!(first, Node::Element(cell) if cell.tag == Tag::Td) {
                        labels.push(text_content(first));
                    }
                }
            });
        }
    });
    labels
}

struct FailingRasterizer;

impl Rasterizer for FailingRasterizer {
    async fn capture(
        &self,
        _view: &RenderedPayslip,
        _options: &CaptureOptions,
    ) -> Result<Surface, ExportError> {
        Err(ExportError::Capture("canvas unavailable".into()))
    }
}

// =====================================================================
// Calculation and rendering
// =====================================================================

#[test]
fn scenario_totals_and_rows() {
    let mut controller = controller_with(scenario_form());
    let view = controller.preview().unwrap().clone();

    let input = scenario_form()
        .to_input(payslip_forge::model::PayslipImages::default())
        .unwrap();
    let totals = calculate_salary(&input);
    assert_eq!(totals.total_earnings, 40000.0);
    assert_eq!(totals.gross_salary, 40000.0);
    assert_eq!(totals.total_deductions, 3800.0);
    assert_eq!(totals.net_salary, 36200.0);

    assert_eq!(
        row_labels(&view, "earnings-table"),
        vec!["Basic Salary", "HRA (House Rent Allowance)"]
    );
    assert_eq!(
        row_labels(&view, "deductions-table"),
        vec!["Provident Fund (PF)", "Professional Tax"]
    );

    let html = view.markup();
    assert!(html.contains("\u{20B9}40,000.00"));
    assert!(html.contains("\u{20B9}3,800.00"));
    assert!(html.contains("\u{20B9}36,200.00"));
    assert!(!html.contains("Other Allowances"));
    assert!(!html.contains("Special Allowance"));
    assert!(!html.contains("Income Tax"));
}

#[test]
fn all_zero_salary_lists_only_basic() {
    let mut form = scenario_form();
    for field in [
        &mut form.basic_salary,
        &mut form.hra,
        &mut form.allowances,
        &mut form.special_allowance,
        &mut form.pf,
        &mut form.tax,
        &mut form.professional_tax,
        &mut form.other_deductions,
    ] {
        field.clear();
    }
    let mut controller = controller_with(form);
    let view = controller.preview().unwrap().clone();

    assert_eq!(row_labels(&view, "earnings-table"), vec!["Basic Salary"]);
    assert!(row_labels(&view, "deductions-table").is_empty());
    let html = view.markup();
    assert!(html.contains("<td class=\"amount\">\u{20B9}0.00</td>"));
    assert!(html.contains("Total Earnings"));
    assert!(html.contains("Total Deductions"));
    assert!(html.contains("Net Salary (Take Home):"));
}

#[test]
fn optional_rows_listed_only_when_positive() {
    let cases = [
        ("earnings-table", "HRA (House Rent Allowance)"),
        ("earnings-table", "Other Allowances"),
        ("earnings-table", "Special Allowance"),
        ("deductions-table", "Provident Fund (PF)"),
        ("deductions-table", "Income Tax"),
        ("deductions-table", "Professional Tax"),
        ("deductions-table", "Other Deductions"),
    ];

    for (table, label) in cases {
        let mut form = scenario_form();
        for field in [
            &mut form.hra,
            &mut form.allowances,
            &mut form.special_allowance,
            &mut form.pf,
            &mut form.tax,
            &mut form.professional_tax,
            &mut form.other_deductions,
        ] {
            *field = "0".into();
        }
        let field = match label {
            "HRA (House Rent Allowance)" => &mut form.hra,
            "Other Allowances" => &mut form.allowances,
            "Special Allowance" => &mut form.special_allowance,
            "Provident Fund (PF)" => &mut form.pf,
            "Income Tax" => &mut form.tax,
            "Professional Tax" => &mut form.professional_tax,
            _ => &mut form.other_deductions,
        };
        *field = "1234.5".into();

        let mut controller = controller_with(form);
        let view = controller.preview().unwrap().clone();

        let (earnings, deductions) = if table == "earnings-table" {
            (vec!["Basic Salary", label], vec![])
        } else {
            (vec!["Basic Salary"], vec![label])
        };
        assert_eq!(row_labels(&view, "earnings-table"), earnings, "{label}");
        assert_eq!(row_labels(&view, "deductions-table"), deductions, "{label}");

        let row = format!(
            "<tr><td>{label}</td><td class=\"amount\">{}</td></tr>",
            format_currency(1234.5)
        );
        assert!(view.markup().contains(&row), "missing row for {label}");
    }
}

#[test]
fn deductions_above_earnings_give_negative_net() {
    let mut form = scenario_form();
    form.tax = "50000".into();
    let mut controller = controller_with(form);
    let html = controller.preview().unwrap().markup().to_string();
    assert!(html.contains("-\u{20B9}13,800.00"));
}

#[test]
fn free_text_is_inert() {
    let payload = "<script>alert(\"x\")</script> & 'q'";
    let mut form = scenario_form();
    form.company_name = payload.into();
    form.employee_name = payload.into();
    form.company_address = payload.into();
    form.pay_period = payload.into();
    form.employee_id = payload.into();

    let mut controller = controller_with(form);
    let view = controller.preview().unwrap().clone();
    let html = view.markup();

    assert!(!html.contains("<script>"));
    assert_eq!(
        html.matches("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;q&#39;")
            .count(),
        5
    );

    // No user string introduced an attribute.
    visit_elements(view.nodes(), &mut |e| {
        for (name, _) in &e.attributes {
            assert!(
                ["class", "src", "alt", "onerror"].contains(&name.as_str()),
                "unexpected attribute {name}"
            );
        }
    });
}

#[test]
fn markup_is_deterministic() {
    let digest = |form: PayslipForm| {
        let mut controller = controller_with(form);
        let markup = controller.preview().unwrap().markup().to_string();
        hex::encode(Sha256::digest(markup.as_bytes()))
    };
    let a = digest(scenario_form());
    let b = digest(scenario_form());
    assert_eq!(a, b);

    let mut changed = scenario_form();
    changed.hra = "10001".into();
    assert_ne!(a, digest(changed));
}

// =====================================================================
// Controller lifecycle
// =====================================================================

#[test]
fn missing_required_field_blocks_preview() {
    let mut form = scenario_form();
    form.pay_period.clear();
    let mut controller = controller_with(form);
    assert!(controller.preview().is_err());
    assert_eq!(controller.state(), ViewState::Idle);
    assert!(controller.view().markup().contains("payslip-placeholder"));
}

#[test]
fn reset_restores_image_defaults() {
    let mut controller = controller_with(scenario_form());
    controller.set_image_url(SlotKind::Logo, "https://example.com/acme.png");
    controller.set_image_url(SlotKind::EmployerSignature, "https://example.com/ceo.png");
    controller.set_image_url(SlotKind::EmployeeSignature, "https://example.com/asha.png");
    controller.preview().unwrap();

    controller.reset(today());
    assert_eq!(controller.state(), ViewState::Idle);
    assert_eq!(
        controller.images().get(SlotKind::Logo),
        Some(&ImageRef::Url(DEFAULT_LOGO.to_string()))
    );
    assert_eq!(controller.images().get(SlotKind::EmployerSignature), None);
    assert_eq!(controller.images().get(SlotKind::EmployeeSignature), None);
    assert_eq!(controller.form(), &PayslipForm::with_defaults(today()));

    // The next preview uses the defaults again.
    *controller.form_mut() = scenario_form();
    let html = controller.preview().unwrap().markup().to_string();
    assert!(html.contains("src=\"logo.png\""));
    assert_eq!(html.matches("<img").count(), 1);
}

#[tokio::test]
async fn export_in_flight_rejects_second_export() {
    let mut controller = controller_with(scenario_form());
    controller.preview().unwrap();

    let job = controller.begin_export(today()).unwrap();
    let err = controller.export(&exporter(), today()).await.unwrap_err();
    assert_eq!(err, ExportError::InFlight);

    let result = exporter().export(&job.view, &job.filename).await;
    let file = controller.finish_export(job, result).unwrap();
    assert_valid_pdf(&file.bytes);
    assert_eq!(controller.state(), ViewState::Previewed);

    // Released: a new export goes through.
    assert!(controller.export(&exporter(), today()).await.is_ok());
}

#[tokio::test]
async fn capture_failure_returns_to_previewed() {
    let mut controller = controller_with(scenario_form());
    controller.preview().unwrap();

    let failing: PdfExporter<_, PrintPdfEncoder> = PdfExporter::new(
        FailingRasterizer,
        offline_capture(),
        DocumentSettings::default(),
        "Payslip",
    );
    let err = controller.export(&failing, today()).await.unwrap_err();
    assert!(matches!(err, ExportError::Capture(_)));
    assert_eq!(controller.state(), ViewState::Previewed);
}

#[tokio::test]
async fn export_without_preview_is_refused() {
    let mut controller = controller_with(scenario_form());
    let err = controller.export(&exporter(), today()).await.unwrap_err();
    assert_eq!(err, ExportError::NothingToExport);
    assert_eq!(controller.state(), ViewState::Idle);
}

// =====================================================================
// End to end
// =====================================================================

#[tokio::test]
async fn end_to_end_pdf() {
    let mut controller = controller_with(scenario_form());
    controller.preview().unwrap();
    let file = controller.export(&exporter(), today()).await.unwrap();

    assert_eq!(file.filename, "Asha Rao_2025-03_payslip.pdf");
    assert_valid_pdf(&file.bytes);
}

#[tokio::test]
async fn capture_fits_a4_width() {
    let mut controller = controller_with(scenario_form());
    let view = controller.preview().unwrap().clone();
    let surface = LayoutRasterizer
        .capture(&view, &offline_capture())
        .await
        .unwrap();

    assert_eq!(surface.scale, 2.0);
    assert_eq!(surface.width, 1588.0);
    assert!(surface.height > 0.0);
    assert_eq!(surface.background, [1.0, 1.0, 1.0, 1.0]);

    let lines = surface.text_lines();
    assert!(lines.contains(&"Salary Slip"));
    assert!(lines.contains(&"March 2025"));
    assert!(lines.contains(&"\u{20B9}36,200.00"));
    // The default logo is not on disk here, so it is hidden.
    assert!(surface.image_boxes().is_empty());
}

#[tokio::test]
async fn uploaded_signature_is_inlined_and_embedded() {
    let dir = std::env::temp_dir().join(format!("payslip-it-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path: PathBuf = dir.join("signature.png");
    let png = {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(PNG_1X1)
            .unwrap()
    };
    tokio::fs::write(&path, &png).await.unwrap();

    let uri = FsFileReader.read_as_data_uri(&path).await.unwrap();
    assert_eq!(uri, encode_data_uri(&png).unwrap());

    let mut controller = controller_with(scenario_form());
    assert!(
        controller
            .resolve_image(
                SlotKind::EmployeeSignature,
                ImageInput::File(path.clone()),
                &FsFileReader
            )
            .await
    );
    let view = controller.preview().unwrap().clone();
    assert!(view.markup().contains("src=\"data:image/png;base64,"));

    let surface = LayoutRasterizer
        .capture(&view, &offline_capture())
        .await
        .unwrap();
    let placed = surface.image_boxes();
    assert_eq!(placed.len(), 1);
    // 50 px tall at scale 2.
    assert_eq!(placed[0].height, 100.0);

    let file = controller.export(&exporter(), today()).await.unwrap();
    assert_valid_pdf(&file.bytes);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn unreadable_upload_leaves_slot_unchanged() {
    let mut controller = controller_with(scenario_form());
    let applied = controller
        .resolve_image(
            SlotKind::Logo,
            ImageInput::File(PathBuf::from("/no/such/logo.png")),
            &FsFileReader,
        )
        .await;
    assert!(!applied);
    assert_eq!(
        controller.images().get(SlotKind::Logo).map(ImageRef::as_str),
        Some(DEFAULT_LOGO)
    );
}
