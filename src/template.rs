//! Payslip renderer – maps a [`PayslipInput`] and its [`SalaryTotals`] to the
//! payslip view.
//!
//! The class names double as the capture stylesheet's selectors (see
//! [`crate::style`]), so the PDF export lays out exactly what the HTML shows.

use crate::format::{format_currency, format_date, format_days, format_month};
use crate::markup::{el, to_html, Element, Node, Tag};
use crate::model::{ImageRef, PayslipInput};
use crate::salary::{Component, SalaryTotals};

/// Hides a broken image instead of showing the broken-image glyph.
pub const IMAGE_FALLBACK: &str = "this.style.display='none'";

/// A rendered payslip: the node tree and its serialized markup.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPayslip {
    nodes: Vec<Node>,
    markup: String,
}

impl RenderedPayslip {
    pub fn new(nodes: Vec<Node>) -> Self {
        let markup = to_html(&nodes);
        Self { nodes, markup }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

/// Render the payslip view.
pub fn render_payslip(input: &PayslipInput, totals: &SalaryTotals) -> RenderedPayslip {
    let nodes = vec![
        header(input).into(),
        employee_section(input).into(),
        attendance_section(input).into(),
        salary_breakdown(input, totals).into(),
        salary_summary(totals).into(),
        signatures(input).into(),
    ];
    RenderedPayslip::new(nodes)
}

/// The view shown before any preview.
pub fn placeholder() -> RenderedPayslip {
    RenderedPayslip::new(vec![el(Tag::Div, "payslip-placeholder")
        .with_child(Element::new(Tag::Div).with_text(
            "Fill in the form and click \"Preview Payslip\" to see your payslip here",
        ))
        .into()])
}

fn image(reference: Option<&ImageRef>, alt: &str, class: &str) -> Option<Element> {
    let reference = reference.filter(|r| r.is_displayable())?;
    Some(
        Element::new(Tag::Img)
            .with_attr("src", reference.as_str())
            .with_attr("alt", alt)
            .with_class(class)
            .with_attr("onerror", IMAGE_FALLBACK),
    )
}

fn header(input: &PayslipInput) -> Element {
    el(Tag::Div, "payslip-header")
        .with_children(image(
            input.company_logo.as_ref(),
            "Company Logo",
            "company-logo",
        ))
        .with_child(el(Tag::Div, "company-name").with_text(&input.company_name))
        .with_child(el(Tag::Div, "company-address").with_text(&input.company_address))
        .with_child(el(Tag::Div, "payslip-title").with_text("Salary Slip"))
        .with_child(el(Tag::Div, "payslip-month").with_text(format_month(input.payslip_month)))
}

fn detail_item(label: &str, value: String) -> Element {
    el(Tag::Div, "detail-item")
        .with_child(el(Tag::Span, "detail-label").with_text(label))
        .with_child(el(Tag::Span, "detail-value").with_text(value))
}

fn employee_section(input: &PayslipInput) -> Element {
    el(Tag::Div, "employee-section")
        .with_child(el(Tag::Div, "section-title").with_text("Employee Details"))
        .with_child(
            el(Tag::Div, "employee-details")
                .with_child(detail_item("Employee Name:", input.employee_name.clone()))
                .with_child(detail_item("Employee ID:", input.employee_id.clone()))
                .with_child(detail_item("Pay Period:", input.pay_period.clone())),
        )
}

fn attendance_section(input: &PayslipInput) -> Element {
    el(Tag::Div, "attendance-section")
        .with_child(el(Tag::Div, "section-title").with_text("Attendance & Payment Details"))
        .with_child(
            el(Tag::Div, "attendance-details")
                .with_child(detail_item(
                    "Total Paid Days:",
                    format_days(input.total_paid_days),
                ))
                .with_child(detail_item(
                    "Loss of Pay (LOP) Days:",
                    format_days(input.lop_days),
                ))
                .with_child(detail_item(
                    "Payment Date:",
                    format_date(input.payment_date),
                )),
        )
}

fn amount_row(label: &str, amount: f64) -> Element {
    Element::new(Tag::Tr)
        .with_child(Element::new(Tag::Td).with_text(label))
        .with_child(el(Tag::Td, "amount").with_text(format_currency(amount)))
}

fn total_row(label: &str, amount: f64) -> Element {
    el(Tag::Tr, "total-row")
        .with_child(
            Element::new(Tag::Td).with_child(Element::new(Tag::Strong).with_text(label)),
        )
        .with_child(
            el(Tag::Td, "amount")
                .with_child(Element::new(Tag::Strong).with_text(format_currency(amount))),
        )
}

fn amount_table(
    class: &str,
    heading: &str,
    components: &[(Component, f64)],
    total_label: &str,
    total: f64,
) -> Element {
    let rows = components
        .iter()
        .filter(|(component, amount)| component.is_listed(*amount))
        .map(|(component, amount)| amount_row(component.label(), *amount));

    el(Tag::Table, class)
        .with_child(
            Element::new(Tag::Thead).with_child(
                Element::new(Tag::Tr)
                    .with_child(Element::new(Tag::Th).with_text(heading))
                    .with_child(el(Tag::Th, "amount").with_text("Amount (\u{20B9})")),
            ),
        )
        .with_child(
            Element::new(Tag::Tbody)
                .with_children(rows)
                .with_child(total_row(total_label, total)),
        )
}

fn salary_breakdown(input: &PayslipInput, totals: &SalaryTotals) -> Element {
    el(Tag::Div, "salary-breakdown")
        .with_child(amount_table(
            "earnings-table",
            "Earnings",
            &input.earnings.components(),
            "Total Earnings",
            totals.total_earnings,
        ))
        .with_child(amount_table(
            "deductions-table",
            "Deductions",
            &input.deductions.components(),
            "Total Deductions",
            totals.total_deductions,
        ))
}

fn summary_row(label: &str, amount: f64) -> Element {
    el(Tag::Div, "summary-row")
        .with_child(el(Tag::Span, "summary-label").with_text(label))
        .with_child(el(Tag::Span, "summary-value").with_text(format_currency(amount)))
}

fn salary_summary(totals: &SalaryTotals) -> Element {
    el(Tag::Div, "salary-summary")
        .with_child(summary_row("Gross Salary:", totals.gross_salary))
        .with_child(summary_row("Total Deductions:", totals.total_deductions))
        .with_child(summary_row("Net Salary (Take Home):", totals.net_salary))
}

fn signatures(input: &PayslipInput) -> Element {
    el(Tag::Div, "signatures-section")
        .with_child(
            el(Tag::Div, "signature-box")
                .with_children(image(
                    input.employer_signature.as_ref(),
                    "Employer Signature",
                    "signature-image",
                ))
                .with_child(
                    el(Tag::Div, "signature-label")
                        .with_text("Authorized Signature")
                        .with_child(Element::new(Tag::Br))
                        .with_text("(Founder/Employer)"),
                ),
        )
        .with_child(
            el(Tag::Div, "signature-box")
                .with_children(image(
                    input.employee_signature.as_ref(),
                    "Employee Signature",
                    "signature-image",
                ))
                .with_child(el(Tag::Div, "signature-label").with_text("Employee Signature")),
        )
}

/// Wrap the view in a standalone page with its stylesheet.
pub fn standalone_document(view: &RenderedPayslip, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n\
         <div id=\"payslip\" class=\"payslip\">{}</div>\n</body>\n</html>\n",
        crate::markup::escape_html(title),
        STYLESHEET,
        view.markup()
    )
}

/// Browser stylesheet matching the capture stylesheet.
pub const STYLESHEET: &str = r#"body { font-family: Helvetica, Arial, sans-serif; color: #1f2937; background: #f3f4f6; }
.payslip { width: 794px; margin: 24px auto; padding: 32px; background: #ffffff; box-sizing: border-box; }
.payslip-header { text-align: center; padding-bottom: 16px; margin-bottom: 20px; border-bottom: 2px solid #1e3a8a; }
.company-logo { display: block; height: 60px; margin: 0 auto 8px; }
.company-name { font-size: 24px; font-weight: bold; color: #1e3a8a; }
.company-address { font-size: 12px; color: #6b7280; margin-top: 4px; }
.payslip-title { font-size: 18px; font-weight: bold; margin-top: 12px; }
.payslip-month { font-size: 14px; color: #374151; }
.section-title { font-size: 14px; font-weight: bold; background: #e5e7eb; padding: 6px 8px; margin-bottom: 8px; }
.employee-section, .attendance-section { margin-bottom: 16px; }
.detail-item { display: flex; justify-content: space-between; font-size: 12px; padding: 3px 8px; }
.detail-label { font-weight: bold; color: #4b5563; }
.salary-breakdown { display: flex; gap: 16px; margin-bottom: 16px; }
.salary-breakdown table { flex: 1; border-collapse: collapse; font-size: 12px; border: 1px solid #d1d5db; }
.salary-breakdown th, .salary-breakdown td { padding: 6px 8px; border: 1px solid #d1d5db; text-align: left; }
.salary-breakdown th { background: #1e3a8a; color: #ffffff; }
.salary-breakdown .amount { text-align: right; }
.total-row td { background: #f3f4f6; }
.salary-summary { background: #eff6ff; padding: 12px 16px; margin-bottom: 32px; }
.summary-row { display: flex; justify-content: space-between; font-size: 13px; padding: 3px 0; }
.summary-label, .summary-value { font-weight: bold; }
.signatures-section { display: flex; justify-content: space-between; gap: 48px; margin-top: 40px; }
.signature-box { flex: 1; text-align: center; }
.signature-image { display: block; height: 50px; margin: 0 auto 6px; }
.signature-label { border-top: 1px solid #374151; padding-top: 6px; font-size: 11px; color: #4b5563; }
.payslip-placeholder { text-align: center; color: #9ca3af; padding: 48px; }
"#;
