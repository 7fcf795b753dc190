//! Form state and the validated payslip input built from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::format::{month_key, parse_date, parse_month};
use crate::salary::{Deductions, Earnings};

/// Reference bundled with the page and used when no logo was chosen.
pub const DEFAULT_LOGO: &str = "logo.png";

/// A displayable image: a remote/relative URL or a self-contained data URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageRef {
    Url(String),
    DataUri(String),
}

impl ImageRef {
    /// Classify a trimmed reference; blank input yields `None`.
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            None
        } else {
            Some(Self::from(reference.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Url(s) | ImageRef::DataUri(s) => s,
        }
    }

    /// Whether the reference may be placed in an `src` attribute. Script
    /// schemes and data URIs that are not images are refused.
    pub fn is_displayable(&self) -> bool {
        let lower = self.as_str().trim_start().to_ascii_lowercase();
        match self {
            ImageRef::DataUri(_) => lower.starts_with("data:image/"),
            ImageRef::Url(_) => {
                !(lower.starts_with("javascript:")
                    || lower.starts_with("vbscript:")
                    || lower.starts_with("data:"))
            }
        }
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        if value
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
        {
            ImageRef::DataUri(value)
        } else {
            ImageRef::Url(value)
        }
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        match value {
            ImageRef::Url(s) | ImageRef::DataUri(s) => s,
        }
    }
}

/// Raw form state: every field exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayslipForm {
    // Company
    pub company_name: String,
    pub company_address: String,
    /// `YYYY-MM`
    pub payslip_month: String,

    // Employee
    pub employee_name: String,
    pub employee_id: String,
    pub pay_period: String,

    // Attendance & payment
    pub total_paid_days: String,
    pub lop_days: String,
    /// `YYYY-MM-DD`
    pub payment_date: String,

    // Earnings
    pub basic_salary: String,
    pub hra: String,
    pub allowances: String,
    pub special_allowance: String,

    // Deductions
    pub pf: String,
    pub tax: String,
    pub professional_tax: String,
    pub other_deductions: String,
}

impl PayslipForm {
    /// An empty form with the date fields set to the current month and day.
    pub fn with_defaults(today: NaiveDate) -> Self {
        let mut form = Self::default();
        form.apply_date_defaults(today);
        form
    }

    /// Reset the month picker and payment date to `today`.
    pub fn apply_date_defaults(&mut self, today: NaiveDate) {
        self.payslip_month = month_key(today);
        self.payment_date = today.format("%Y-%m-%d").to_string();
    }

    /// Required text fields as `(field name, value)`.
    fn required_fields(&self) -> [(&'static str, &str); 8] {
        [
            ("companyName", &self.company_name),
            ("payslipMonth", &self.payslip_month),
            ("employeeName", &self.employee_name),
            ("employeeId", &self.employee_id),
            ("payPeriod", &self.pay_period),
            ("totalPaidDays", &self.total_paid_days),
            ("lopDays", &self.lop_days),
            ("paymentDate", &self.payment_date),
        ]
    }

    /// Check that every required field is filled in. Number and date
    /// formats are checked by [`PayslipForm::to_input`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in self.required_fields() {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Validate and build a [`PayslipInput`]. Image references are supplied
    /// by the caller, who owns the image slots.
    pub fn to_input(&self, images: PayslipImages) -> Result<PayslipInput, ValidationError> {
        self.validate()?;
        let mut input = self.to_input_unchecked()?;
        input.company_logo = images.company_logo;
        input.employer_signature = images.employer_signature;
        input.employee_signature = images.employee_signature;
        Ok(input)
    }

    fn to_input_unchecked(&self) -> Result<PayslipInput, ValidationError> {
        let payslip_month =
            parse_month(&self.payslip_month).ok_or_else(|| ValidationError::InvalidMonth {
                field: "payslipMonth",
                value: self.payslip_month.clone(),
            })?;
        let payment_date =
            parse_date(&self.payment_date).ok_or_else(|| ValidationError::InvalidDate {
                field: "paymentDate",
                value: self.payment_date.clone(),
            })?;

        Ok(PayslipInput {
            company_name: self.company_name.clone(),
            company_logo: None,
            company_address: self.company_address.clone(),
            payslip_month,
            employee_name: self.employee_name.clone(),
            employee_id: self.employee_id.clone(),
            pay_period: self.pay_period.clone(),
            total_paid_days: parse_amount("totalPaidDays", &self.total_paid_days)?,
            lop_days: parse_amount("lopDays", &self.lop_days)?,
            payment_date,
            earnings: Earnings {
                basic_salary: parse_amount("basicSalary", &self.basic_salary)?,
                hra: parse_amount("hra", &self.hra)?,
                allowances: parse_amount("allowances", &self.allowances)?,
                special_allowance: parse_amount("specialAllowance", &self.special_allowance)?,
            },
            deductions: Deductions {
                pf: parse_amount("pf", &self.pf)?,
                tax: parse_amount("tax", &self.tax)?,
                professional_tax: parse_amount("professionalTax", &self.professional_tax)?,
                other_deductions: parse_amount("otherDeductions", &self.other_deductions)?,
            },
            employer_signature: None,
            employee_signature: None,
        })
    }
}

/// Parse a non-negative decimal; blank input counts as zero.
fn parse_amount(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ValidationError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

/// The three image references attached to a payslip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayslipImages {
    pub company_logo: Option<ImageRef>,
    pub employer_signature: Option<ImageRef>,
    pub employee_signature: Option<ImageRef>,
}

/// Validated payslip data handed to the calculator and renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayslipInput {
    pub company_name: String,
    pub company_logo: Option<ImageRef>,
    pub company_address: String,
    /// First day of the pay month.
    pub payslip_month: NaiveDate,

    pub employee_name: String,
    pub employee_id: String,
    pub pay_period: String,

    /// Display-only; not checked against the length of the month.
    pub total_paid_days: f64,
    /// Display-only loss-of-pay days.
    pub lop_days: f64,
    pub payment_date: NaiveDate,

    pub earnings: Earnings,
    pub deductions: Deductions,

    pub employer_signature: Option<ImageRef>,
    pub employee_signature: Option<ImageRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> PayslipForm {
        PayslipForm {
            company_name: "Acme Pvt Ltd".into(),
            company_address: "12 MG Road, Bengaluru".into(),
            payslip_month: "2025-03".into(),
            employee_name: "Asha Rao".into(),
            employee_id: "EMP-042".into(),
            pay_period: "01 Mar - 31 Mar".into(),
            total_paid_days: "30".into(),
            lop_days: "1".into(),
            payment_date: "2025-03-31".into(),
            basic_salary: "30000".into(),
            hra: "10000".into(),
            pf: "3600".into(),
            professional_tax: "200".into(),
            ..Default::default()
        }
    }

    #[test]
    fn builds_input_with_zero_defaults() {
        let input = filled_form().to_input(PayslipImages::default()).unwrap();
        assert_eq!(input.earnings.basic_salary, 30000.0);
        assert_eq!(input.earnings.allowances, 0.0);
        assert_eq!(input.deductions.tax, 0.0);
        assert_eq!(input.payslip_month, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(input.total_paid_days, 30.0);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut form = filled_form();
        form.employee_id = "   ".into();
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField("employeeId"))
        );
    }

    #[test]
    fn negative_and_garbage_numbers_are_rejected() {
        let mut form = filled_form();
        form.hra = "-5".into();
        assert!(matches!(
            form.to_input(PayslipImages::default()),
            Err(ValidationError::InvalidNumber { field: "hra", .. })
        ));

        form.hra = "abc".into();
        assert!(form.to_input(PayslipImages::default()).is_err());

        form.hra = "NaN".into();
        assert!(form.to_input(PayslipImages::default()).is_err());
    }

    #[test]
    fn missing_field_wins_over_bad_number() {
        let mut form = filled_form();
        form.company_name.clear();
        form.pf = "abc".into();
        assert_eq!(form.validate(), Err(ValidationError::MissingField("companyName")));
        assert_eq!(
            form.to_input(PayslipImages::default()),
            Err(ValidationError::MissingField("companyName"))
        );

        form.company_name = "Acme".into();
        assert_eq!(form.validate(), Ok(()));
        assert!(matches!(
            form.to_input(PayslipImages::default()),
            Err(ValidationError::InvalidNumber { field: "pf", .. })
        ));
    }

    #[test]
    fn days_are_not_bounded_by_month_length() {
        let mut form = filled_form();
        form.total_paid_days = "45".into();
        form.lop_days = "2.5".into();
        let input = form.to_input(PayslipImages::default()).unwrap();
        assert_eq!(input.total_paid_days, 45.0);
        assert_eq!(input.lop_days, 2.5);
    }

    #[test]
    fn date_defaults() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let form = PayslipForm::with_defaults(today);
        assert_eq!(form.payslip_month, "2026-10");
        assert_eq!(form.payment_date, "2026-10-17");
        assert!(form.company_name.is_empty());
    }

    #[test]
    fn image_ref_classification() {
        assert_eq!(ImageRef::parse("   "), None);
        assert_eq!(
            ImageRef::parse("  https://example.com/logo.png "),
            Some(ImageRef::Url("https://example.com/logo.png".into()))
        );
        let data = ImageRef::parse("data:image/png;base64,AAAA").unwrap();
        assert!(matches!(data, ImageRef::DataUri(_)));
        assert!(data.is_displayable());
        assert!(!ImageRef::parse("javascript:alert(1)").unwrap().is_displayable());
        assert!(!ImageRef::parse("data:text/html,<b>x</b>").unwrap().is_displayable());
    }

    #[test]
    fn form_deserializes_from_camel_case_json() {
        let json = r#"{"companyName":"Acme","basicSalary":"1000","lopDays":"0"}"#;
        let form: PayslipForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.company_name, "Acme");
        assert_eq!(form.basic_salary, "1000");
        assert!(form.hra.is_empty());
    }
}
