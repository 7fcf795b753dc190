//! Salary arithmetic over the fixed set of earning and deduction components.

use serde::{Deserialize, Serialize};

use crate::model::PayslipInput;

/// One line of the earnings or deductions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    BasicSalary,
    Hra,
    Allowances,
    SpecialAllowance,
    ProvidentFund,
    IncomeTax,
    ProfessionalTax,
    OtherDeductions,
}

impl Component {
    /// Row label shown on the payslip.
    pub fn label(self) -> &'static str {
        match self {
            Component::BasicSalary => "Basic Salary",
            Component::Hra => "HRA (House Rent Allowance)",
            Component::Allowances => "Other Allowances",
            Component::SpecialAllowance => "Special Allowance",
            Component::ProvidentFund => "Provident Fund (PF)",
            Component::IncomeTax => "Income Tax",
            Component::ProfessionalTax => "Professional Tax",
            Component::OtherDeductions => "Other Deductions",
        }
    }

    /// Whether the row appears for a given amount. Basic salary is always
    /// listed; every other component only when strictly positive.
    pub fn is_listed(self, amount: f64) -> bool {
        self == Component::BasicSalary || amount > 0.0
    }
}

/// Earning components, all non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Earnings {
    pub basic_salary: f64,
    pub hra: f64,
    pub allowances: f64,
    pub special_allowance: f64,
}

impl Earnings {
    pub fn total(&self) -> f64 {
        self.basic_salary + self.hra + self.allowances + self.special_allowance
    }

    /// Components in payslip order.
    pub fn components(&self) -> [(Component, f64); 4] {
        [
            (Component::BasicSalary, self.basic_salary),
            (Component::Hra, self.hra),
            (Component::Allowances, self.allowances),
            (Component::SpecialAllowance, self.special_allowance),
        ]
    }
}

/// Deduction components, all non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deductions {
    pub pf: f64,
    pub tax: f64,
    pub professional_tax: f64,
    pub other_deductions: f64,
}

impl Deductions {
    pub fn total(&self) -> f64 {
        self.pf + self.tax + self.professional_tax + self.other_deductions
    }

    /// Components in payslip order.
    pub fn components(&self) -> [(Component, f64); 4] {
        [
            (Component::ProvidentFund, self.pf),
            (Component::IncomeTax, self.tax),
            (Component::ProfessionalTax, self.professional_tax),
            (Component::OtherDeductions, self.other_deductions),
        ]
    }
}

/// Derived totals; recomputed on every preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryTotals {
    pub total_earnings: f64,
    pub total_deductions: f64,
    pub gross_salary: f64,
    /// Not clamped: negative when deductions exceed earnings.
    pub net_salary: f64,
}

impl SalaryTotals {
    pub fn from_components(earnings: &Earnings, deductions: &Deductions) -> Self {
        let total_earnings = earnings.total();
        let total_deductions = deductions.total();
        let gross_salary = total_earnings;
        Self {
            total_earnings,
            total_deductions,
            gross_salary,
            net_salary: gross_salary - total_deductions,
        }
    }
}

/// Compute the totals for a payslip.
pub fn calculate_salary(input: &PayslipInput) -> SalaryTotals {
    SalaryTotals::from_components(&input.earnings, &input.deductions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earnings(basic: f64, hra: f64, allowances: f64, special: f64) -> Earnings {
        Earnings {
            basic_salary: basic,
            hra,
            allowances,
            special_allowance: special,
        }
    }

    fn deductions(pf: f64, tax: f64, professional: f64, other: f64) -> Deductions {
        Deductions {
            pf,
            tax,
            professional_tax: professional,
            other_deductions: other,
        }
    }

    #[test]
    fn typical_month() {
        let totals = SalaryTotals::from_components(
            &earnings(30000.0, 10000.0, 0.0, 0.0),
            &deductions(3600.0, 0.0, 200.0, 0.0),
        );
        assert_eq!(totals.total_earnings, 40000.0);
        assert_eq!(totals.gross_salary, 40000.0);
        assert_eq!(totals.total_deductions, 3800.0);
        assert_eq!(totals.net_salary, 36200.0);
    }

    #[test]
    fn sums_every_component() {
        let e = earnings(1.0, 2.0, 4.0, 8.0);
        let d = deductions(16.0, 32.0, 64.0, 128.0);
        let totals = SalaryTotals::from_components(&e, &d);
        assert_eq!(totals.total_earnings, 15.0);
        assert_eq!(totals.gross_salary, totals.total_earnings);
        assert_eq!(totals.total_deductions, 240.0);
    }

    #[test]
    fn net_salary_is_not_clamped() {
        let totals = SalaryTotals::from_components(
            &earnings(1000.0, 0.0, 0.0, 0.0),
            &deductions(800.0, 500.0, 0.0, 0.0),
        );
        assert_eq!(totals.net_salary, -300.0);
    }

    #[test]
    fn all_zero() {
        let totals = SalaryTotals::from_components(&Earnings::default(), &Deductions::default());
        assert_eq!(totals, SalaryTotals::default());
    }

    #[test]
    fn listing_rules() {
        assert!(Component::BasicSalary.is_listed(0.0));
        assert!(!Component::Hra.is_listed(0.0));
        assert!(Component::Hra.is_listed(0.01));
        assert!(!Component::IncomeTax.is_listed(0.0));
    }
}
