//! Fee, interest and savings-requirement arithmetic
//!
//! All amounts are integer minor currency units; fractions are rounded down.

use serde::Serialize;

use crate::config::WorkflowConfig;
use crate::workflow::WorkflowError;

const BPS_DENOMINATOR: i128 = 10_000;

/// Fees deducted from the principal at disbursement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub processing_fee: i64,
    pub insurance_fee: i64,
    pub total_fees: i64,
    pub net_disbursement: i64,
}

impl FeeBreakdown {
    /// `None` when no fees are configured
    pub fn compute(principal: i64, config: &WorkflowConfig) -> Option<Self> {
        if config.processing_fee_bps == 0 && config.insurance_fee_bps == 0 {
            return None;
        }

        let processing_fee = apply_bps(principal, config.processing_fee_bps);
        let insurance_fee = apply_bps(principal, config.insurance_fee_bps);
        let total_fees = processing_fee.saturating_add(insurance_fee);

        Some(Self {
            processing_fee,
            insurance_fee,
            total_fees,
            net_disbursement: principal.saturating_sub(total_fees).max(0),
        })
    }
}

pub fn apply_bps(amount: i64, bps: i64) -> i64 {
    let value = amount as i128 * bps as i128 / BPS_DENOMINATOR;
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Principal plus flat interest; becomes the outstanding balance on disbursement
pub fn total_repayable(principal: i64, interest_rate_bps: i64) -> i64 {
    principal.saturating_add(apply_bps(principal, interest_rate_bps))
}

/// Savings a client must already hold before borrowing `principal`
pub fn required_savings(principal: i64, pct: i64) -> i64 {
    let value = (principal as i128 * pct as i128 + 99) / 100;
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub fn check_savings_requirement(
    savings_balance: i64,
    principal: i64,
    pct: Option<i64>,
) -> Result<(), WorkflowError> {
    let Some(pct) = pct else {
        return Ok(());
    };

    let required = required_savings(principal, pct);
    if savings_balance < required {
        return Err(WorkflowError::Invalid(format!(
            "Client savings of {} are below the required {} ({}% of principal)",
            savings_balance, required, pct
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fees_configured() {
        assert!(FeeBreakdown::compute(100_000, &WorkflowConfig::default()).is_none());
    }

    #[test]
    fn test_fee_breakdown_rounds_down() {
        let config = WorkflowConfig {
            processing_fee_bps: 250,
            insurance_fee_bps: 125,
            ..Default::default()
        };

        let fees = FeeBreakdown::compute(10_001, &config).unwrap();
        assert_eq!(fees.processing_fee, 250);
        assert_eq!(fees.insurance_fee, 125);
        assert_eq!(fees.total_fees, 375);
        assert_eq!(fees.net_disbursement, 9_626);
    }

    #[test]
    fn test_flat_interest() {
        assert_eq!(total_repayable(100_000, 1_500), 115_000);
        assert_eq!(total_repayable(100_000, 0), 100_000);
    }

    #[test]
    fn test_savings_requirement() {
        assert_eq!(required_savings(100_000, 20), 20_000);
        assert_eq!(required_savings(99, 20), 20);

        assert!(check_savings_requirement(0, 100_000, None).is_ok());
        assert!(check_savings_requirement(20_000, 100_000, Some(20)).is_ok());
        assert!(check_savings_requirement(19_999, 100_000, Some(20)).is_err());
    }
}
