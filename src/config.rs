//! Network-wide parameters.
//!
//! The whole object is replaced when a `NewConfig` governance change passes, so
//! every field is mandatory on the wire.

use serde::{Deserialize, Serialize};
use crate::error::{LedgerError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Wallet receiving the treasury share of every knowledge-token mint
    pub treasury_wallet: String,
    /// Rosetta a creator locks against a paper when publishing it
    pub publication_stake: f64,
    pub knowledge_token_author_mint: f64,
    pub knowledge_token_replicator_mint: f64,
    pub knowledge_token_treasury_mint: f64,
    /// Seconds before author tokens and the publication stake unlock
    pub publication_lock_duration: u64,
    pub jury_duty_stake: f64,
    /// Paid per seat when a jury is convened
    pub jury_duty_fee: f64,
    pub initial_jury: u32,
    pub validation_stake: f64,
    pub falsification_stake: f64,
    pub transaction_fee: f64,
    pub settlement_duration: u64,
    pub jury_duration: u64,
    pub appeal_duration: u64,
    /// Maximum amount taken from a minority juror's escrowed stake
    pub jury_minority_penalty: f64,
    /// Share of the validator's stake returned on a "no changes" settlement
    pub settlement_refund_rate: f64,
    /// Share of the falsification exposure paid out on a charge settlement
    pub settlement_bounty_rate: f64,
    pub min_mint: f64,
    pub current_mint: f64,
    pub decay_rate: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            treasury_wallet: "treasury".to_string(),
            publication_stake: 50.0,
            knowledge_token_author_mint: 1500.0,
            knowledge_token_replicator_mint: 100.0,
            knowledge_token_treasury_mint: 384.0,
            publication_lock_duration: 5_000,
            jury_duty_stake: 100.0,
            jury_duty_fee: 10.0,
            initial_jury: 3,
            validation_stake: 100.0,
            falsification_stake: 100.0,
            transaction_fee: 0.0,
            settlement_duration: 1_000,
            jury_duration: 1_000,
            appeal_duration: 1_000,
            jury_minority_penalty: 20.0,
            settlement_refund_rate: 0.5,
            settlement_bounty_rate: 0.5,
            min_mint: 150.0,
            current_mint: 10.0,
            decay_rate: 2.45,
        }
    }
}

impl NetworkConfig {
    /// Rejects configurations that would break the ledger's arithmetic.
    pub fn validate(&self) -> Result<()> {
        if self.treasury_wallet.trim().is_empty() {
            return Err(LedgerError::Validation("treasuryWallet must not be empty".into()));
        }

        let amounts = [
            ("publicationStake", self.publication_stake),
            ("knowledgeTokenAuthorMint", self.knowledge_token_author_mint),
            ("knowledgeTokenReplicatorMint", self.knowledge_token_replicator_mint),
            ("knowledgeTokenTreasuryMint", self.knowledge_token_treasury_mint),
            ("juryDutyStake", self.jury_duty_stake),
            ("juryDutyFee", self.jury_duty_fee),
            ("validationStake", self.validation_stake),
            ("falsificationStake", self.falsification_stake),
            ("transactionFee", self.transaction_fee),
            ("juryMinorityPenalty", self.jury_minority_penalty),
            ("minMint", self.min_mint),
            ("currentMint", self.current_mint),
            ("decayRate", self.decay_rate),
        ];
        for (name, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(LedgerError::Validation(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        for (name, rate) in [
            ("settlementRefundRate", self.settlement_refund_rate),
            ("settlementBountyRate", self.settlement_bounty_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(LedgerError::Validation(format!(
                    "{} must lie in [0, 1], got {}",
                    name, rate
                )));
            }
        }

        if self.initial_jury == 0 {
            return Err(LedgerError::Validation("initialJury must be at least 1".into()));
        }
        Ok(())
    }

    /// Timestamp `duration` seconds after `now`.
    pub fn deadline(now: u64, duration: u64) -> Result<u64> {
        now.checked_add(duration).ok_or_else(|| {
            LedgerError::Validation(format!("deadline {} + {} overflows the clock", now, duration))
        })
    }

    /// Fees a validator prepays for the first jury.
    pub fn initial_jury_fees(&self) -> f64 {
        self.jury_duty_fee * f64::from(self.initial_jury)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(NetworkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_deadline_rejects_clock_overflow() {
        assert_eq!(NetworkConfig::deadline(100, 1_000).unwrap(), 1_100);
        assert!(matches!(
            NetworkConfig::deadline(1, u64::MAX),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_empty_treasury() {
        let config = NetworkConfig {
            treasury_wallet: "  ".into(),
            ..NetworkConfig::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_rejects_negative_and_nan_amounts() {
        let negative = NetworkConfig {
            publication_stake: -1.0,
            ..NetworkConfig::default()
        };
        assert!(negative.validate().is_err());

        let nan = NetworkConfig {
            jury_duty_fee: f64::NAN,
            ..NetworkConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_rejects_rates_outside_unit_interval() {
        let config = NetworkConfig {
            settlement_bounty_rate: 1.5,
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let mut value = serde_json::to_value(NetworkConfig::default()).unwrap();
        value.as_object_mut().unwrap().remove("minMint");
        assert!(serde_json::from_value::<NetworkConfig>(value).is_err());
    }

    #[test]
    fn test_wrongly_typed_field_fails_to_parse() {
        let mut value = serde_json::to_value(NetworkConfig::default()).unwrap();
        value["transactionFee"] = serde_json::json!("this should be a number");
        assert!(serde_json::from_value::<NetworkConfig>(value).is_err());
    }
}
