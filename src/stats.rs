//! Per-game running totals

use crate::common::types::amount_str;
use crate::settlement::Settlement;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub entries_submitted: u64,
    pub entries_resolved: u64,
    pub entries_withdrawn: u64,
    pub batch_failures: u64,
    #[serde(with = "amount_str")]
    pub total_wagered: u128,
    #[serde(with = "amount_str")]
    pub total_paid_out: u128,
    #[serde(with = "amount_str")]
    pub total_refunded: u128,
    #[serde(with = "amount_str")]
    pub host_fees: u128,
    #[serde(with = "amount_str")]
    pub protocol_fees: u128,
}

impl GameStats {
    pub fn record_submission(&mut self, stake: u128) {
        self.entries_submitted += 1;
        self.total_wagered = self.total_wagered.saturating_add(stake);
    }

    pub fn record_settlement(&mut self, settlement: &Settlement) {
        self.entries_resolved += 1;
        self.total_paid_out = self.total_paid_out.saturating_add(settlement.payout);
        self.total_refunded = self.total_refunded.saturating_add(settlement.refund);
        self.host_fees = self.host_fees.saturating_add(settlement.host_fee);
        self.protocol_fees = self.protocol_fees.saturating_add(settlement.protocol_fee);
    }

    pub fn record_withdrawal(&mut self, refund: u128) {
        self.entries_withdrawn += 1;
        self.total_refunded = self.total_refunded.saturating_add(refund);
    }

    pub fn record_batch_failures(&mut self, failed: usize) {
        self.batch_failures += failed as u64;
    }

    /// Units taken in minus units paid back to players
    pub fn house_net(&self) -> i128 {
        let out = self.total_paid_out.saturating_add(self.total_refunded);
        (self.total_wagered as i128).saturating_sub(out as i128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = GameStats::default();
        stats.record_submission(1_000);
        stats.record_settlement(&Settlement {
            payout: 1_980,
            host_fee: 5,
            protocol_fee: 5,
            ..Settlement::default()
        });
        stats.record_submission(500);
        stats.record_withdrawal(500);

        assert_eq!(stats.entries_submitted, 2);
        assert_eq!(stats.entries_resolved, 1);
        assert_eq!(stats.entries_withdrawn, 1);
        assert_eq!(stats.total_refunded, 500);
        assert_eq!(stats.house_net(), -980);
    }
}
