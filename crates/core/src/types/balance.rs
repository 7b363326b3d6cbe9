//! Seller balance as derived by the remote service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::format_brl;

/// A seller's balance breakdown in BRL.
///
/// All three figures are computed server-side; the gateway is a pure display
/// surface and never derives one field from the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Balance {
    /// Settled funds available for withdrawal.
    pub available: Decimal,
    /// Funds from sales still inside the clearing window.
    pub pending: Decimal,
    /// Server-reported total (not recomputed locally).
    pub total: Decimal,
}

impl Balance {
    /// Display-formatted figures, in the order available/pending/total.
    #[must_use]
    pub fn formatted(&self) -> [String; 3] {
        [
            format_brl(self.available),
            format_brl(self.pending),
            format_brl(self.total),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted() {
        let balance = Balance {
            available: "1234.5".parse().expect("decimal"),
            pending: "10".parse().expect("decimal"),
            total: "1244.5".parse().expect("decimal"),
        };
        assert_eq!(
            balance.formatted(),
            ["R$ 1.234,50", "R$ 10,00", "R$ 1.244,50"]
        );
    }

    #[test]
    fn test_wire_shape() {
        let json = r#"{"available":"100.00","pending":"0","total":"100.00"}"#;
        let balance: Balance = serde_json::from_str(json).expect("deserialize");
        assert_eq!(balance.available, "100".parse().expect("decimal"));
    }
}
