//! Broker metadata records: symbol specifications and account state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Volume};

/// Symbol specification with current quotes, as returned by the broker's
/// symbol lookup (MT5 `SymbolGet` + `SymbolInfoGet`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Symbol name (e.g. "EURUSD").
    pub name: String,
    /// Current bid quote.
    pub bid: Price,
    /// Current ask quote.
    pub ask: Price,
    /// Minimum lot size (typically 0.01).
    pub min_volume: Volume,
    /// Maximum lot size (typically 100).
    pub max_volume: Volume,
    /// Lot step (typically 0.01).
    pub volume_step: Volume,
    /// Price decimal places (5 for EURUSD, 3 for JPY pairs).
    pub digits: u32,
    /// Whether trading is currently permitted on this symbol.
    pub trade_allowed: bool,
}

impl SymbolInfo {
    /// Whether the given volume falls within this symbol's [min, max] range.
    #[must_use]
    pub fn volume_in_range(&self, volume: Volume) -> bool {
        volume >= self.min_volume && volume <= self.max_volume
    }
}

/// Account state as returned by the broker's account lookup
/// (MT5 `UserAccountGet`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub login: u64,
    pub balance: Decimal,
    pub equity: Decimal,
    pub free_margin: Decimal,
    /// Margin level percentage.
    pub margin_level: Decimal,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eurusd() -> SymbolInfo {
        SymbolInfo {
            name: "EURUSD".to_string(),
            bid: Price::new(dec!(1.08450)),
            ask: Price::new(dec!(1.08465)),
            min_volume: Volume::new(dec!(0.01)),
            max_volume: Volume::new(dec!(100)),
            volume_step: Volume::new(dec!(0.01)),
            digits: 5,
            trade_allowed: true,
        }
    }

    #[test]
    fn test_volume_range_bounds_inclusive() {
        let info = eurusd();
        assert!(info.volume_in_range(Volume::new(dec!(0.01))));
        assert!(info.volume_in_range(Volume::new(dec!(100))));
        assert!(info.volume_in_range(Volume::new(dec!(0.50))));

        assert!(!info.volume_in_range(Volume::new(dec!(0.001))));
        assert!(!info.volume_in_range(Volume::new(dec!(999))));
    }
}
