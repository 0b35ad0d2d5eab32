//! Contains the matching arithmetic applied to a single order.
//!
//! Matching is side-unaware: an order of either side consumes the
//! instrument's liquidity counter, and an order larger than the counter
//! inverts the carry direction. The function here is pure; the engine owns
//! every read and write of [`MarketState`](crate::backtest::state::MarketState).

use crate::backtest::fault::FaultReason;
use crate::backtest::types::{InstrumentLiquidity, Order};
use serde::Serialize;

/// How a fill changed the liquidity counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillKind {
    /// The order consumed part of the counter.
    Absorbed,
    /// The order consumed the counter exactly.
    Exhausted,
    /// The order exceeded the counter; the carry direction flipped.
    Inverted,
}

/// Outcome of matching one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The order filled and left `liquidity` behind.
    Filled {
        /// Liquidity after the fill
        liquidity: InstrumentLiquidity,
        /// How the counter moved
        kind: FillKind,
    },
    /// The instrument has no tradable context.
    NoLiquidity,
}

impl MatchOutcome {
    /// Returns `true` for a fill.
    #[must_use]
    pub fn is_fill(&self) -> bool {
        matches!(self, MatchOutcome::Filled { .. })
    }
}

/// Matches `order` against `liquidity`.
///
/// `has_history` reports whether the instrument has buffered market data for
/// the run's feed mode. An instrument is tradable when its counter is
/// positive, it carries a sell surplus, or it has history.
///
/// # Errors
///
/// Returns a [`FaultReason`] for a non-positive order size, a negative
/// counter, or arithmetic overflow. None of these mutate anything.
pub fn match_against(
    liquidity: InstrumentLiquidity,
    has_history: bool,
    order: &Order,
) -> Result<MatchOutcome, FaultReason> {
    if order.size <= 0 {
        return Err(FaultReason::InvalidOrderSize { size: order.size });
    }
    if liquidity.quantity < 0 {
        return Err(FaultReason::NegativeLiquidity {
            instrument: order.instrument,
            quantity: liquidity.quantity,
        });
    }

    let tradable = liquidity.quantity > 0 || liquidity.carry_is_sell || has_history;
    if !tradable {
        return Ok(MatchOutcome::NoLiquidity);
    }

    let overflow = || FaultReason::ArithmeticOverflow {
        quantity: liquidity.quantity,
        size: order.size,
    };
    let remaining = liquidity.quantity.checked_sub(order.size).ok_or_else(overflow)?;

    let outcome = match remaining {
        0 => MatchOutcome::Filled {
            liquidity: InstrumentLiquidity::new(0, liquidity.carry_is_sell),
            kind: FillKind::Exhausted,
        },
        r if r > 0 => MatchOutcome::Filled {
            liquidity: InstrumentLiquidity::new(r, liquidity.carry_is_sell),
            kind: FillKind::Absorbed,
        },
        r => MatchOutcome::Filled {
            liquidity: InstrumentLiquidity::new(
                r.checked_neg().ok_or_else(overflow)?,
                !liquidity.carry_is_sell,
            ),
            kind: FillKind::Inverted,
        },
    };
    Ok(outcome)
}
