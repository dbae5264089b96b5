//! Ledger trade and its export record.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::market_data::{OptionAction, OptionContract, OptionRight};
use crate::domain::trade::{StructureKind, TradeDescriptor};

/// Trade lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// At least one leg still has contracts.
    Open,
    /// Every leg is flat.
    Closed,
}

/// How contracts left a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitKind {
    /// Part of a leg closed early.
    Partial,
    /// Offsetting order for the rest of the position.
    Close,
    /// Cash settled at intrinsic value.
    Settlement,
}

/// One exit fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRecord {
    /// Fill time.
    pub at: NaiveDateTime,
    /// Leg symbol.
    pub symbol: String,
    /// Contracts closed.
    pub contracts: u32,
    /// Exit price per share.
    pub price: Decimal,
    /// P&L of the closed contracts before commission.
    pub pnl: Decimal,
    /// Commission charged for this fill.
    pub commission: Decimal,
    /// Exit kind.
    pub kind: ExitKind,
}

/// A leg as held in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLeg {
    /// Contract.
    pub contract: OptionContract,
    /// Entry action.
    pub action: OptionAction,
    /// Contracts opened.
    pub contracts: u32,
    /// Contracts still open.
    pub remaining: u32,
    /// Entry price per share.
    pub entry_price: Decimal,
}

impl LedgerLeg {
    /// P&L of closing `contracts` at `price`.
    #[must_use]
    pub fn exit_pnl(&self, contracts: u32, price: Decimal, multiplier: Decimal) -> Decimal {
        Decimal::from(self.action.sign()) * (price - self.entry_price) * Decimal::from(contracts) * multiplier
    }
}

/// One trade from entry to close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTrade {
    /// Ledger id.
    pub id: Uuid,
    /// Descriptor the trade was opened from.
    pub descriptor_id: Uuid,
    /// Sequence step name.
    pub step: String,
    /// Structure kind.
    pub kind: StructureKind,
    /// Structures opened.
    pub quantity: u32,
    /// Contract multiplier.
    pub multiplier: Decimal,
    /// Entry time.
    pub entry_time: NaiveDateTime,
    /// Time the last leg went flat.
    pub exit_time: Option<NaiveDateTime>,
    /// Underlying at entry.
    pub underlying_at_entry: Decimal,
    /// Premium received (negative when paid) for the whole position.
    pub entry_premium: Decimal,
    /// Legs.
    pub legs: Vec<LedgerLeg>,
    /// Exit fills.
    pub exits: Vec<ExitRecord>,
    /// Gross P&L realized so far.
    pub gross_pnl: Decimal,
    /// Commissions paid so far.
    pub commissions: Decimal,
    /// Status.
    pub status: TradeStatus,
    /// Free-form annotations.
    pub metadata: BTreeMap<String, String>,
}

impl LedgerTrade {
    pub(super) fn open(descriptor: &TradeDescriptor, step: &str, at: NaiveDateTime, entry_commission: Decimal) -> Self {
        let legs = descriptor
            .legs()
            .iter()
            .map(|leg| {
                let contracts = leg.quantity() * descriptor.quantity();
                LedgerLeg {
                    contract: leg.contract().clone(),
                    action: leg.action(),
                    contracts,
                    remaining: contracts,
                    entry_price: leg.fill_price(),
                }
            })
            .collect();

        let mut metadata = BTreeMap::new();
        metadata.insert("strikes".to_string(), descriptor.strikes_repr().to_string());
        metadata.insert("distance".to_string(), descriptor.distance().normalize().to_string());
        metadata.insert("max_loss".to_string(), descriptor.max_loss().normalize().to_string());
        if let Some(ratio) = descriptor.win_loss_ratio() {
            metadata.insert("win_loss_ratio".to_string(), ratio.round_dp(4).to_string());
        }

        Self {
            id: Uuid::new_v4(),
            descriptor_id: descriptor.id(),
            step: step.to_string(),
            kind: descriptor.kind(),
            quantity: descriptor.quantity(),
            multiplier: descriptor.multiplier(),
            entry_time: at,
            exit_time: None,
            underlying_at_entry: descriptor.underlying_price(),
            entry_premium: descriptor.total_premium(),
            legs,
            exits: Vec::new(),
            gross_pnl: Decimal::ZERO,
            commissions: entry_commission,
            status: TradeStatus::Open,
            metadata,
        }
    }

    /// Net realized P&L after commissions.
    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.gross_pnl - self.commissions
    }

    /// Whether the trade is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Contracts still open across all legs.
    #[must_use]
    pub fn open_contracts(&self) -> u32 {
        self.legs.iter().map(|l| l.remaining).sum()
    }

    /// Leg by symbol.
    #[must_use]
    pub fn leg(&self, symbol: &str) -> Option<&LedgerLeg> {
        self.legs.iter().find(|l| l.contract.symbol() == symbol)
    }

    /// Close `contracts` of leg `index`. Returns the gross P&L of the fill.
    pub(super) fn exit_leg(
        &mut self,
        index: usize,
        contracts: u32,
        price: Decimal,
        commission: Decimal,
        kind: ExitKind,
        at: NaiveDateTime,
    ) -> Decimal {
        let multiplier = self.multiplier;
        let leg = &mut self.legs[index];
        let contracts = contracts.min(leg.remaining);
        let pnl = leg.exit_pnl(contracts, price, multiplier);
        leg.remaining -= contracts;

        self.exits.push(ExitRecord {
            at,
            symbol: leg.contract.symbol().to_string(),
            contracts,
            price,
            pnl,
            commission,
            kind,
        });
        self.gross_pnl += pnl;
        self.commissions += commission;

        if self.open_contracts() == 0 {
            self.status = TradeStatus::Closed;
            self.exit_time = Some(at);
        }
        pnl
    }

    /// Export shape.
    #[must_use]
    pub fn to_record(&self) -> TradeRecord {
        let legs = self
            .legs
            .iter()
            .map(|l| {
                (
                    l.contract.symbol().to_string(),
                    LegRecord {
                        strike: l.contract.strike(),
                        right: l.contract.right(),
                        action: l.action,
                        contracts: l.contracts,
                        entry_price: l.entry_price,
                    },
                )
            })
            .collect();

        let mut metadata = self.metadata.clone();
        metadata.insert("step".to_string(), self.step.clone());
        metadata.insert("commissions".to_string(), self.commissions.to_string());

        TradeRecord {
            id: self.id,
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            structure: self.kind,
            legs,
            size: self.quantity,
            realized_pnl: self.realized_pnl(),
            status: self.status,
            metadata,
        }
    }
}

/// Exported leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRecord {
    /// Strike price.
    pub strike: Decimal,
    /// Call or put.
    pub right: OptionRight,
    /// Entry action.
    pub action: OptionAction,
    /// Contracts opened.
    pub contracts: u32,
    /// Entry price per share.
    pub entry_price: Decimal,
}

/// Per-trade record handed to statistics and export consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Ledger id.
    pub id: Uuid,
    /// Entry time.
    pub entry_time: NaiveDateTime,
    /// Exit time, `None` while open.
    pub exit_time: Option<NaiveDateTime>,
    /// Structure kind.
    pub structure: StructureKind,
    /// Legs keyed by contract symbol.
    pub legs: BTreeMap<String, LegRecord>,
    /// Structures traded.
    pub size: u32,
    /// Net realized P&L.
    pub realized_pnl: Decimal,
    /// Status.
    pub status: TradeStatus,
    /// Free-form annotations.
    pub metadata: BTreeMap<String, String>,
}
