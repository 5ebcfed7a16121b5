//! CLI subcommands and the arguments they share.

pub mod history;
pub mod quote;
pub mod refund;

use std::path::{Path, PathBuf};

use clap::Args;
use refund_desk::{ConfigError, Order, RefundError, RefundSelection, TransactionRecord};
use refund_desk_core::{LineItemId, Money};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Order snapshot could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Order snapshot is not valid JSON.
    #[error("Invalid order snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// `--item` names a line item the order does not have.
    #[error("Order has no line item {0}")]
    UnknownLineItem(String),

    /// `refund` was run without `--confirm`.
    #[error("Refusing to commit without --confirm")]
    NotConfirmed,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Refund(#[from] RefundError),
}

/// A `--item ID:QTY` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg {
    pub line_item_id: String,
    pub quantity: i64,
}

impl std::str::FromStr for ItemArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, quantity) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected ID:QTY, got '{s}'"))?;
        let quantity = quantity
            .trim()
            .parse()
            .map_err(|e| format!("invalid quantity in '{s}': {e}"))?;
        Ok(Self {
            line_item_id: id.trim().to_string(),
            quantity,
        })
    }
}

/// Selection arguments shared by `quote`, `calculate`, and `refund`.
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Path to a JSON order snapshot
    #[arg(long)]
    pub order: PathBuf,

    /// Line item and quantity to refund, e.g. `13421:2` (repeatable)
    #[arg(long = "item", value_name = "ID:QTY")]
    pub items: Vec<ItemArg>,

    /// Refund this much shipping
    #[arg(long)]
    pub shipping: Option<Money>,

    /// Refund note
    #[arg(long)]
    pub note: Option<String>,

    /// Do not email the customer
    #[arg(long)]
    pub no_notify: bool,

    /// JSON transaction lookup for the order; an unreadable file falls back
    /// to the manual gateway
    #[arg(long, value_name = "FILE")]
    pub transaction: Option<PathBuf>,
}

/// Load an order snapshot from disk.
pub fn load_order(path: &Path) -> Result<Order, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a transaction lookup result.
///
/// A missing or malformed file yields `None` so the order still opens with
/// the fallback gateway and location.
pub fn load_transaction(path: &Path) -> Option<TransactionRecord> {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()));
    match parsed {
        Ok(record) => Some(record),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "Transaction lookup failed");
            None
        }
    }
}

/// Apply the selection arguments to an empty selection for `order`.
pub fn apply_selection(
    order: &Order,
    args: &SelectionArgs,
    selection: &mut RefundSelection,
) -> Result<(), CliError> {
    for item in &args.items {
        let wanted = LineItemId::new(item.line_item_id.as_str());
        let line = order
            .line_items
            .iter()
            .find(|line| line.id.numeric_id() == wanted.numeric_id())
            .ok_or_else(|| CliError::UnknownLineItem(item.line_item_id.clone()))?;
        selection.select(line, item.quantity);
    }
    if let Some(amount) = args.shipping {
        selection.request_shipping(amount);
    }
    if let Some(note) = &args.note {
        selection.set_note(note.as_str());
    }
    selection.set_notify_customer(!args.no_notify);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_arg_parses_numeric_and_gid() {
        let item: ItemArg = "13421:2".parse().unwrap();
        assert_eq!(item.line_item_id, "13421");
        assert_eq!(item.quantity, 2);

        let item: ItemArg = "gid://shopify/LineItem/13421:1".parse().unwrap();
        assert_eq!(item.line_item_id, "gid://shopify/LineItem/13421");
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_unreadable_transaction_falls_back() {
        assert!(load_transaction(Path::new("/nonexistent/transaction.json")).is_none());
    }

    #[test]
    fn test_item_arg_rejects_garbage() {
        assert!("13421".parse::<ItemArg>().is_err());
        assert!("13421:two".parse::<ItemArg>().is_err());
    }
}
