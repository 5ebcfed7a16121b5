//! Local refund estimate.

use refund_desk::{Order, RefundError, RefundSelection, ShopSettings, calculator};

use super::{CliError, SelectionArgs, apply_selection, load_order};

/// Print the locally computed quote for a selection.
pub fn run(shop: &ShopSettings, args: &SelectionArgs) -> Result<(), CliError> {
    let order = load_order(&args.order)?;
    let mut selection = RefundSelection::for_order(&order);
    apply_selection(&order, args, &mut selection)?;

    for line in estimate(shop, &order, &selection)? {
        tracing::info!("{line}");
    }
    Ok(())
}

/// Estimate lines, in the shop currency the refund request will carry.
fn estimate(
    shop: &ShopSettings,
    order: &Order,
    selection: &RefundSelection,
) -> Result<Vec<String>, RefundError> {
    let quote = calculator::quote(order, selection)?.rounded();
    let currency = shop.currency;

    Ok(vec![
        format!("Refund estimate for order {}", order.name),
        format!("  Subtotal: {}", currency.display(quote.product_subtotal)),
        format!("  Tax:      {}", currency.display(quote.total_tax)),
        format!("  Shipping: {}", currency.display(quote.shipping_amount)),
        format!("  Total:    {}", currency.display(quote.refund_total)),
    ])
}
