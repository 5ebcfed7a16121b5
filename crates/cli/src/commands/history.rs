//! Refund history lookup.

use refund_desk::{HttpRefundGateway, RefundDesk, RefundDeskConfig, RefundError};
use refund_desk_core::OrderId;

use super::CliError;

/// Print refunds already issued for an order.
pub async fn run(config: &RefundDeskConfig, order_id: &str) -> Result<(), CliError> {
    let gateway = HttpRefundGateway::new(&config.gateway).map_err(RefundError::from)?;
    let desk = RefundDesk::new(gateway, config.shop.clone());
    let order_id = OrderId::new(order_id);
    let currency = config.shop.currency;

    let history = desk.refund_history(&order_id).await?;
    if history.is_empty() {
        tracing::info!("No refunds for order {}", order_id.numeric_id());
        return Ok(());
    }

    for refund in &history.refunds {
        tracing::info!(
            "Refund {} ({})",
            refund.id.as_deref().unwrap_or("-"),
            refund
                .created_at
                .map_or_else(|| "unknown date".to_string(), |at| at.to_rfc3339())
        );
        for item in &refund.refund_line_items {
            tracing::info!(
                "  {} | SKU: {} | Qty: {} | Tax: {}",
                item.title,
                item.sku.as_deref().unwrap_or("-"),
                item.quantity,
                currency.display(item.total_tax)
            );
        }
        for shipping in &refund.refund_shipping {
            tracing::info!(
                "  Shipping {}: {} (Tax: {})",
                shipping.title,
                currency.display(shipping.total),
                currency.display(shipping.tax)
            );
        }
    }
    tracing::info!(
        "Shipping refunded in total: {} (Tax: {})",
        currency.display(history.shipping_refunded()),
        currency.display(history.shipping_tax_refunded())
    );

    Ok(())
}
