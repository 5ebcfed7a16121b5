//! Gateway-backed calculate and commit.

use refund_desk::{HttpRefundGateway, RefundDesk, RefundDeskConfig, RefundError, RefundSession};

use super::{CliError, SelectionArgs, apply_selection, load_order, load_transaction};

fn open_session(
    config: &RefundDeskConfig,
    args: &SelectionArgs,
) -> Result<(RefundDesk<HttpRefundGateway>, RefundSession), CliError> {
    let gateway = HttpRefundGateway::new(&config.gateway).map_err(RefundError::from)?;
    let desk = RefundDesk::new(gateway, config.shop.clone());

    let mut order = load_order(&args.order)?;
    if let Some(path) = &args.transaction {
        order = desk.resolve_transaction(order, load_transaction(path));
    }
    let mut session = desk.open(order.clone());
    session.update_selection(|selection| apply_selection(&order, args, selection))??;

    Ok((desk, session))
}

/// Print the gateway's quote for a selection.
pub async fn calculate(config: &RefundDeskConfig, args: &SelectionArgs) -> Result<(), CliError> {
    let (desk, mut session) = open_session(config, args)?;
    let currency = config.shop.currency;

    let estimate = session.local_quote(desk.calculator())?.rounded();
    tracing::info!("Local estimate: {}", currency.display(estimate.refund_total));

    let quote = desk.calculate(&mut session).await?;
    tracing::info!("Gateway quote for order {}", session.order().name);
    tracing::info!("  Parent transaction: {}", quote.transaction_id);
    tracing::info!("  Amount:             {}", currency.display(quote.amount));

    Ok(())
}

/// Calculate, then commit the refund.
pub async fn commit(
    config: &RefundDeskConfig,
    args: &SelectionArgs,
    confirm: bool,
) -> Result<(), CliError> {
    if !confirm {
        return Err(CliError::NotConfirmed);
    }

    let (desk, mut session) = open_session(config, args)?;
    let currency = config.shop.currency;

    let quote = desk.calculate(&mut session).await?;
    tracing::info!(
        "Refunding {} on order {}",
        currency.display(quote.amount),
        session.order().name
    );

    let receipt = desk.commit(&mut session).await?;
    tracing::info!("Refund committed successfully!");
    tracing::info!("  Transaction: {}", receipt.transaction_id);
    tracing::info!("  Amount:      {}", currency.display(receipt.amount));

    Ok(())
}
