//! ESC/POS-style receipt rendering.
//!
//! The printer bridge understands a line-markup dialect rather than raw
//! ESC/POS commands: `[C]`/`[L]`/`[R]` prefixes set alignment, `<b>` bolds,
//! `[CUT]` feeds and cuts. Amounts are Rand, two decimals.

use chrono::DateTime;

use crate::records::Transaction;

/// Render the printable receipt for a purchase.
pub fn render_receipt(tx: &Transaction) -> Vec<u8> {
    let date = DateTime::from_timestamp_millis(tx.timestamp)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| tx.timestamp.to_string());
    let short_id: String = tx.id.chars().take(8).collect();

    let text = format!(
        "[C]SUITEWASTE OS RECEIPT\n\
         [L]Date: {date}\n\
         [L]Supplier: {supplier}\n\
         [L]TX ID: {short_id}\n\
         [C]--------------------------------\n\
         [L]Material          [R]Total\n\
         [L]{material:<18} [R]R {total:.2}\n\
         [L]({weight:.2}kg @ R {price:.2}/kg)\n\
         [C]--------------------------------\n\
         [L]<b>TOTAL PAID [R]R {total:.2}</b>\n\
         \n\
         [C]Thank you!\n\
         \n\n\n\
         [CUT]",
        supplier = tx.supplier_id,
        material = tx.material_name,
        total = tx.total,
        weight = tx.weight,
        price = tx.price_per_kg,
    );
    text.into_bytes()
}
