use std::cmp::Ordering;

use crate::models::Stock;

/// Recomputes `rank` and `change_rank` over the given stocks.
///
/// The current ranks move into `previous_rank`/`previous_change_rank` first.
/// `rank` orders by price, highest first. `change_rank` orders by percentage
/// change, highest first, with stocks lacking a reference price after all
/// others. Ties fall back to ticker order so the result does not depend on
/// the order stocks were loaded in.
pub fn update_rankings(stocks: &mut [Stock]) {
    for stock in stocks.iter_mut() {
        stock.previous_rank = stock.rank;
        stock.previous_change_rank = stock.change_rank;
    }

    let mut by_price: Vec<usize> = (0..stocks.len()).collect();
    by_price.sort_by(|&a, &b| {
        stocks[b]
            .price
            .total_cmp(&stocks[a].price)
            .then_with(|| stocks[a].ticker.cmp(&stocks[b].ticker))
    });
    for (position, &idx) in by_price.iter().enumerate() {
        stocks[idx].rank = Some(position as i32 + 1);
    }

    let changes: Vec<Option<f64>> = stocks.iter().map(Stock::percentage_change).collect();
    let mut by_change: Vec<usize> = (0..stocks.len()).collect();
    by_change.sort_by(|&a, &b| {
        compare_changes(changes[a], changes[b]).then_with(|| stocks[a].ticker.cmp(&stocks[b].ticker))
    });
    for (position, &idx) in by_change.iter().enumerate() {
        stocks[idx].change_rank = Some(position as i32 + 1);
    }
}

/// Defined changes before undefined ones; larger changes first.
fn compare_changes(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
