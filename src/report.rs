//! Console summary of the watched tokens.

use chrono::{DateTime, Local};

use crate::models::{TokenInfo, TokenWatch};

const HEADERS: [&str; 5] = [
    "blockchain",
    "tokenName",
    "tokenSymbol",
    "Buy when RSI below",
    "Sell when RSI above",
];

pub fn cycle_timestamp(now: DateTime<Local>) -> String {
    now.format("%a %b %d %Y %H:%M:%S GMT%z").to_string()
}

/// Plain-text table with one row per watched token.
pub fn render_watch_table(entries: &[(&TokenWatch, &TokenInfo)]) -> String {
    let rows: Vec<[String; 5]> = entries
        .iter()
        .map(|(watch, info)| {
            [
                watch.chain.to_string(),
                info.name.clone(),
                info.symbol.clone(),
                watch.buy_threshold.to_string(),
                watch.sell_threshold.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 5]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(HEADERS));
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &rows {
        out.push(line([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
            row[4].as_str(),
        ]));
    }
    out.join("\n")
}
