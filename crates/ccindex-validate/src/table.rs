//! Human-readable rendering of validation reports, in the teacher's table
//! idiom (`comfy_table`, one row per collection).

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};

use crate::report::CollectionReport;

pub fn render_table(reports: &[CollectionReport]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Collection").fg(Color::Cyan),
        Cell::new("Source").fg(Color::Cyan),
        Cell::new("Pointer").fg(Color::Cyan),
        Cell::new("Sorted").fg(Color::Cyan),
        Cell::new("Index").fg(Color::Cyan),
        Cell::new("Sorted marker").fg(Color::Cyan),
        Cell::new("Complete").fg(Color::Cyan),
    ]);

    for r in reports {
        let status = if r.complete {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&r.collection),
            Cell::new(r.source_shards_expected),
            Cell::new(format!("{}/{}", r.pointer_shards_present, r.source_shards_expected)),
            Cell::new(format!("{}/{}", r.pointer_shards_sorted, r.source_shards_expected)),
            Cell::new(if r.collection_index_present { "yes" } else { "no" }),
            Cell::new(if r.collection_index_sorted_marker_present { "yes" } else { "no" }),
            status,
        ]);
    }

    table
}
