use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::coordinator::TableRow;
use crate::data::model::Dataset;
use crate::state::Event;

const TABLE_HEIGHT: f32 = 260.0;

/// Rows of the working set; selected rows are highlighted and a click on a
/// row selects it.
pub fn data_table(ui: &mut Ui, dataset: &Dataset, view: usize, rows: &[TableRow]) -> Option<Event> {
    let schema = &dataset.schema;
    let row_height = 18.0;
    let mut clicked = None;

    ui.push_id(("table", view), |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(70.0).resizable(true).clip(true))
            .columns(
                Column::initial(90.0).resizable(true).clip(true),
                schema.len(),
            )
            .min_scrolled_height(0.0)
            .max_scroll_height(TABLE_HEIGHT)
            .sense(egui::Sense::click())
            .header(22.0, |mut header| {
                header.col(|ui| {
                    ui.strong(dataset.id_column.as_deref().unwrap_or("#"));
                });
                for name in schema.names() {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(row_height, rows.len(), |mut table_row| {
                    let Some(entry) = rows.get(table_row.index()) else {
                        return;
                    };
                    let Some(row) = dataset.row(entry.row) else {
                        return;
                    };
                    table_row.set_selected(entry.highlighted);

                    table_row.col(|ui| {
                        ui.label(dataset.label(entry.row));
                    });
                    for value in row.values() {
                        table_row.col(|ui| {
                            if value.is_missing() {
                                ui.weak("–");
                            } else {
                                ui.label(value.to_string());
                            }
                        });
                    }

                    if table_row.response().clicked() {
                        clicked = Some(Event::SelectRow(entry.row));
                    }
                });
            });
    });

    clicked
}
