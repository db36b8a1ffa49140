use comfy_table::{Table, TableComponent};

use crate::db::Database;
use crate::transaction::RecordSet;

/// Print the content of every table
pub(crate) fn print_database(db: &Database) -> anyhow::Result<()> {
    let tables = db.tables()?;
    if tables.is_empty() {
        println!("Current database is empty.");
        return Ok(());
    }

    println!("Current database:");
    for table in tables {
        match db.read(&table) {
            Some(records) => {
                println!("\n{} ({} transactions)", table, records.len());
                println!("{}", render(&records));
            }
            None => println!("\n{table}: unreadable"),
        }
    }

    Ok(())
}

pub(crate) fn render(records: &RecordSet) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Transaction date", "Category", "Description", "Amount", "Balance"]);
    table.remove_style(TableComponent::HorizontalLines);
    table.remove_style(TableComponent::MiddleIntersections);
    table.remove_style(TableComponent::LeftBorderIntersections);
    table.remove_style(TableComponent::RightBorderIntersections);

    for r in records.iter() {
        table.add_row(vec![
            r.transaction_date.to_string(),
            r.category.clone(),
            r.description.clone(),
            format!("{:.2}", r.amount),
            r.balance.map(|b| format!("{b:.2}")).unwrap_or_default(),
        ]);
    }

    table
}
