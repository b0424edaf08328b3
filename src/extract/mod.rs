mod page;
mod table;

pub use page::Page;
pub use table::{Cell, Table, TableSettings, TableStrategy, cell_text};
