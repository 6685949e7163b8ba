pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, muted, quote, section, status, success, summary_row, warn};
pub use progress::Spinner;
pub use table::{TableBuilder, quality_table, stats_table, summary_table};
pub use theme::{Theme, theme};
