pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, reply, success};
pub use table::{estimates_table, forecasts_table, stats_table};
pub use theme::{stderr_theme, stdout_theme, Theme};
