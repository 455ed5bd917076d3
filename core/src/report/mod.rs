pub mod html;
pub mod product;

pub use html::{Report, ReportSection};
pub use product::{Product, ProductItem};
