pub mod expression;
pub mod feature;
pub mod filter;
pub mod html;
pub mod layer;
pub mod legend;
pub mod symbology;

pub use expression::*;
pub use feature::*;
pub use filter::*;
pub use layer::*;
pub use legend::*;
