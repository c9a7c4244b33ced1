pub mod candle;
pub mod pivot;
pub mod qualifier;
pub mod timeframe;
pub mod zone;

pub use candle::{Candle, CandleSeries, SeriesDefect};
pub use pivot::{Pivot, PivotKind};
pub use qualifier::WeightingScheme;
pub use timeframe::Timeframe;
pub use zone::*;
