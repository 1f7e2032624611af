mod actualize;
mod cache;
mod resolution;
mod store;

pub use actualize::{
    BASE_FONT, BASE_UNIT, GOLDEN_RATIO, GOLDEN_RATIO_INV, LayoutHint, StructuralContext,
    StyleAttributes, actualize, actualize_base, apply_positional, scale,
};
pub use cache::{CacheStats, ResolutionCache};
pub use resolution::{GENERIC_COMPONENT, Resolution};
pub use store::{CacheStore, JsonFileStore, MemoryStore, StoreError};
