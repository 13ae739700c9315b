pub mod listing_scorer;

pub use listing_scorer::build_item;
