pub mod feed;
pub mod item;
pub mod plugins;

pub use feed::{Feed, FeedPatch, FeedUpdate, Subscription};
pub use item::{join_authors, Item, NewItem};
pub use plugins::{PluginConfig, RewriteImageUrl};

/// Category assigned to subscriptions that don't specify one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";
