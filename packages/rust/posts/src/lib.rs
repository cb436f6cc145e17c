//! Post source adapter: front-matter parsing, item loading, and excerpt
//! persistence for CommentKeeper.

pub mod frontmatter;
pub mod loader;

pub use frontmatter::{Document, FrontMatter, parse_date, with_excerpt};
pub use loader::{load_items, write_excerpt};
