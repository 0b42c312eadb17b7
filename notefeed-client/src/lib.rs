mod builder;
pub use builder::build;

mod display;
pub use display::display_date;

mod enrich;
pub use enrich::enrich;

mod feed;
pub use feed::{NoteFeed, Refresh, MIN_SEARCH_LEN};

mod node;
pub use node::{Enrichment, ExpansionPolicy, ThreadNode};

mod snapshot;
pub use snapshot::{rebuild_thread, RebuildSequence, RebuildTicket, ThreadSnapshot};

mod fuzz;
mod testutil;

pub mod api {
    pub use notefeed_api::*;
}
