//! CSS selectors for the store directory pages
//!
//! Listing pages (root, subdivision, city) share one link selector; store
//! pages carry the metadata, hours table, favorite link and JSON-LD block.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    // Directory listing links, identical on every listing level
    static ref DIRECTORY_LINK: Selector = parse_selector!("div.map-list-item a.ga-link");

    // Hours rows in the desktop table; the mobile table duplicates them
    static ref HOURS_ROW: Selector = parse_selector!("div.hide-mobile div.day-hour-row");
    static ref HOURS_DAY: Selector = parse_selector!("span[data-daypart]");
    static ref HOURS_OPEN: Selector = parse_selector!("span.time-open");
    static ref HOURS_CLOSE: Selector = parse_selector!("span.time-close");

    static ref META_STATE: Selector = parse_selector!(r#"meta[name="state"]"#);
    static ref META_CITY: Selector = parse_selector!(r#"meta[name="city"]"#);
    static ref META_ZIP: Selector = parse_selector!(r#"meta[name="zip"]"#);
    static ref META_ADDRESS: Selector = parse_selector!(r#"meta[name="address"]"#);

    static ref FAVORITE_LINK: Selector = parse_selector!("div.js-favorite a.ga-link");

    static ref JSON_LD: Selector = parse_selector!(r#"script[type="application/ld+json"]"#);
}

/// Selector shared by all listing levels
pub fn directory_link() -> &'static Selector {
    &DIRECTORY_LINK
}

/// Selectors for the opening-hours table
pub struct HoursSelectors {
    pub row: &'static Selector,
    pub day: &'static Selector,
    pub open: &'static Selector,
    pub close: &'static Selector,
}

impl HoursSelectors {
    pub fn new() -> Self {
        Self {
            row: &HOURS_ROW,
            day: &HOURS_DAY,
            open: &HOURS_OPEN,
            close: &HOURS_CLOSE,
        }
    }
}

impl Default for HoursSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Selectors for the `<meta>` fields describing the store
pub struct MetaSelectors {
    pub state: &'static Selector,
    pub city: &'static Selector,
    pub zip: &'static Selector,
    pub address: &'static Selector,
}

impl MetaSelectors {
    pub fn new() -> Self {
        Self {
            state: &META_STATE,
            city: &META_CITY,
            zip: &META_ZIP,
            address: &META_ADDRESS,
        }
    }
}

impl Default for MetaSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// All selectors needed on a store page
pub struct StoreSelectors {
    pub hours: HoursSelectors,
    pub meta: MetaSelectors,
    pub favorite: &'static Selector,
    pub json_ld: &'static Selector,
}

impl StoreSelectors {
    pub fn new() -> Self {
        Self {
            hours: HoursSelectors::new(),
            meta: MetaSelectors::new(),
            favorite: &FAVORITE_LINK,
            json_ld: &JSON_LD,
        }
    }
}

impl Default for StoreSelectors {
    fn default() -> Self {
        Self::new()
    }
}
