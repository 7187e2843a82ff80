//! # Navigation Tree
//!
//! The site's navigation, as serialized into the nav element's `data-app-tree`
//! attribute. Used once per init to find which index "owns" the page being
//! displayed, so the router knows where the back-to-root link points.
//!
//! ```text
//! appTree
//! ├── index item  (collection.fullUrl = "/work/")
//! │   └── items
//! │       ├── collection.id = "a1"
//! │       └── collection.id = "b2"   ◄── page id "b2" ⇒ root "/work/"
//! └── index item  (no items)
//! ```

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::document::{PageMetadata, PageType};

pub const SITE_ROOT: &str = "/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub full_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub collection: Collection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    pub collection: Collection,
    #[serde(default)]
    pub items: Option<Vec<CollectionItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTree {
    #[serde(default)]
    pub app_tree: Vec<IndexItem>,
}

impl NavigationTree {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// URL of the index item holding a nested collection with `page_id`.
    ///
    /// Every item is visited; when several match, the last one wins.
    pub fn ancestor_of(&self, page_id: &str) -> Option<&str> {
        let mut found = None;
        for index_item in &self.app_tree {
            let Some(items) = &index_item.items else {
                continue;
            };
            for item in items {
                if item.collection.id == page_id {
                    found = Some(index_item.collection.full_url.as_str());
                }
            }
        }
        found
    }
}

/// Works out the root path for the page currently on screen.
///
/// Index pages are their own root, offcanvas pages hang off `/`, and
/// everything else is looked up in the navigation tree (falling back to `/`).
pub fn resolve_root(tree: &NavigationTree, page: &PageMetadata, pathname: &str) -> String {
    match page.page_type() {
        PageType::Index => pathname.to_string(),
        PageType::Offcanvas => SITE_ROOT.to_string(),
        PageType::Other(_) => {
            let ancestor = page.id().and_then(|id| tree.ancestor_of(id));
            match ancestor {
                Some(url) => url.to_string(),
                None => {
                    debug!("No ancestor index for page {:?}, rooting at /", page.id());
                    SITE_ROOT.to_string()
                }
            }
        }
    }
}
