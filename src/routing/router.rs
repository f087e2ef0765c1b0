//! Site lookup.
//!
//! # Design Decisions
//! - Exactly two contexts, checked in order (A, then B)
//! - Immutable after construction (shared without locks)
//! - Explicit `None` on a miss; the caller decides what a miss means

use crate::routing::context::ApplicationContext;

/// A request matched to a site.
#[derive(Debug)]
pub struct SiteMatch<'a> {
    pub site: &'a ApplicationContext,
    /// Request target with the site prefix replaced by `/`.
    pub url: String,
}

#[derive(Debug)]
pub struct SiteRouter {
    sites: [ApplicationContext; 2],
}

impl SiteRouter {
    pub fn new(a: ApplicationContext, b: ApplicationContext) -> Self {
        Self { sites: [a, b] }
    }

    pub fn sites(&self) -> &[ApplicationContext; 2] {
        &self.sites
    }

    /// First site whose prefix starts `target` (path plus query).
    pub fn match_target(&self, target: &str) -> Option<SiteMatch<'_>> {
        self.sites
            .iter()
            .find(|site| site.matcher().matches(target))
            .map(|site| SiteMatch {
                site,
                url: site.matcher().strip(target),
            })
    }
}
